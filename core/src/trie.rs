/// Prefix trie used for lexicon lookup and segmentation.
use ahash::AHashMap;

/// An arena-backed prefix tree keyed by lower-cased characters.
///
/// Nodes live in a single `Vec` and refer to their children by index, so the
/// structure has no parent pointers and can be moved or cloned freely. Every
/// node may carry any number of values; a node with at least one value is a
/// terminal.
///
/// # Example
/// ```
/// use khiin_core::trie::Trie;
///
/// let mut trie = Trie::new();
/// trie.insert("ho", "ho");
/// trie.insert("ho2", "hó");
/// trie.insert("hobo", "ho-bo");
///
/// assert!(trie.contains_key("ho"));
/// assert!(!trie.contains_key("h"));
/// assert!(trie.has_continuation("hob"));
/// assert!(!trie.has_continuation("hobo"));
///
/// let input: Vec<char> = "hobo".chars().collect();
/// let ends: Vec<usize> = trie.prefixes_at(&input, 0).iter().map(|(end, _)| *end).collect();
/// assert_eq!(ends, vec![2, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Trie<V> {
    nodes: Vec<Node<V>>,
    keys: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    children: AHashMap<char, u32>,
    values: Vec<V>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            children: AHashMap::new(),
            values: Vec::new(),
        }
    }
}

const ROOT: usize = 0;

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Create an empty trie holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            keys: 0,
        }
    }

    /// Insert `value` under `key`. Keys are matched case-insensitively.
    pub fn insert(&mut self, key: &str, value: V) {
        let mut idx = ROOT;
        for ch in key.chars().map(fold) {
            idx = match self.nodes[idx].children.get(&ch) {
                Some(&child) => child as usize,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::new());
                    self.nodes[idx].children.insert(ch, child as u32);
                    child
                }
            };
        }
        if self.nodes[idx].values.is_empty() {
            self.keys += 1;
        }
        self.nodes[idx].values.push(value);
    }

    /// Values stored under exactly `key`, if any.
    pub fn get(&self, key: &str) -> Option<&[V]> {
        let idx = self.find(key.chars())?;
        let values = &self.nodes[idx].values;
        if values.is_empty() {
            None
        } else {
            Some(values.as_slice())
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True when some stored key is strictly longer than `text` and starts
    /// with it, i.e. more keystrokes could still extend the match.
    pub fn has_continuation(&self, text: &str) -> bool {
        self.find(text.chars())
            .map(|idx| !self.nodes[idx].children.is_empty())
            .unwrap_or(false)
    }

    /// Walk `input` from `start` and return every terminal reached as
    /// `(end, values)`, where `end` is the exclusive index into `input`.
    /// Results are ordered by increasing `end`.
    pub fn prefixes_at(&self, input: &[char], start: usize) -> Vec<(usize, &[V])> {
        let mut out = Vec::new();
        let mut idx = ROOT;
        for (offset, ch) in input.iter().enumerate().skip(start) {
            match self.nodes[idx].children.get(&fold(*ch)) {
                Some(&child) => idx = child as usize,
                None => break,
            }
            let values = &self.nodes[idx].values;
            if !values.is_empty() {
                out.push((offset + 1, values.as_slice()));
            }
        }
        out
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    fn find<I: IntoIterator<Item = char>>(&self, chars: I) -> Option<usize> {
        let mut idx = ROOT;
        for ch in chars {
            idx = *self.nodes[idx].children.get(&fold(ch))? as usize;
        }
        Some(idx)
    }
}

fn fold(ch: char) -> char {
    ch.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trie<&'static str> {
        let mut trie = Trie::new();
        trie.insert("a", "a");
        trie.insert("an", "an");
        trie.insert("anne", "an-ne");
        trie.insert("an2ne", "án-ne");
        trie.insert("ne", "ne");
        trie
    }

    #[test]
    fn exact_lookup() {
        let trie = sample();
        assert_eq!(trie.get("an"), Some(&["an"][..]));
        assert_eq!(trie.get("ann"), None);
        assert_eq!(trie.get("xyz"), None);
        assert_eq!(trie.len(), 5);
    }

    #[test]
    fn multiple_values_share_a_terminal() {
        let mut trie = Trie::new();
        trie.insert("e5", "鞋");
        trie.insert("e5", "个");
        assert_eq!(trie.get("e5").map(|v| v.len()), Some(2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn prefixes_from_offset() {
        let trie = sample();
        let input: Vec<char> = "xanne".chars().collect();
        let ends: Vec<usize> = trie.prefixes_at(&input, 1).iter().map(|(e, _)| *e).collect();
        assert_eq!(ends, vec![2, 3, 5]);
        assert!(trie.prefixes_at(&input, 0).is_empty());
        assert!(trie.prefixes_at(&input, 5).is_empty());
    }

    #[test]
    fn lookups_fold_case() {
        let trie = sample();
        assert!(trie.contains_key("AN"));
        let input: Vec<char> = "Ne".chars().collect();
        assert_eq!(trie.prefixes_at(&input, 0).len(), 1);
    }

    #[test]
    fn continuation_tests() {
        let trie = sample();
        assert!(trie.has_continuation("ann"));
        assert!(trie.has_continuation("an"));
        assert!(!trie.has_continuation("anne"));
        assert!(!trie.has_continuation("nx"));
        assert!(trie.has_continuation(""));
    }
}
