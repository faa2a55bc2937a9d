mod word_list;

use anyhow::{Context, Result};
use clap::Parser;
use khiin_core::{read_user_dictionary, LexiconStore, RedbStore};
use std::path::PathBuf;
use word_list::WordList;

/// Build the lexicon database from one or more word lists.
#[derive(Parser)]
#[command(name = "build_lexicon")]
struct Args {
    /// Word lists: `.toml`, or tab-separated key/han/priority tables
    #[arg(long, num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, default_value = "data/khiin.db")]
    out: PathBuf,

    /// User dictionary (`khiin_user.txt` format) to store alongside the words
    #[arg(long)]
    user_dict: Option<PathBuf>,

    /// Start from an empty database instead of appending to `out`
    #[arg(long)]
    fresh: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut list = WordList::default();
    for input in &args.inputs {
        list.merge(WordList::load(input)?);
    }
    let syllables = list.all_syllables();
    let rows = list.rows();

    if args.fresh && args.out.exists() {
        std::fs::remove_file(&args.out)
            .with_context(|| format!("removing {}", args.out.display()))?;
    }
    let store = RedbStore::create(&args.out)?;
    store.write_lexicon(&syllables, &rows)?;
    println!(
        "Wrote {} syllables and {} words to {}",
        syllables.len(),
        rows.len(),
        args.out.display()
    );

    if let Some(path) = &args.user_dict {
        let words = read_user_dictionary(path)?;
        let added = LexiconStore::Redb(store).add_user_words(&words)?;
        println!("Added {} of {} user words from {}", added, words.len(), path.display());
    }
    Ok(())
}
