use anyhow::Result;
use clap::Parser;
use khiin_core::{LexiconStore, WordRow};
use std::path::PathBuf;

/// Dump rows and learned counts from a lexicon database.
#[derive(Parser)]
#[command(name = "inspect_lexicon")]
struct Args {
    #[arg(long, default_value = "data/khiin.db")]
    db: PathBuf,

    /// Input keys to look up (`ho2`, `an2-ne`, `anne`)
    #[arg(long)]
    key: Vec<String>,

    /// Show the N most used words
    #[arg(long)]
    top: Option<usize>,

    /// List user dictionary words
    #[arg(long)]
    user: bool,

    /// Dump unigram and bigram counts
    #[arg(long)]
    grams: bool,

    /// Print rows as JSON lines
    #[arg(long)]
    json: bool,
}

fn print_row(row: &WordRow, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(row)?);
    } else {
        println!(
            "  {:<16} {:<8} {}",
            row.key,
            row.han.as_deref().unwrap_or("-"),
            row.priority
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let store = LexiconStore::open_redb(&args.db)?;
    println!(
        "Opened {}: {} syllables, {} words, {} user words",
        args.db.display(),
        store.syllables()?.len(),
        store.words()?.len(),
        store.user_words()?.len()
    );

    if !args.key.is_empty() {
        let keys: Vec<&str> = args.key.iter().map(String::as_str).collect();
        let rows = store.lookup_batch(&keys)?;
        if rows.is_empty() {
            println!("No rows for {:?}", keys);
        }
        for row in &rows {
            print_row(row, args.json)?;
        }
    }

    if let Some(n) = args.top {
        println!("Top {} words:", n);
        for row in store.all_words_by_frequency()?.iter().take(n) {
            let surface = row.han.as_deref().unwrap_or(&row.key);
            let count = store.unigram_count(surface)?;
            println!("  {:>6}  {}", count, surface);
        }
    }

    if args.user {
        for word in store.user_words()? {
            println!("  {:<16} {}", word.input, word.output);
        }
    }

    if args.grams {
        let unigrams = store.unigrams()?;
        println!("Unigrams ({}):", unigrams.len());
        for (token, count) in unigrams {
            println!("  {:>6}  {}", count, token);
        }
        let bigrams = store.bigrams()?;
        println!("Bigrams ({}):", bigrams.len());
        for ((left, right), count) in bigrams {
            println!("  {:>6}  {} {}", count, left, right);
        }
    }
    Ok(())
}
