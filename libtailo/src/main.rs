use clap::{Parser, ValueEnum};
use khiin_core::{BufferSnapshot, InputMode, SegmentState};
use libtailo::Engine;
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Basic,
    Continuous,
}

impl From<Mode> for InputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Basic => InputMode::Basic,
            Mode::Continuous => InputMode::Continuous,
        }
    }
}

#[derive(Parser)]
#[command(name = "tailo-demo")]
#[command(about = "Type Tai-lo with tone digits and watch the composition buffer")]
#[command(version)]
struct Cli {
    /// Directory holding khiin.db, khiin.toml and khiin_user.txt
    #[arg(short, long, default_value = "data")]
    resource_dir: PathBuf,

    /// Segmentation mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Show the neutral-tone key as "--" instead of a dot
    #[arg(long)]
    no_dotted_khin: bool,

    /// Do not carry neutral tone onto the syllables after a "--" syllable
    #[arg(long)]
    no_autokhin: bool,

    /// Print every snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn print_snapshot(snap: &BufferSnapshot, json: bool) {
    if json {
        match snap.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("error: {}", e),
        }
        return;
    }

    let mut caret: String = snap.display.chars().take(snap.cursor).collect();
    caret.push('|');
    caret.extend(snap.display.chars().skip(snap.cursor));
    println!("  [{}]  raw='{}'", caret, snap.raw);

    if let Some(i) = snap.focused() {
        let seg = &snap.segments[i];
        for (n, c) in seg.candidates.iter().enumerate().take(9) {
            let marker = if n == seg.selected { '>' } else { ' ' };
            println!("  {}{}. {} ({:.2})", marker, n + 1, c.text, c.score);
        }
    } else {
        for seg in snap.segments.iter().filter(|s| s.state == SegmentState::Composing) {
            let first: Vec<&str> = seg.candidates.iter().take(3).map(|c| c.text.as_str()).collect();
            println!("  {} -> {}", seg.text, first.join(" / "));
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let mut engine = Engine::create(&cli.resource_dir);
    let mut app = engine.config().app();
    if let Some(mode) = cli.mode {
        app = app.with_input_mode(mode.into());
    }
    app.dotted_khin &= !cli.no_dotted_khin;
    app.autokhin &= !cli.no_autokhin;
    engine.config().update(app);

    let note = if engine.is_degraded() { ", built-in lexicon" } else { "" };
    println!(
        "tailo-demo ({} words, {} user words{})",
        engine.lexicon().word_count(),
        engine.lexicon().user_word_count(),
        note
    );
    println!("Type letters, tone digits and \"--\" for neutral tone. Commands: :next :prev :bksp :del :left :right :space :commit :clear");
    println!();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("error reading stdin: {}", e);
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let buffer = engine.buffer_manager();
        let snap = match input {
            ":next" => buffer.focus_next_candidate(),
            ":prev" => buffer.focus_prev_candidate(),
            ":bksp" => buffer.delete_backward(1),
            ":del" => buffer.delete_forward(1),
            ":left" => buffer.move_cursor_left(),
            ":right" => buffer.move_cursor_right(),
            ":space" => buffer.word_boundary(),
            ":clear" => buffer.clear(),
            ":commit" => {
                let text = buffer.commit();
                println!("  committed: {}", text);
                continue;
            }
            text => buffer.insert(text),
        };
        print_snapshot(&snap, cli.json);
    }
}
