use clap::{Parser, Subcommand};
use scrivener::config::Config;
use scrivener::parse::{LexiconTagger, Pipeline};
use scrivener::{Error, ErrorLevel, ErrorType, Row, Source, TransactionBlock};
use std::path::PathBuf;
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

#[derive(Debug, Parser)]
#[command(
    name = "scrivener",
    about = "Turns transcribed ledger rows into transactions.",
    version = VERSION,
    author = AUTHOR,
)]
struct Cli {
    /// JSON files holding arrays of `{ "context": {...}, "text": "..." }` rows.
    #[arg(short, required = true)]
    input: Vec<String>,
    /// Item word list, one word per line.
    #[arg(long)]
    items: Option<PathBuf>,
    /// Amount word list, one word per line.
    #[arg(long)]
    amounts: Option<PathBuf>,
    /// JSON table of relationships by account holder.
    #[arg(long)]
    relationships: Option<PathBuf>,
    #[arg(short, long)]
    threads: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints every block as a JSON array of transactions.
    Parse,
    /// Prints only the transactions that need manual review.
    Errors,
}

fn read_sheet(path: &str) -> Result<Vec<Row>, Error> {
    let io_error = |msg: String| Error {
        msg,
        src: Source::row(&Arc::new(path.to_string()), 0),
        r#type: ErrorType::Io,
        level: ErrorLevel::Error,
    };
    let data = std::fs::read_to_string(path)
        .map_err(|e| io_error(format!("Couldn't read {}: {:?}", path, e)))?;
    serde_json::from_str(&data).map_err(|e| io_error(format!("Invalid rows in {}: {}", path, e)))
}

fn print_blocks(blocks: &[TransactionBlock]) {
    for block in blocks {
        match serde_json::to_string_pretty(block) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("cannot serialize block: {}", e),
        }
    }
}

fn print_review(blocks: &[TransactionBlock]) {
    for txn in blocks.iter().flat_map(|block| block.iter()) {
        if txn.has_errors() {
            println!("{}\n", txn);
        }
    }
}

fn main() {
    pretty_env_logger::init();
    let args = Cli::parse();
    let mut config = Config {
        item_words: args.items,
        amount_words: args.amounts,
        relationships: args.relationships,
        ..Config::default()
    };
    if let Some(threads) = args.threads {
        config.threads = threads;
    }

    let words = match config.word_index() {
        Ok(words) => words,
        Err(error) => {
            println!("{}\n", error);
            std::process::exit(1);
        }
    };
    let relations = match config.relationship_lookup() {
        Ok(relations) => relations,
        Err(error) => {
            println!("{}\n", error);
            std::process::exit(1);
        }
    };

    let mut sheets = vec![];
    for path in &args.input {
        match read_sheet(path) {
            Ok(rows) => sheets.push((path.clone(), rows)),
            Err(error) => println!("{}\n", error),
        }
    }

    let tagger = LexiconTagger::new(&words);
    let pipeline = Pipeline::new(&tagger, &words, relations.as_ref());
    for (sheet, blocks, errors) in pipeline.parse_sheets(sheets, config.threads) {
        log::info!("{}: {} blocks, {} problems", sheet, blocks.len(), errors.len());
        match args.command {
            Commands::Parse => {
                for error in &errors {
                    eprintln!("{}\n", error);
                }
                print_blocks(&blocks);
            }
            Commands::Errors => print_review(&blocks),
        }
    }
}
