//! Static word indices consulted by the grammar and the extractor.
//!
//! The indices are loaded once before parsing and never change during a
//! run. Lookups are by lowercase word.

use crate::{Error, ErrorLevel, ErrorType, Source};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const ITEM_WORDS: &[&str] = &[
    "allspice", "axe", "axes", "beef", "blanket", "blankets", "bottle", "bottles", "bowl",
    "brandy", "bridle", "buckles", "buttons", "calico", "candles", "check", "cloth", "coffee",
    "combs", "corn", "cotton", "cups", "duffel", "flints", "flour", "frieze", "gin", "gloves",
    "goods", "handkerchief", "handkerchiefs", "hat", "hats", "hoe", "hoes", "hose", "indigo",
    "iron", "kersey", "kettle", "knife", "knives", "lace", "lead", "lincey", "linen", "molasses",
    "muslin", "nails", "needles", "osnabrugs", "paper", "pepper", "pins", "plains", "plates",
    "pork", "pot", "powder", "ribbon", "rum", "saddle", "salt", "scissors", "shalloon",
    "sheeting", "shoes", "shot", "silk", "soap", "spoons", "steel", "stockings", "sugar",
    "sundries", "tea", "thread", "tobacco", "wheat", "wine", "wool", "yarn",
];

const AMOUNT_WORDS: &[&str] = &[
    "barrel", "barrels", "bbl", "bolt", "bundle", "bush", "bushel", "bushels", "c", "cask",
    "cwt", "doz", "dozen", "ell", "ells", "gal", "gall", "gallon", "gallons", "gross", "hhd",
    "hhds", "hogshead", "hogsheads", "hundred", "keg", "lb", "lbs", "oz", "ounce", "pair",
    "pairs", "piece", "pieces", "pint", "pints", "pound", "pounds", "pr", "ps", "pt", "qt",
    "quart", "quarts", "quire", "quires", "ream", "set", "sett", "skein", "skeins", "w", "wt",
    "yard", "yards", "yd", "yds",
];

const RELATIONSHIP_WORDS: &[&str] = &[
    "brother", "daughter", "father", "husband", "mother", "nephew", "niece", "overseer",
    "servant", "sister", "son", "widow", "wife",
];

/// The item, amount and relationship word sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordIndex {
    item_words: HashSet<String>,
    amount_words: HashSet<String>,
    relationship_words: HashSet<String>,
}

fn lowered<I, S>(words: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|word| word.as_ref().trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Reads a word list: one word per line, `#` starts a comment.
fn read_word_file(path: &Path) -> Result<HashSet<String>, Error> {
    let data = fs::read_to_string(path).map_err(|io_error| Error {
        msg: format!("Couldn't read {}: {:?}", path.display(), io_error),
        src: Source::row(&Arc::new(path.display().to_string()), 0),
        r#type: ErrorType::Io,
        level: ErrorLevel::Error,
    })?;
    Ok(lowered(
        data.lines()
            .map(|line| line.split('#').next().unwrap_or("")),
    ))
}

impl Default for WordIndex {
    fn default() -> Self {
        WordIndex::new(ITEM_WORDS, AMOUNT_WORDS)
    }
}

impl WordIndex {
    pub fn new<I, A, S, T>(item_words: I, amount_words: A) -> Self
    where
        I: IntoIterator<Item = S>,
        A: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        WordIndex {
            item_words: lowered(item_words),
            amount_words: lowered(amount_words),
            relationship_words: lowered(RELATIONSHIP_WORDS),
        }
    }

    /// Loads the indices from word files, falling back to the built-in list
    /// for any file not given.
    pub fn from_files(items: Option<&Path>, amounts: Option<&Path>) -> Result<Self, Error> {
        let mut index = WordIndex::default();
        if let Some(path) = items {
            index.item_words = read_word_file(path)?;
        }
        if let Some(path) = amounts {
            index.amount_words = read_word_file(path)?;
        }
        log::debug!(
            "word index: {} item words, {} amount words",
            index.item_words.len(),
            index.amount_words.len()
        );
        Ok(index)
    }

    /// Whether `text`, or any word of it, is a known item.
    pub fn is_item(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.item_words.contains(lower.trim_end_matches('.'))
            || lower
                .split_whitespace()
                .any(|word| self.item_words.contains(word.trim_end_matches('.')))
    }

    pub fn is_amount(&self, word: &str) -> bool {
        self.amount_words
            .contains(word.to_lowercase().trim_end_matches('.'))
    }

    pub fn is_relationship(&self, word: &str) -> bool {
        self.relationship_words.contains(&word.to_lowercase())
    }
}
