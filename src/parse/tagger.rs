use super::{Lexer, Shape};
use crate::words::WordIndex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The part-of-speech tag a tagger gives to input it cannot read.
pub const UNRECOGNIZED_POS: &str = "X";

/// One token as a part-of-speech/entity tagger reports it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedToken {
    pub text: String,
    /// Entity type: `PERSON`, `DATE`, `MONEY`, `CARDINAL`, `QUANTITY`,
    /// `ORG`, or empty.
    pub entity: String,
    pub pos: String,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, entity: &str, pos: &str) -> Self {
        TaggedToken {
            text: text.into(),
            entity: entity.to_string(),
            pos: pos.to_string(),
        }
    }
}

/// Tags a normalized sub-entry. Must be deterministic within a run.
pub trait Tagger {
    fn tag(&self, text: &str) -> Vec<TaggedToken>;
}

impl<T: Tagger + ?Sized> Tagger for &T {
    fn tag(&self, text: &str) -> Vec<TaggedToken> {
        (**self).tag(text)
    }
}

const MONTHS: &[&str] = &[
    "jan", "jany", "january", "feb", "feby", "february", "mar", "march", "apr", "april", "may",
    "jun", "june", "jul", "july", "aug", "augt", "august", "sep", "sept", "september", "oct",
    "october", "nov", "novr", "november", "dec", "decr", "december",
];

const HONORIFICS: &[&str] = &[
    "mr", "mrs", "messrs", "miss", "capt", "captain", "col", "colonel", "dr", "doctor", "majr",
    "major", "revd", "rev", "widow",
];

const PREPOSITIONS: &[&str] = &[
    "at", "for", "of", "per", "by", "from", "with", "in", "on", "into", "upon", "off",
];

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "his", "her", "their", "your", "my", "this", "that", "these", "those",
];

const ADJECTIVES: &[&str] = &[
    "best", "black", "blue", "broad", "brown", "coarse", "common", "double", "fine", "good",
    "green", "large", "long", "narrow", "new", "old", "red", "short", "single", "small",
    "striped", "strong", "white", "wide", "yellow",
];

fn bare(word: &str) -> String {
    word.trim_end_matches('.').to_lowercase()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map_or(false, char::is_uppercase)
}

/// A deterministic dictionary tagger built from token shapes and the word
/// indices. It stands in for a statistical tagger in tests, benchmarks and
/// the command line tool.
pub struct LexiconTagger<'w> {
    words: &'w WordIndex,
}

impl<'w> LexiconTagger<'w> {
    pub fn new(words: &'w WordIndex) -> Self {
        LexiconTagger { words }
    }

    fn tag_word(&self, word: &str, prev: Option<&TaggedToken>) -> TaggedToken {
        let lower = bare(word);
        let follows = |entity: &str| prev.map_or(false, |p| p.entity == entity);
        if MONTHS.contains(&lower.as_str()) && is_capitalized(word) {
            TaggedToken::new(word, "DATE", "NNP")
        } else if HONORIFICS.contains(&lower.as_str()) && is_capitalized(word) {
            TaggedToken::new(word, "PERSON", "NNP")
        } else if matches!(lower.as_str(), "company" | "co") && is_capitalized(word) {
            TaggedToken::new(word, "ORG", "NNP")
        } else if lower == "and" {
            TaggedToken::new(word, "", "CC")
        } else if lower == "to" {
            TaggedToken::new(word, "", "TO")
        } else if PREPOSITIONS.contains(&lower.as_str()) {
            TaggedToken::new(word, "", "IN")
        } else if DETERMINERS.contains(&lower.as_str()) {
            TaggedToken::new(word, "", "DT")
        } else if self.words.is_item(&lower) {
            TaggedToken::new(word, "", "NN")
        } else if lower.len() > 4 && lower.ends_with("ing") {
            TaggedToken::new(word, "", "VBG")
        } else if ADJECTIVES.contains(&lower.as_str()) {
            TaggedToken::new(word, "", "JJ")
        } else if is_capitalized(word) && follows("PERSON") {
            TaggedToken::new(word, "PERSON", "NNP")
        } else if is_capitalized(word) {
            TaggedToken::new(word, "", "NNP")
        } else {
            TaggedToken::new(word, "", "NN")
        }
    }
}

impl<'w> Tagger for LexiconTagger<'w> {
    fn tag(&self, text: &str) -> Vec<TaggedToken> {
        let mut tokens: Vec<TaggedToken> = Vec::new();
        for (shape, surface) in Lexer::new(text) {
            let prev = tokens.last();
            let token = match shape {
                Shape::UnitMoney | Shape::Slash => TaggedToken::new(surface, "MONEY", "CD"),
                Shape::Integer | Shape::Ordinal
                    if prev.map_or(false, |p| p.entity == "DATE") =>
                {
                    TaggedToken::new(surface, "DATE", "CD")
                }
                Shape::Integer
                | Shape::Decimal
                | Shape::MixedNumber
                | Shape::Fraction
                | Shape::Ordinal => TaggedToken::new(surface, "CARDINAL", "CD"),
                Shape::Word => self.tag_word(surface, prev),
                Shape::Ampersand => TaggedToken::new(surface, "", "CC"),
                Shape::At => TaggedToken::new(surface, "", "IN"),
                Shape::Punct => TaggedToken::new(surface, "", ","),
                Shape::WhiteSpace | Shape::Error => {
                    TaggedToken::new(surface, "", UNRECOGNIZED_POS)
                }
            };
            tokens.push(token);
        }
        tokens
    }
}
