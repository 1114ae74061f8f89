//! Useful functions for reading the numbers transcribers write.

use crate::{Decimal, Error, ErrorLevel, ErrorType, Source};
use std::str::FromStr;

/// The Unicode vulgar fractions that occur in transcriptions, as
/// `(numerator, denominator)`.
const GLYPHS: [(char, i64, i64); 7] = [
    ('½', 1, 2),
    ('¼', 1, 4),
    ('¾', 3, 4),
    ('⅓', 1, 3),
    ('⅔', 2, 3),
    ('⅙', 1, 6),
    ('⅚', 5, 6),
];

/// Written-out fractions accepted as a continuation after a whole value.
const ASCII_FRACTIONS: [(&str, i64, i64); 5] = [
    ("1/2", 1, 2),
    ("1/4", 1, 4),
    ("3/4", 3, 4),
    ("1/3", 1, 3),
    ("2/3", 2, 3),
];

/// Returns the glyph for a fraction of twelve, if one exists.
pub fn glyph_for_twelfths(twelfths: i64) -> Option<char> {
    GLYPHS
        .iter()
        .find(|(_, num, den)| num * 12 / den == twelfths && (num * 12) % den == 0)
        .map(|(glyph, _, _)| *glyph)
}

/// Parses a lone fraction, either a glyph such as `½` or one of the
/// written-out forms such as `1/2`.
pub fn vulgar_fraction(text: &str) -> Option<(i64, i64)> {
    let text = text.trim();
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return GLYPHS
            .iter()
            .find(|(glyph, _, _)| *glyph == c)
            .map(|(_, num, den)| (*num, *den));
    }
    ASCII_FRACTIONS
        .iter()
        .find(|(form, _, _)| *form == text)
        .map(|(_, num, den)| (*num, *den))
}

/// Splits `"6½"` into `(6, Some((1, 2)))`. A bare glyph yields a whole part
/// of zero.
pub fn split_mixed(text: &str) -> Option<(i64, Option<(i64, i64)>)> {
    let text = text.trim();
    let digits_end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i);
    let (whole, rest) = text.split_at(digits_end);
    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().ok()?
    };
    if rest.is_empty() {
        if digits_end == 0 {
            return None;
        }
        return Some((whole, None));
    }
    vulgar_fraction(rest).map(|fraction| (whole, Some(fraction)))
}

/// Reads the leading number of an amount such as `6 yd`, `1½ ell` or
/// `2 ½ dozen`.
pub fn parse_quantity(text: &str) -> Option<Decimal> {
    let mut words = text.split_whitespace();
    let first = words.next()?;
    let mut value = if let Some((whole, fraction)) = split_mixed(first) {
        let mut value = Decimal::from(whole);
        if let Some((num, den)) = fraction {
            value += Decimal::from(num) / Decimal::from(den);
        }
        value
    } else {
        Decimal::from_str(first).ok()?
    };
    if let Some(next) = words.next() {
        if let Some((num, den)) = vulgar_fraction(next) {
            value += Decimal::from(num) / Decimal::from(den);
        }
    }
    Some(value)
}

/// Parses a [`Decimal`](crate::Decimal) from a [`&str`], reporting the
/// failure against `src`.
#[inline]
pub fn parse_decimal(num_str: &str, src: &Source) -> Result<Decimal, Error> {
    match Decimal::from_str(num_str.trim()) {
        Ok(num) => Ok(num),
        Err(_) => Err(Error {
            msg: format!("Invalid number {:?}.", num_str),
            src: src.clone(),
            r#type: ErrorType::Syntax,
            level: ErrorLevel::Warning,
        }),
    }
}
