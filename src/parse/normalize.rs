//! String-level cleanup of a transcribed ledger cell.
//!
//! The normalizer resolves the transcribers' editorial conventions
//! (brackets, carets, dittos), flattens multi-line tobacco blocks into
//! pseudo-tokens, and splits the cell into sub-entries. Its output is what
//! the tagger sees.

use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const TOBACCO_MARK_NUMBER: &str = "tobacco_mark_number";
pub const TOBACCO_MARK_TEXT: &str = "tobacco_mark_text";
pub const TOBACCO_NOTE: &str = "tobacco_note";
pub const TOTAL_WEIGHT: &str = "total_weight";
pub const TARE_WEIGHT: &str = "tare_weight";
pub const TOBACCO_WEIGHT: &str = "tobacco_weight";
pub const FINAL_WEIGHT: &str = "final_weight";
pub const UNIT_PRICE: &str = "unit_price";
pub const NO_FINAL_TOBACCO: &str = "no_final_tobacco";
pub const FANCY_POUNDS: &str = "fancy_pounds";
pub const FANCY_SHILLINGS: &str = "fancy_shillings";
pub const FANCY_PENCE: &str = "fancy_pence";
pub const FANCY_FRACTION: &str = "fancy_fraction";

static TOBACCO_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*TM\s*:?\s*([^\s\]]+)\s*([^\]]*)\]").unwrap());

static TOBACCO_NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:N[o°º]?\.?\s*)?(\d+)\s+(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)(?:\s+(\d+(?:\.\d+)?))?\s*$",
    )
    .unwrap()
});

static TOBACCO_SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:(?:lbs|lb|wt|w)\.?\s*)?(?:at|@)\s*(\S+)(.*)$").unwrap()
});

static DITTO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:[Dd]itto|[Dd]o)\.?\s*\[\s*([^\]\s]+)\s*\]").unwrap());

static GLUED_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)([A-Za-z]+)(\s*\[)").unwrap());

static SUBTOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.\.(\d+)\.\.(\d+)").unwrap());

static CARET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([½¼¾⅓⅔⅙⅚])?\s*\^\s*([Lsdp])\.?").unwrap());

static FANCY_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(fancy_pence \d+)\s+([½¼¾⅓⅔⅙⅚])").unwrap());

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\t\r\n]+| {4,}").unwrap());

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(To|By)\b").unwrap());

static ENDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:sub-?\s?total|total)\b").unwrap());

static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\s\[\]]+)\s*\[([^\[\]]+)\]").unwrap());

static DECORATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>\[\]^]").unwrap());

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Abbreviations whose bracketed expansion starts with a different letter.
const BRACKET_EXCEPTIONS: [(&str, &str); 8] = [
    ("w", "pound"),
    ("w", "pounds"),
    ("wt", "pound"),
    ("wt", "pounds"),
    ("lb", "pound"),
    ("lbs", "pounds"),
    ("c", "hundredweight"),
    ("cwt", "hundredweight"),
];

fn tobacco_marks(text: &str) -> String {
    TOBACCO_MARK_RE
        .replace_all(text, |caps: &Captures| {
            let mark_text = SPACE_RE.replace_all(caps[2].trim(), "_");
            if mark_text.is_empty() {
                format!(" {} {} ", TOBACCO_MARK_NUMBER, &caps[1])
            } else {
                format!(
                    " {} {} {} {} ",
                    TOBACCO_MARK_NUMBER, &caps[1], TOBACCO_MARK_TEXT, mark_text
                )
            }
        })
        .into_owned()
}

/// Folds the weight lines of a tobacco block into the line that opened it.
fn flatten_tobacco(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_block = false;
    for line in text.split('\n') {
        if let Some(caps) = TOBACCO_NOTE_RE.captures(line) {
            let mut flat = format!(
                "{} {} {} {} {} {}",
                TOBACCO_NOTE, &caps[1], TOTAL_WEIGHT, &caps[2], TARE_WEIGHT, &caps[3]
            );
            if let Some(net) = caps.get(4) {
                flat.push_str(&format!(" {} {}", TOBACCO_WEIGHT, net.as_str()));
            }
            match lines.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(&flat);
                }
                None => lines.push(flat),
            }
            in_block = true;
            continue;
        }
        if in_block {
            in_block = false;
            if let Some(caps) = TOBACCO_SUMMARY_RE.captures(line) {
                let flat = format!(
                    " {} {} {} {}{}",
                    FINAL_WEIGHT, &caps[1], UNIT_PRICE, &caps[2], &caps[3]
                );
                if let Some(last) = lines.last_mut() {
                    last.push_str(flat.trim_end());
                }
                continue;
            }
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(NO_FINAL_TOBACCO);
            }
        }
        lines.push(line.to_string());
    }
    if in_block {
        if let Some(last) = lines.last_mut() {
            last.push(' ');
            last.push_str(NO_FINAL_TOBACCO);
        }
    }
    lines.join("\n")
}

fn split_glued_units(text: &str) -> String {
    GLUED_UNIT_RE
        .replace_all(text, |caps: &Captures| match &caps[2] {
            "L" | "s" | "d" | "p" => caps[0].to_string(),
            unit => format!("{} {}{}", &caps[1], unit, &caps[3]),
        })
        .into_owned()
}

fn caret_prices(text: &str) -> String {
    let text = CARET_RE.replace_all(text, |caps: &Captures| {
        let pseudo = match &caps[3] {
            "L" => FANCY_POUNDS,
            "s" => FANCY_SHILLINGS,
            _ => FANCY_PENCE,
        };
        match caps.get(2) {
            Some(glyph) => format!(
                "{} {} {} {}",
                pseudo,
                &caps[1],
                FANCY_FRACTION,
                glyph.as_str()
            ),
            None => format!("{} {}", pseudo, &caps[1]),
        }
    });
    FANCY_TAIL_RE
        .replace_all(&text, |caps: &Captures| {
            format!("{} {} {}", &caps[1], FANCY_FRACTION, &caps[2])
        })
        .into_owned()
}

fn first_letter(word: &str) -> Option<char> {
    word.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
}

/// Whether the bracketed `expansion` stands in for the word `written`.
fn replaces(written: &str, expansion: &str) -> bool {
    let written = written.trim_end_matches('.').to_lowercase();
    let expansion = expansion.trim().to_lowercase();
    if matches!(written.as_str(), "ditto" | "do") {
        return true;
    }
    if BRACKET_EXCEPTIONS
        .iter()
        .any(|(w, e)| *w == written && *e == expansion)
    {
        return true;
    }
    first_letter(&written).is_some() && first_letter(&written) == first_letter(&expansion)
}

fn resolve_brackets(entry: &str) -> String {
    BRACKET_RE
        .replace_all(entry, |caps: &Captures| {
            if replaces(&caps[1], &caps[2]) {
                caps[2].trim().to_string()
            } else {
                format!("{} {}", &caps[1], caps[2].trim())
            }
        })
        .into_owned()
}

fn clean(entry: &str) -> String {
    let entry = DECORATION_RE.replace_all(entry, " ");
    SPACE_RE.replace_all(entry.trim(), " ").into_owned()
}

/// Normalizes one raw ledger cell into its sub-entries.
pub fn normalize(text: &str) -> Vec<String> {
    let text = text.replace('}', "");
    let text = tobacco_marks(&text);
    let text = flatten_tobacco(&text);
    let text = DITTO_RE.replace_all(&text, "$1");
    let text = split_glued_units(&text);
    let text = SUBTOTAL_RE.replace_all(&text, "$1/$2/$3");
    let text = caret_prices(&text);

    let mut entries = Vec::new();
    let mut marker: Option<&str> = None;
    for raw in SPLIT_RE.split(&text) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let mut entry = resolve_brackets(raw);
        if let Some(caps) = MARKER_RE.captures(raw) {
            marker = Some(if &caps[1] == "To" { "To" } else { "By" });
        } else if let Some(previous) = marker {
            if !ENDER_RE.is_match(raw) {
                entry = format!("{} {}", previous, entry);
            }
        }
        let entry = clean(&entry);
        if !entry.is_empty() {
            entries.push(entry);
        }
    }
    log::trace!("normalized {:?} into {:?}", text, entries);
    entries
}
