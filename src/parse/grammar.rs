//! Turns tagger output into a stream of [`SemanticToken`]s.
//!
//! The combiner walks the tagged tokens once, left to right. For every
//! token the first matching rule of [`RULES`] decides whether it starts a
//! new semantic token or merges into the one on top of the output stack.

use super::normalize::{
    FANCY_FRACTION, FANCY_PENCE, FANCY_POUNDS, FANCY_SHILLINGS, FINAL_WEIGHT, NO_FINAL_TOBACCO,
    TARE_WEIGHT, TOBACCO_MARK_NUMBER, TOBACCO_MARK_TEXT, TOBACCO_NOTE, TOBACCO_WEIGHT,
    TOTAL_WEIGHT, UNIT_PRICE,
};
use super::tagger::{TaggedToken, UNRECOGNIZED_POS};
use super::token::{is_numeric, is_price_shaped, Shape};
use crate::utils::vulgar_fraction;
use crate::words::WordIndex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The meaning the grammar assigns to a token.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    None,
    Price,
    CombPrice,
    Amt,
    Cardinal,
    Quantity,
    CombQuantity,
    Person,
    Date,
    Org,
    Trans,
    Ender,
    Cash,
    Liber,
    TmNumber,
    TmText,
    TobaccoNote,
    GrossWeight,
    TareWeight,
    NetWeight,
    FinalWeight,
    UnitPrice,
    NoFinalTobacco,
    FancyPounds,
    FancyShillings,
    FancyPence,
    FancyFraction,
    Cc,
    CcDenied,
    CcTob,
    IsBulk,
    Noun,
    CombNoun,
    BadEntry,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::None => "NONE",
            Label::Price => "PRICE",
            Label::CombPrice => "COMB.PRICE",
            Label::Amt => "AMT",
            Label::Cardinal => "CARDINAL",
            Label::Quantity => "QUANTITY",
            Label::CombQuantity => "COMB.QUANTITY",
            Label::Person => "PERSON",
            Label::Date => "DATE",
            Label::Org => "ORG",
            Label::Trans => "TRANS",
            Label::Ender => "ENDER",
            Label::Cash => "CASH",
            Label::Liber => "LIBER",
            Label::TmNumber => "TM#",
            Label::TmText => "TM.TEXT",
            Label::TobaccoNote => "MLTBE.NOTE",
            Label::GrossWeight => "MLTBE.GROSS",
            Label::TareWeight => "MLTBE.TARE",
            Label::NetWeight => "TB_W",
            Label::FinalWeight => "MLTBE.FINAL",
            Label::UnitPrice => "MLTBE.PRICE",
            Label::NoFinalTobacco => "MLTBE.NO_FINAL",
            Label::FancyPounds => "FANCY.L",
            Label::FancyShillings => "FANCY.S",
            Label::FancyPence => "FANCY.D",
            Label::FancyFraction => "FANCY.FRACTION",
            Label::Cc => "CC",
            Label::CcDenied => "CC.DENIED",
            Label::CcTob => "CC.TOB",
            Label::IsBulk => "IS.BULK",
            Label::Noun => "NOUN",
            Label::CombNoun => "COMB.NOUN",
            Label::BadEntry => "BAD_ENTRY",
        }
    }

    /// Labels that come from normalizer pseudo-tokens.
    pub fn is_pseudo(self) -> bool {
        matches!(
            self,
            Label::TmNumber
                | Label::TmText
                | Label::TobaccoNote
                | Label::GrossWeight
                | Label::TareWeight
                | Label::NetWeight
                | Label::FinalWeight
                | Label::UnitPrice
                | Label::NoFinalTobacco
                | Label::FancyPounds
                | Label::FancyShillings
                | Label::FancyPence
                | Label::FancyFraction
        )
    }

    pub fn is_price(self) -> bool {
        matches!(self, Label::Price | Label::CombPrice)
    }

    pub fn is_amount(self) -> bool {
        matches!(
            self,
            Label::Amt | Label::Cardinal | Label::Quantity | Label::CombQuantity
        )
    }

    pub fn is_noun(self) -> bool {
        matches!(self, Label::Noun | Label::CombNoun)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const PSEUDO_TOKENS: [(&str, Label); 13] = [
    (TOBACCO_MARK_NUMBER, Label::TmNumber),
    (TOBACCO_MARK_TEXT, Label::TmText),
    (TOBACCO_NOTE, Label::TobaccoNote),
    (TOTAL_WEIGHT, Label::GrossWeight),
    (TARE_WEIGHT, Label::TareWeight),
    (TOBACCO_WEIGHT, Label::NetWeight),
    (FINAL_WEIGHT, Label::FinalWeight),
    (UNIT_PRICE, Label::UnitPrice),
    (NO_FINAL_TOBACCO, Label::NoFinalTobacco),
    (FANCY_POUNDS, Label::FancyPounds),
    (FANCY_SHILLINGS, Label::FancyShillings),
    (FANCY_PENCE, Label::FancyPence),
    (FANCY_FRACTION, Label::FancyFraction),
];

/// A unit of meaning in a sub-entry: one or more merged tagger tokens.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticToken {
    pub text: String,
    pub label: Label,
    pub pos: String,
}

impl SemanticToken {
    pub fn new(text: impl Into<String>, label: Label, pos: &str) -> Self {
        SemanticToken {
            text: text.into(),
            label,
            pos: pos.to_string(),
        }
    }
}

impl fmt::Display for SemanticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.text, self.label, self.pos)
    }
}

impl From<&SemanticToken> for TaggedToken {
    fn from(token: &SemanticToken) -> Self {
        let entity = match token.label {
            Label::Price | Label::CombPrice => "MONEY",
            Label::Cardinal => "CARDINAL",
            Label::Amt | Label::Quantity | Label::CombQuantity => "QUANTITY",
            Label::Date => "DATE",
            Label::Person => "PERSON",
            Label::Org => "ORG",
            _ => "",
        };
        TaggedToken::new(token.text.clone(), entity, &token.pos)
    }
}

#[derive(Clone, Copy)]
enum Action {
    /// Push a new token with the given label.
    Emit(Label),
    /// Append to the top token, relabelling it.
    Merge(Label),
    /// Append to the top token with a fixed separator.
    Join(Label, &'static str),
    /// Push an empty pseudo-token that absorbs the value after it.
    Marker(Label),
}

struct Window<'a> {
    tokens: &'a [TaggedToken],
    index: usize,
    spaced: bool,
    last: bool,
    absorbing: bool,
    top: Option<&'a SemanticToken>,
}

impl<'a> Window<'a> {
    fn cur(&self) -> &'a TaggedToken {
        &self.tokens[self.index]
    }

    fn text(&self) -> &'a str {
        &self.cur().text
    }

    fn lower(&self) -> String {
        self.text().trim_end_matches('.').to_lowercase()
    }

    fn prev(&self) -> Option<&'a TaggedToken> {
        self.index.checked_sub(1).map(|i| &self.tokens[i])
    }

    fn next(&self) -> Option<&'a TaggedToken> {
        self.tokens.get(self.index + 1)
    }

    fn top_is(&self, labels: &[Label]) -> bool {
        self.top.map_or(false, |top| labels.contains(&top.label))
    }

    fn top_label(&self) -> Option<Label> {
        self.top.map(|top| top.label)
    }

    fn entity(&self) -> &'a str {
        &self.cur().entity
    }

    fn pos(&self) -> &'a str {
        &self.cur().pos
    }
}

fn is_noun_pos(pos: &str) -> bool {
    pos.starts_with("NN")
}

fn is_conjunction(w: &Window) -> bool {
    w.pos() == "CC" || matches!(w.text(), "and" | "&")
}

fn is_fraction(text: &str) -> bool {
    vulgar_fraction(text).is_some()
}

type Rule = fn(&Window, &WordIndex) -> Option<Action>;

fn pseudo_marker(w: &Window, _: &WordIndex) -> Option<Action> {
    PSEUDO_TOKENS
        .iter()
        .find(|(name, _)| *name == w.text())
        .map(|(_, label)| Action::Marker(*label))
}

fn pseudo_value(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    (w.absorbing && top.label.is_pseudo() && (top.text.is_empty() || !w.spaced))
        .then_some(Action::Merge(top.label))
}

fn transaction_marker(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.index == 0 && matches!(w.text(), "To" | "By")).then_some(Action::Emit(Label::Trans))
}

fn ender_marker(w: &Window, _: &WordIndex) -> Option<Action> {
    let keyword = matches!(w.lower().as_str(), "total" | "subtotal" | "sub-total");
    (keyword && (w.index == 0 || w.top_is(&[Label::Trans]))).then_some(Action::Emit(Label::Ender))
}

fn cash(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.lower() == "cash").then_some(Action::Emit(Label::Cash))
}

fn liber_marker(w: &Window, _: &WordIndex) -> Option<Action> {
    matches!(w.lower().as_str(), "liber" | "lib").then_some(Action::Emit(Label::Liber))
}

fn liber_letter(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    let letter = w.text().trim_end_matches('.');
    let single = letter.len() == 1 && letter.chars().all(|c| c.is_ascii_alphabetic());
    (top.label == Label::Liber && !top.text.contains(' ') && single)
        .then_some(Action::Merge(Label::Liber))
}

fn price_continuation(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    if !top.label.is_price() {
        return None;
    }
    let unit_run = Shape::of(w.text()) == Some(Shape::UnitMoney)
        && top
            .text
            .split_whitespace()
            .last()
            .map_or(false, |word| Shape::of(word) == Some(Shape::UnitMoney));
    (is_fraction(w.text()) || unit_run).then_some(Action::Merge(Label::CombPrice))
}

fn money_after_price(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    let second_ratio = Shape::of(w.text()) == Some(Shape::Slash) && top.text.contains('/');
    (top.label.is_price() && w.entity() == "MONEY" && !second_ratio)
        .then_some(Action::Merge(Label::CombPrice))
}

fn mixed_number(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    let whole = top.label.is_amount()
        && top
            .text
            .split_whitespace()
            .last()
            .map_or(false, |word| Shape::of(word) == Some(Shape::Integer));
    (whole && is_fraction(w.text())).then_some(Action::Merge(top.label))
}

fn price_shape(w: &Window, _: &WordIndex) -> Option<Action> {
    let after_at = w
        .prev()
        .map_or(false, |p| matches!(p.text.as_str(), "at" | "@"));
    let before_price = w.next().map_or(false, |n| is_price_shaped(&n.text));
    (is_price_shaped(w.text()) && (w.last || after_at || before_price))
        .then_some(Action::Emit(Label::Price))
}

fn money_stray(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "MONEY" && is_price_shaped(w.text())).then_some(Action::Emit(Label::Price))
}

fn amount_word(w: &Window, words: &WordIndex) -> Option<Action> {
    let top = w.top?;
    let counted = top.label.is_amount() || is_numeric(&top.text);
    (counted && words.is_amount(w.text())).then_some(Action::Merge(Label::Amt))
}

fn cardinal_at_end(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "CARDINAL"
        && w.top_is(&[Label::Cardinal])
        && w.last
        && Shape::of(w.text()) == Some(Shape::Integer))
    .then_some(Action::Join(Label::CombPrice, "/"))
}

fn cardinal(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "CARDINAL" || is_numeric(w.text())).then_some(Action::Emit(Label::Cardinal))
}

fn quantity_run(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "QUANTITY" && w.top_is(&[Label::Quantity, Label::CombQuantity]))
        .then_some(Action::Merge(Label::CombQuantity))
}

fn quantity(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "QUANTITY").then_some(Action::Emit(Label::Quantity))
}

fn date_run(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "DATE" && w.top_is(&[Label::Date])).then_some(Action::Merge(Label::Date))
}

fn date(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "DATE").then_some(Action::Emit(Label::Date))
}

fn person_run(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "PERSON" && w.top_is(&[Label::Person])).then_some(Action::Merge(Label::Person))
}

fn person(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "PERSON").then_some(Action::Emit(Label::Person))
}

fn org_run(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "ORG" && w.top_is(&[Label::Org])).then_some(Action::Merge(Label::Org))
}

fn org(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.entity() == "ORG").then_some(Action::Emit(Label::Org))
}

fn gerund_after_noun(w: &Window, _: &WordIndex) -> Option<Action> {
    (w.pos() == "VBG" && w.top_is(&[Label::Noun, Label::CombNoun]))
        .then_some(Action::Emit(Label::None))
}

fn noun_run(w: &Window, _: &WordIndex) -> Option<Action> {
    (is_noun_pos(w.pos()) && w.top_is(&[Label::Noun, Label::CombNoun]))
        .then_some(Action::Merge(Label::CombNoun))
}

fn conj_nouns(w: &Window, _: &WordIndex) -> Option<Action> {
    let noun_follows = w
        .next()
        .map_or(false, |n| is_noun_pos(&n.pos) || n.pos == "JJ");
    (is_conjunction(w) && w.top_is(&[Label::Noun, Label::CombNoun]) && noun_follows)
        .then_some(Action::Merge(Label::CombNoun))
}

fn adjective_in_noun_run(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    let after_conj = top.text.ends_with(" and") || top.text.ends_with(" &");
    (w.pos() == "JJ" && top.label == Label::CombNoun && after_conj)
        .then_some(Action::Merge(Label::CombNoun))
}

fn conj_tobacco(w: &Window, _: &WordIndex) -> Option<Action> {
    let price_follows = w.next().map_or(false, |n| is_price_shaped(&n.text));
    (is_conjunction(w) && price_follows).then_some(Action::Emit(Label::CcTob))
}

fn conj_amount(w: &Window, _: &WordIndex) -> Option<Action> {
    let amount_follows = w.next().map_or(false, |n| is_numeric(&n.text));
    (is_conjunction(w) && amount_follows).then_some(Action::Emit(Label::Cc))
}

fn conj_denied(w: &Window, _: &WordIndex) -> Option<Action> {
    is_conjunction(w).then_some(Action::Emit(Label::CcDenied))
}

fn adjective_noun(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    (is_noun_pos(w.pos()) && top.label == Label::None && top.pos == "JJ")
        .then_some(Action::Merge(Label::CombNoun))
}

fn adjective_run(w: &Window, _: &WordIndex) -> Option<Action> {
    let top = w.top?;
    (w.pos() == "JJ" && top.label == Label::None && top.pos == "JJ")
        .then_some(Action::Merge(Label::None))
}

fn noun(w: &Window, _: &WordIndex) -> Option<Action> {
    is_noun_pos(w.pos()).then_some(Action::Emit(Label::Noun))
}

fn fallback(_: &Window, _: &WordIndex) -> Option<Action> {
    Some(Action::Emit(Label::None))
}

/// Ordered rules; the first one that matches decides.
const RULES: &[(&str, Rule)] = &[
    ("pseudo_marker", pseudo_marker),
    ("pseudo_value", pseudo_value),
    ("transaction_marker", transaction_marker),
    ("ender_marker", ender_marker),
    ("cash", cash),
    ("liber_marker", liber_marker),
    ("liber_letter", liber_letter),
    ("price_continuation", price_continuation),
    ("money_after_price", money_after_price),
    ("mixed_number", mixed_number),
    ("price_shape", price_shape),
    ("money_stray", money_stray),
    ("amount_word", amount_word),
    ("cardinal_at_end", cardinal_at_end),
    ("cardinal", cardinal),
    ("quantity_run", quantity_run),
    ("quantity", quantity),
    ("date_run", date_run),
    ("date", date),
    ("person_run", person_run),
    ("person", person),
    ("org_run", org_run),
    ("org", org),
    ("gerund_after_noun", gerund_after_noun),
    ("noun_run", noun_run),
    ("conj_nouns", conj_nouns),
    ("adjective_in_noun_run", adjective_in_noun_run),
    ("conj_tobacco", conj_tobacco),
    ("conj_amount", conj_amount),
    ("conj_denied", conj_denied),
    ("adjective_noun", adjective_noun),
    ("adjective_run", adjective_run),
    ("noun", noun),
    ("fallback", fallback),
];

/// For every tagger token, whether white space separated it from the token
/// before, found by locating the surfaces in `text` in order.
fn spacing(text: &str, tokens: &[TaggedToken]) -> Vec<bool> {
    let mut cursor = 0;
    tokens
        .iter()
        .map(|token| match text[cursor..].find(token.text.as_str()) {
            Some(offset) => {
                let gap = &text[cursor..cursor + offset];
                cursor += offset + token.text.len();
                !gap.is_empty() && gap.chars().any(char::is_whitespace)
            }
            None => true,
        })
        .collect()
}

fn is_punct(token: &TaggedToken) -> bool {
    token.pos == "," || token.pos == "." || Shape::of(&token.text) == Some(Shape::Punct)
}

/// Applies the token grammar to one tagged sub-entry.
pub struct Combiner<'w> {
    words: &'w WordIndex,
}

impl<'w> Combiner<'w> {
    pub fn new(words: &'w WordIndex) -> Self {
        Combiner { words }
    }

    /// Combines `tokens`, the tagger's reading of the normalized sub-entry
    /// `text`, into semantic tokens.
    pub fn combine(&self, text: &str, tokens: &[TaggedToken]) -> Vec<SemanticToken> {
        if tokens.iter().any(|t| t.pos == UNRECOGNIZED_POS) {
            log::debug!("unrecognized token in {:?}", text);
            let mut output = vec![SemanticToken::new(text, Label::BadEntry, UNRECOGNIZED_POS)];
            output.extend(
                tokens
                    .iter()
                    .map(|t| SemanticToken::new(t.text.clone(), Label::None, &t.pos)),
            );
            return output;
        }

        let spaced = spacing(text, tokens);
        let last = tokens.iter().rposition(|t| !is_punct(t));
        let mut output: Vec<SemanticToken> = Vec::with_capacity(tokens.len());
        let mut absorbing = false;
        for index in 0..tokens.len() {
            let window = Window {
                tokens,
                index,
                spaced: spaced[index],
                last: Some(index) == last,
                absorbing,
                top: output.last(),
            };
            let (name, action) = RULES
                .iter()
                .find_map(|(name, rule)| rule(&window, self.words).map(|action| (*name, action)))
                .unwrap_or(("fallback", Action::Emit(Label::None)));
            let top_label = window.top_label();
            log::trace!("{:?}: rule {}", tokens[index].text, name);

            let token = &tokens[index];
            absorbing = match action {
                Action::Emit(label) => {
                    output.push(SemanticToken::new(token.text.clone(), label, &token.pos));
                    false
                }
                Action::Marker(label) => {
                    output.push(SemanticToken::new("", label, &token.pos));
                    label != Label::NoFinalTobacco
                }
                Action::Merge(label) | Action::Join(label, _) => {
                    let separator = match action {
                        Action::Join(_, separator) => separator,
                        _ if spaced[index] => " ",
                        _ => "",
                    };
                    match output.last_mut() {
                        Some(top) => {
                            if !top.text.is_empty() {
                                top.text.push_str(separator);
                            }
                            top.text.push_str(&token.text);
                            top.label = label;
                        }
                        None => output.push(SemanticToken::new(token.text.clone(), label, &token.pos)),
                    }
                    name == "pseudo_value" && top_label.map_or(false, Label::is_pseudo)
                }
            };
        }
        mark_bulk_prices(&mut output);
        output
    }
}

/// Relabels an `at` standing right before a price as [`Label::IsBulk`].
fn mark_bulk_prices(tokens: &mut [SemanticToken]) {
    for i in 1..tokens.len() {
        let at = matches!(tokens[i - 1].text.to_lowercase().as_str(), "at" | "@");
        if at && tokens[i].label.is_price() && tokens[i - 1].label == Label::None {
            tokens[i - 1].label = Label::IsBulk;
        }
    }
}
