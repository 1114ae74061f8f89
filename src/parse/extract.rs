//! Reads transactions out of the semantic tokens of one row.
//!
//! Every sub-entry of a row becomes one [`Transaction`]. The extractor
//! threads a draft transaction through the tokens of the sub-entry, resolves the
//! price into [`Money`], and then fills in what the row context knows.

use super::grammar::{Label, SemanticToken};
use super::token::Shape;
use crate::relations::RelationshipLookup;
use crate::utils::{parse_decimal, parse_quantity};
use crate::words::WordIndex;
use crate::{
    CurrencyType, Decimal, Direction, Error, ErrorLevel, ErrorType, Money, Phrase, Row,
    RowContext, Source, TobaccoEntry, TobaccoMark, Transaction, TxnKind,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `… per Mr John Smith` at the very end of a cell.
static ATTRIBUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|\s)(?:[Pp]er|[Ff]or)\s+((?:(?:Mr|Mrs|Messrs|Capt|Col|Dr)\.?\s+)?[A-Z][A-Za-z'\-]*(?:\s+[A-Z][A-Za-z'\-]*)*)\s*\.?\s*$",
    )
    .unwrap()
});

/// What the extractor learned from one row.
#[derive(Debug, Default)]
pub struct RowResult {
    pub txns: Vec<Transaction>,
    pub errors: Vec<Error>,
    /// The row is a `Total`/`Subtotal` row.
    pub is_ender: bool,
}

#[derive(Debug, Default)]
struct RowState {
    direction: Option<Direction>,
    is_ender: bool,
}

/// Where the last amount-like token went, so a following one can join it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountSlot {
    Amount,
    Possible,
}

/// The in-progress transaction of one sub-entry.
#[derive(Debug, Default)]
struct TxnDraft {
    txn: Transaction,
    depth: usize,
    phrase: Option<Phrase>,
    last_noun: Option<String>,
    candidates: Vec<String>,
    relationships: Vec<String>,
    possible_amounts: Vec<String>,
    tobacco: Option<TobaccoEntry>,
    /// Pounds, shillings, pence and fraction of a caret-written price.
    fancy: [Option<String>; 4],
    and_also: bool,
    bulk_next: bool,
    last_amount: Option<AmountSlot>,
    noun_after_price: bool,
    bad: bool,
    snippet: String,
    errors: Vec<Error>,
}

fn contract(src: &Source, msg: String) -> Error {
    Error {
        msg,
        src: src.clone(),
        r#type: ErrorType::Contract,
        level: ErrorLevel::Error,
    }
}

fn dedupe(names: &mut Vec<String>) {
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.to_lowercase()));
}

fn is_stray_amount(price: &str) -> bool {
    Shape::of(price) == Some(Shape::Slash) && price.split('/').count() == 2
}

impl TxnDraft {
    fn new(src: Source, tokens: &[SemanticToken]) -> Self {
        let snippet = tokens
            .iter()
            .map(|t| t.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        TxnDraft {
            txn: Transaction {
                src,
                context: tokens.to_vec(),
                ..Default::default()
            },
            snippet,
            ..Default::default()
        }
    }

    fn problem(&mut self, r#type: ErrorType, msg: String, context: &str) {
        log::warn!("{}: {}", self.txn.src, msg);
        self.errors.push(Error {
            msg: msg.clone(),
            src: self.txn.src.clone(),
            r#type,
            level: ErrorLevel::Warning,
        });
        self.txn.push_error(msg, context);
    }

    fn mark_tobacco(&mut self) {
        self.txn.is_tobacco = true;
        if self.txn.item.is_none() {
            self.txn.item = Some("Tobacco".to_string());
        }
    }

    fn close_tobacco(&mut self) {
        if let Some(mut entry) = self.tobacco.take() {
            if entry.weight.is_none() {
                if let (Some(gross), Some(tare)) = (entry.gross_weight, entry.tare_weight) {
                    entry.weight = Some(gross - tare);
                }
            }
            self.txn.tobacco_entries.push(entry);
        }
    }

    fn open_phrase(&mut self, word: &str) {
        if self.depth > 0 {
            if let Some(phrase) = self.phrase.as_mut() {
                phrase.phrase.push(word.to_string());
            }
            self.depth += 1;
            return;
        }
        self.depth = 1;
        self.phrase = Some(Phrase {
            modifies: self.last_noun.clone(),
            phrase: vec![word.to_string()],
        });
    }

    fn close_phrase(&mut self) {
        if let Some(phrase) = self.phrase.take() {
            self.txn.phrases.push(phrase);
        }
        self.depth = 0;
    }

    fn set_price(&mut self, text: &str, combo: bool) {
        self.close_phrase();
        if self.and_also && self.txn.is_tobacco {
            if let Some(item) = self.txn.item.as_mut() {
                item.push_str(" and ");
                item.push_str(text);
                self.and_also = false;
                return;
            }
        }
        self.and_also = false;
        match self.txn.price.take() {
            None => {}
            Some(unit) if self.txn.price_is_bulk => {
                log::debug!("{}: total {} replaces unit price {}", self.txn.src, text, unit);
            }
            Some(stray) if is_stray_amount(&stray) && self.noun_after_price => {
                self.possible_amounts.push(stray);
            }
            Some(first) => {
                self.txn.price = Some(first.clone());
                self.problem(
                    ErrorType::Incomplete,
                    format!("Multiple prices: {} and {}", first, text),
                    text,
                );
                return;
            }
        }
        self.txn.price = Some(text.to_string());
        self.txn.price_is_combo = combo || text.contains(' ');
        self.txn.price_is_bulk = self.bulk_next;
        self.bulk_next = false;
        self.noun_after_price = false;
    }

    fn flush_fancy(&mut self) {
        if self.fancy.iter().all(Option::is_none) {
            return;
        }
        let [pounds, shillings, pence, fraction] = std::mem::take(&mut self.fancy);
        let mut price = format!(
            "{}/{}/{}",
            pounds.as_deref().unwrap_or(":"),
            shillings.as_deref().unwrap_or(":"),
            pence.as_deref().unwrap_or(":"),
        );
        if let Some(fraction) = fraction {
            price.push(' ');
            price.push_str(&fraction);
        }
        self.set_price(&price, true);
    }
}

/// Reads the rows of one sheet into transactions.
pub struct Extractor<'a, R: RelationshipLookup + ?Sized> {
    words: &'a WordIndex,
    relations: &'a R,
}

impl<'a, R: RelationshipLookup + ?Sized> Extractor<'a, R> {
    pub fn new(words: &'a WordIndex, relations: &'a R) -> Self {
        Extractor { words, relations }
    }

    /// Turns the combined sub-entries of `row` into transactions. `src`
    /// locates the row; each transaction gets its sub-entry index.
    pub fn extract_row(
        &self,
        row: &Row,
        src: &Source,
        entries: &[Vec<SemanticToken>],
    ) -> RowResult {
        let mut state = RowState {
            is_ender: row.context.is_ender,
            ..Default::default()
        };
        let mut txns = Vec::with_capacity(entries.len());
        let mut errors = Vec::new();
        for (index, tokens) in entries.iter().enumerate() {
            let mut draft = TxnDraft::new(src.with_entry(index), tokens);
            if let Err(err) = self.read_entry(&mut draft, tokens, &row.context, &mut state) {
                log::error!("{}", err);
                let snippet = draft.snippet.clone();
                draft.txn.push_error(err.msg.clone(), snippet);
                errors.push(err);
            }
            errors.append(&mut draft.errors);
            txns.push(draft.txn);
        }
        self.finish_row(row, &state, &mut txns);
        RowResult {
            txns,
            errors,
            is_ender: state.is_ender,
        }
    }

    fn read_entry(
        &self,
        draft: &mut TxnDraft,
        tokens: &[SemanticToken],
        ctx: &RowContext,
        state: &mut RowState,
    ) -> Result<(), Error> {
        for (index, token) in tokens.iter().enumerate() {
            if token.label == Label::BadEntry {
                draft.bad = true;
                draft.problem(
                    ErrorType::Syntax,
                    "Unreadable entry".to_string(),
                    &token.text,
                );
                break;
            }
            self.read_token(draft, token, &tokens[index + 1..], state)?;
        }
        draft.flush_fancy();
        draft.close_tobacco();
        draft.close_phrase();
        if draft.bad {
            return Ok(());
        }
        self.resolve(draft, ctx)
    }

    /// Whether a noun, or a known item word, comes later in the sub-entry.
    fn noun_follows(&self, rest: &[SemanticToken]) -> bool {
        rest.iter().any(|t| {
            t.label.is_noun() || t.label == Label::Org || self.words.is_item(&t.text)
        })
    }

    fn read_token(
        &self,
        draft: &mut TxnDraft,
        token: &SemanticToken,
        rest: &[SemanticToken],
        state: &mut RowState,
    ) -> Result<(), Error> {
        let last_amount = draft.last_amount.take();
        if !matches!(
            token.label,
            Label::FancyPounds | Label::FancyShillings | Label::FancyPence | Label::FancyFraction
        ) {
            draft.flush_fancy();
        }
        let text = token.text.trim();
        match token.label {
            Label::TobaccoNote => {
                draft.close_tobacco();
                draft.tobacco = Some(TobaccoEntry {
                    number: text.to_string(),
                    ..Default::default()
                });
                draft.mark_tobacco();
            }
            Label::GrossWeight | Label::TareWeight | Label::NetWeight => {
                self.read_weight(draft, token)?;
            }
            Label::FinalWeight => {
                draft.close_tobacco();
                draft.mark_tobacco();
                match parse_decimal(text, &draft.txn.src) {
                    Ok(weight) => {
                        let net: Decimal = draft
                            .txn
                            .tobacco_entries
                            .iter()
                            .filter_map(|entry| entry.weight)
                            .sum();
                        if !draft.txn.tobacco_entries.is_empty() && net != weight {
                            draft.problem(
                                ErrorType::Tobacco,
                                format!(
                                    "Tobacco net weights add up to {}, final weight is {}",
                                    net, weight
                                ),
                                text,
                            );
                        }
                    }
                    Err(err) => draft.problem(ErrorType::Syntax, err.msg, text),
                }
                draft.txn.amount = Some(text.to_string());
            }
            Label::UnitPrice => {
                draft.bulk_next = true;
                draft.set_price(text, false);
            }
            Label::NoFinalTobacco => draft.close_tobacco(),
            Label::TmNumber => {
                draft.txn.tobacco_marks.push(TobaccoMark {
                    number: text.to_string(),
                    text: String::new(),
                });
                draft.mark_tobacco();
            }
            Label::TmText => {
                let src = draft.txn.src.clone();
                let mark = draft.txn.tobacco_marks.last_mut().ok_or_else(|| {
                    contract(&src, "Tobacco mark text without a mark number".to_string())
                })?;
                mark.text = text.replace('_', " ");
            }
            Label::Trans => {
                let direction = if text == "By" {
                    Direction::Credit
                } else {
                    Direction::Debit
                };
                draft.txn.direction = Some(*state.direction.get_or_insert(direction));
            }
            Label::FancyPounds => draft.fancy[0] = Some(text.to_string()),
            Label::FancyShillings => draft.fancy[1] = Some(text.to_string()),
            Label::FancyPence => draft.fancy[2] = Some(text.to_string()),
            Label::FancyFraction => draft.fancy[3] = Some(text.to_string()),
            Label::Cash => draft.txn.kind = Some(TxnKind::Cash),
            Label::Liber => {
                draft.txn.kind = Some(TxnKind::Liber);
                draft.txn.liber = text
                    .split_whitespace()
                    .nth(1)
                    .map(|letter| letter.trim_end_matches('.').to_string());
            }
            Label::Ender => {
                draft.txn.kind = Some(TxnKind::Ender);
                state.is_ender = true;
            }
            Label::Amt | Label::Cardinal | Label::Quantity | Label::CombQuantity => {
                let slot = match last_amount {
                    Some(slot) => {
                        let target = match slot {
                            AmountSlot::Amount => draft.txn.amount.as_mut(),
                            AmountSlot::Possible => draft.possible_amounts.last_mut(),
                        };
                        if let Some(target) = target {
                            target.push(' ');
                            target.push_str(text);
                        }
                        slot
                    }
                    None if draft.txn.is_tobacco && draft.txn.item.is_some() => {
                        draft.possible_amounts.push(text.to_string());
                        AmountSlot::Possible
                    }
                    None if draft.txn.amount.is_none() && self.noun_follows(rest) => {
                        draft.txn.amount = Some(text.to_string());
                        AmountSlot::Amount
                    }
                    None => {
                        draft.possible_amounts.push(text.to_string());
                        AmountSlot::Possible
                    }
                };
                draft.last_amount = Some(slot);
            }
            Label::Price | Label::CombPrice => {
                draft.set_price(text, token.label == Label::CombPrice);
            }
            Label::IsBulk => draft.bulk_next = true,
            Label::Cc | Label::CcDenied | Label::CcTob => {
                draft.close_phrase();
                if draft.txn.is_tobacco && draft.txn.item.is_some() {
                    draft.and_also = true;
                }
            }
            Label::Noun | Label::CombNoun | Label::Org | Label::Person => {
                self.read_noun(draft, token.label, text);
            }
            Label::Date => draft.txn.date = Some(text.to_string()),
            Label::None => match token.pos.as_str() {
                "IN" | "TO" | "VBG" => draft.open_phrase(text),
                _ if draft.depth > 0 => {
                    if let Some(phrase) = draft.phrase.as_mut() {
                        phrase.phrase.push(text.to_string());
                    }
                }
                _ => {}
            },
            Label::BadEntry => {
                return Err(contract(
                    &draft.txn.src,
                    format!("{} token {:?} inside an entry", token.label, token.text),
                ))
            }
        }
        Ok(())
    }

    fn read_weight(&self, draft: &mut TxnDraft, token: &SemanticToken) -> Result<(), Error> {
        let text = token.text.trim();
        let src = draft.txn.src.clone();
        let weight = match parse_decimal(text, &src) {
            Ok(weight) => weight,
            Err(err) => {
                draft.problem(ErrorType::Syntax, err.msg, text);
                return Ok(());
            }
        };
        let entry = draft.tobacco.as_mut().ok_or_else(|| {
            contract(&src, format!("{} {:?} outside a tobacco note", token.label, text))
        })?;
        let mut mismatch = None;
        match token.label {
            Label::GrossWeight => entry.gross_weight = Some(weight),
            Label::TareWeight => entry.tare_weight = Some(weight),
            _ => {
                entry.weight = Some(weight);
                if let (Some(gross), Some(tare)) = (entry.gross_weight, entry.tare_weight) {
                    if gross - tare != weight {
                        mismatch = Some(format!(
                            "Tobacco weight mismatch in note {}: {} - {} is not {}",
                            entry.number, gross, tare, weight
                        ));
                    }
                }
            }
        }
        if let Some(msg) = mismatch {
            draft.problem(ErrorType::Tobacco, msg, text);
        }
        if token.label == Label::NetWeight {
            draft.close_tobacco();
        }
        Ok(())
    }

    fn read_noun(&self, draft: &mut TxnDraft, label: Label, text: &str) {
        let text = text.to_string();
        if draft.txn.price.is_some() {
            draft.noun_after_price = true;
        }
        draft.last_noun = Some(text.clone());
        if draft.depth > 0 {
            let opener = draft
                .phrase
                .as_ref()
                .and_then(|phrase| phrase.phrase.first())
                .map(|word| word.to_lowercase());
            if let Some(phrase) = draft.phrase.as_mut() {
                phrase.phrase.push(text.clone());
            }
            let item_is_known = draft
                .txn
                .item
                .as_deref()
                .map_or(false, |item| self.words.is_item(item));
            match label {
                Label::Person => draft.txn.people.push(text),
                _ if self.words.is_relationship(&text) => draft.relationships.push(text),
                _ if matches!(opener.as_deref(), Some("for") | Some("of"))
                    && self.words.is_item(&text)
                    && !item_is_known =>
                {
                    if let Some(previous) = draft.txn.item.replace(text) {
                        draft.txn.mentions.push(previous);
                    }
                }
                _ => draft.candidates.push(text),
            }
            return;
        }
        match label {
            Label::Person => draft.txn.people.push(text),
            Label::Org if !self.words.is_item(&text) => draft.txn.mentions.push(text),
            _ if self.words.is_relationship(&text) => draft.relationships.push(text),
            _ if draft.txn.item.is_none() => {
                if text.to_lowercase().contains("tobacco") {
                    draft.txn.is_tobacco = true;
                }
                draft.txn.item = Some(text);
            }
            _ => {
                draft.txn.mentions.push(text.clone());
                draft.candidates.push(text);
            }
        }
    }

    /// Settles item, amount and money once all tokens are read.
    fn resolve(&self, draft: &mut TxnDraft, ctx: &RowContext) -> Result<(), Error> {
        let kind = draft.txn.kind;
        if draft.txn.item.is_none() {
            let known = draft
                .candidates
                .iter()
                .position(|noun| self.words.is_item(noun));
            draft.txn.item = match known {
                Some(index) => Some(draft.candidates.remove(index)),
                None => ctx.commodity.clone(),
            };
        }
        if draft.txn.item.is_none() {
            draft.txn.item = Some("Currency".to_string());
            if kind.is_none() {
                let snippet = draft.snippet.clone();
                draft.problem(ErrorType::Incomplete, "No item found".to_string(), &snippet);
            }
        }

        if draft.txn.amount.is_none() && draft.possible_amounts.len() == 1 {
            draft.txn.amount = draft.possible_amounts.pop();
        }
        draft.txn.amount_is_combo = draft
            .txn
            .amount
            .as_deref()
            .map_or(false, |amount| amount.contains(' '));

        match draft.txn.price.clone() {
            Some(price) => match Money::parse(&price) {
                Ok(money) => {
                    let money = if draft.txn.price_is_bulk {
                        self.bulk_total(draft, money, &price)
                    } else {
                        money
                    };
                    match ctx.currency_type() {
                        Some(CurrencyType::Sterling) => draft.txn.sterling = Some(money),
                        _ => draft.txn.currency = Some(money),
                    }
                    draft.txn.currency_type = ctx.currency_type();
                }
                Err(err) if err.is_contract_violation() => {
                    return Err(contract(&draft.txn.src, err.to_string()));
                }
                Err(err) => draft.problem(
                    ErrorType::Syntax,
                    format!("Unreadable price: {}", err),
                    &price,
                ),
            },
            None if kind != Some(TxnKind::Ender) && !ctx.currency_totaling_contextless => {
                let snippet = draft.snippet.clone();
                draft.problem(ErrorType::Incomplete, "No price found".to_string(), &snippet);
            }
            None => {}
        }

        let account = ctx.account_name.as_deref();
        for word in std::mem::take(&mut draft.relationships) {
            let names = account.map_or_else(Vec::new, |holder| self.relations.resolve(holder, &word));
            if names.is_empty() {
                draft.txn.mentions.push(word);
            } else {
                draft.txn.people.extend(names);
            }
        }
        dedupe(&mut draft.txn.people);
        dedupe(&mut draft.txn.mentions);
        Ok(())
    }

    fn bulk_total(&self, draft: &mut TxnDraft, unit: Money, price: &str) -> Money {
        let quantity = draft.txn.amount.as_deref().and_then(parse_quantity);
        match quantity.and_then(|q| unit.scale(q)) {
            Some(total) => total,
            None => {
                draft.problem(
                    ErrorType::Incomplete,
                    format!("Unit price {} without a usable amount", price),
                    price,
                );
                unit
            }
        }
    }

    /// The name in a trailing `per NAME`/`for NAME` clause.
    fn attribution(&self, text: &str) -> Option<String> {
        let caps = ATTRIBUTION_RE.captures(text.trim())?;
        let name = caps[1].trim();
        (!self.words.is_item(name)).then(|| name.to_string())
    }

    fn finish_row(&self, row: &Row, state: &RowState, txns: &mut [Transaction]) {
        let ctx = &row.context;
        let attributed = self.attribution(&row.text);
        let singleton = txns.len() == 1;
        for txn in txns.iter_mut() {
            if txn.direction.is_none() {
                txn.direction = state.direction;
            }
            fill(&mut txn.account_name, &ctx.account_name);
            fill(&mut txn.store_owner, &ctx.store_owner);
            fill(&mut txn.reel, &ctx.reel);
            fill(&mut txn.folio_page, &ctx.folio_page);
            fill(&mut txn.entry_id, &ctx.entry_id);
            fill(&mut txn.date, &ctx.date);
            txn.currency_totaling_contextless |= ctx.currency_totaling_contextless;
            txn.commodity_totaling_contextless |= ctx.commodity_totaling_contextless;
            if let Some(name) = &attributed {
                if !txn.people.iter().any(|p| p.eq_ignore_ascii_case(name)) {
                    txn.people.push(name.clone());
                }
            }
            if singleton {
                if ctx.currency_total.is_some() || ctx.sterling_total.is_some() {
                    txn.currency = ctx.currency_total;
                    txn.sterling = ctx.sterling_total;
                    txn.currency_type = ctx.currency_type();
                }
                fill(&mut txn.commodity, &ctx.commodity);
                if txn.quantity.is_none() {
                    txn.quantity = ctx.quantity;
                }
            }
        }
    }
}

fn fill<T: Clone>(field: &mut Option<T>, value: &Option<T>) {
    if field.is_none() {
        *field = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::{NoRelationships, RelationshipTable};
    use crate::MoneyParts;
    use std::sync::Arc;

    fn tok(text: &str, label: Label) -> SemanticToken {
        SemanticToken::new(text, label, "")
    }

    fn src() -> Source {
        Source::row(&Arc::new("test".to_string()), 0)
    }

    fn extract(ctx: RowContext, entries: Vec<Vec<SemanticToken>>) -> RowResult {
        let words = WordIndex::default();
        let extractor = Extractor::new(&words, &NoRelationships);
        extractor.extract_row(&Row::new("", ctx), &src(), &entries)
    }

    #[test]
    fn reads_a_simple_sale() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("6", Label::Amt),
                tok("yd", Label::Amt),
                tok("Lincey", Label::Noun),
                tok("18/:", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.item().as_deref(), Some("Lincey"));
        assert_eq!(txn.amount().as_deref(), Some("6 yd"));
        assert!(txn.amount_is_combo());
        assert_eq!(
            txn.currency().map(|m| m.to_parts()),
            Some(MoneyParts::from((0, 18, 0, 0)))
        );
        assert_eq!(txn.direction(), Some(Direction::Debit));
        assert!(txn.errors().is_empty(), "{:?}", txn.errors());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn bulk_price_is_scaled() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("4 yd", Label::Amt),
                tok("Linen", Label::Noun),
                tok("at", Label::IsBulk),
                tok("2/6", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert!(txn.price_is_bulk());
        assert_eq!(txn.currency(), Some(Money::from_parts(0, 10, 0, 0)));
    }

    #[test]
    fn missing_item_and_price() {
        let result = extract(RowContext::default(), vec![vec![tok("To", Label::Trans)]]);
        let txn = &result.txns[0];
        assert_eq!(txn.item().as_deref(), Some("Currency"));
        assert_eq!(txn.errors(), &vec!["No item found".to_string(), "No price found".to_string()]);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].r#type, ErrorType::Incomplete);
    }

    #[test]
    fn item_falls_back_to_row_commodity() {
        let ctx = RowContext {
            commodity: Some("Wheat".to_string()),
            ..Default::default()
        };
        let result = extract(
            ctx,
            vec![vec![tok("By", Label::Trans), tok("12/:", Label::Price)]],
        );
        assert_eq!(result.txns[0].item().as_deref(), Some("Wheat"));
        assert_eq!(result.txns[0].direction(), Some(Direction::Credit));
    }

    #[test]
    fn stray_ratio_is_demoted_to_an_amount() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("3/4", Label::Price),
                tok("yd", Label::None),
                tok("Linen", Label::Noun),
                tok("2/6", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.price().as_deref(), Some("2/6"));
        assert_eq!(txn.amount().as_deref(), Some("3/4"));
        assert!(txn.errors().is_empty());
    }

    #[test]
    fn second_price_is_an_error() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("Sugar", Label::Noun),
                tok("2/6", Label::Price),
                tok("3/:", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.price().as_deref(), Some("2/6"));
        assert_eq!(txn.errors().len(), 1);
        assert_eq!(txn.error_context(), &vec!["3/:".to_string()]);
    }

    #[test]
    fn tobacco_block() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("By", Label::Trans),
                tok("12", Label::TobaccoNote),
                tok("1050", Label::GrossWeight),
                tok("98", Label::TareWeight),
                tok("13", Label::TobaccoNote),
                tok("1100", Label::GrossWeight),
                tok("100", Label::TareWeight),
                tok("900", Label::NetWeight),
                tok("1952", Label::FinalWeight),
                tok("12/6", Label::UnitPrice),
            ]],
        );
        let txn = &result.txns[0];
        assert!(txn.is_tobacco());
        assert_eq!(txn.item().as_deref(), Some("Tobacco"));
        assert_eq!(txn.tobacco_entries().len(), 2);
        assert_eq!(txn.tobacco_entries()[0].weight, Some(Decimal::from(952)));
        assert_eq!(txn.amount().as_deref(), Some("1952"));
        assert!(txn.price_is_bulk());
        let kinds: Vec<ErrorType> = result.errors.iter().map(|e| e.r#type).collect();
        assert_eq!(kinds, vec![ErrorType::Tobacco, ErrorType::Tobacco]);
    }

    #[test]
    fn tobacco_and_also_sale() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("By", Label::Trans),
                tok("Tobacco", Label::Noun),
                tok("12/:", Label::Price),
                tok("and", Label::CcTob),
                tok("2/6", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.item().as_deref(), Some("Tobacco and 2/6"));
        assert_eq!(txn.price().as_deref(), Some("12/:"));
    }

    #[test]
    fn fancy_price_is_assembled() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("Rum", Label::Noun),
                tok("3", Label::FancyPounds),
                tok("5", Label::FancyShillings),
                tok("6", Label::FancyPence),
                tok("½", Label::FancyFraction),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.price().as_deref(), Some("3/5/6 ½"));
        assert!(txn.price_is_combo());
        assert_eq!(txn.currency(), Some(Money::from_parts(3, 5, 6, 6)));
    }

    #[test]
    fn contract_violations_keep_a_record() {
        let result = extract(
            RowContext::default(),
            vec![
                vec![tok("To", Label::Trans), tok("1050", Label::GrossWeight)],
                vec![tok("To", Label::Trans), tok("Hat", Label::Noun), tok("6x", Label::Price)],
                vec![tok("To", Label::Trans), tok("Hat", Label::Noun), tok("6d", Label::Price)],
            ],
        );
        assert_eq!(result.txns.len(), 3);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.r#type == ErrorType::Contract));
        assert!(result.txns[0].has_errors());
        assert!(result.txns[1].has_errors());
        assert!(!result.txns[2].has_errors());
    }

    #[test]
    fn people_phrases_and_relationships() {
        let words = WordIndex::default();
        let mut table = RelationshipTable::default();
        table.insert("John Smith", "wife", "Mary Smith");
        let extractor = Extractor::new(&words, &table);
        let ctx = RowContext {
            account_name: Some("John Smith".to_string()),
            ..Default::default()
        };
        let row = Row::new("To 1 Hat for wife 5/: per Mr Tom Brown", ctx);
        let entries = vec![vec![
            tok("To", Label::Trans),
            tok("1", Label::Cardinal),
            tok("Hat", Label::Noun),
            SemanticToken::new("for", Label::None, "IN"),
            tok("wife", Label::Noun),
            tok("5/:", Label::Price),
            SemanticToken::new("per", Label::None, "IN"),
            tok("Mr Tom Brown", Label::Person),
        ]];
        let result = extractor.extract_row(&row, &src(), &entries);
        let txn = &result.txns[0];
        assert_eq!(txn.amount().as_deref(), Some("1"));
        assert_eq!(txn.people(), &vec!["Mr Tom Brown".to_string(), "Mary Smith".to_string()]);
        assert_eq!(txn.account_name().as_deref(), Some("John Smith"));
        assert_eq!(txn.phrases().len(), 2);
        assert_eq!(txn.phrases()[0].modifies.as_deref(), Some("Hat"));
        assert_eq!(txn.phrases()[0].phrase, vec!["for", "wife"]);
    }

    #[test]
    fn singleton_row_takes_declared_totals() {
        let ctx = RowContext {
            currency_total: Some(Money::from_parts(0, 12, 0, 0)),
            sterling_total: Some(Money::from_parts(0, 9, 0, 0)),
            commodity: Some("Sugar".to_string()),
            ..Default::default()
        };
        let result = extract(
            ctx,
            vec![vec![
                tok("To", Label::Trans),
                tok("Sugar", Label::Noun),
                tok("12/:", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.currency(), Some(Money::from_parts(0, 12, 0, 0)));
        assert_eq!(txn.sterling(), Some(Money::from_parts(0, 9, 0, 0)));
        assert_eq!(txn.currency_type(), Some(CurrencyType::Both));
        assert_eq!(txn.commodity().as_deref(), Some("Sugar"));
    }

    #[test]
    fn oversized_price_is_unreadable() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("Sugar", Label::Noun),
                tok("99999999999999999L", Label::Price),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.currency(), None);
        assert_eq!(
            txn.errors(),
            &vec!["Unreadable price: \"99999999999999999L\" is too large".to_string()]
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].r#type, ErrorType::Syntax);
    }

    #[test]
    fn organizations_are_mentions_unless_known_items() {
        let result = extract(
            RowContext::default(),
            vec![
                vec![
                    tok("To", Label::Trans),
                    tok("Bristol Company", Label::Org),
                    tok("Rum", Label::Noun),
                    tok("5/:", Label::Price),
                ],
                vec![tok("To", Label::Trans), tok("Tea", Label::Org), tok("1/:", Label::Price)],
            ],
        );
        assert_eq!(result.txns[0].item().as_deref(), Some("Rum"));
        assert_eq!(result.txns[0].mentions(), &vec!["Bristol Company".to_string()]);
        assert_eq!(result.txns[1].item().as_deref(), Some("Tea"));
        assert!(result.txns[1].mentions().is_empty());
    }

    #[test]
    fn known_item_in_a_for_or_of_phrase_becomes_the_item() {
        let result = extract(
            RowContext::default(),
            vec![
                vec![
                    tok("To", Label::Trans),
                    tok("Cask", Label::Noun),
                    SemanticToken::new("of", Label::None, "IN"),
                    tok("Rum", Label::Noun),
                    tok("5/:", Label::Price),
                ],
                vec![
                    tok("To", Label::Trans),
                    tok("Box", Label::Noun),
                    SemanticToken::new("with", Label::None, "IN"),
                    tok("Sugar", Label::Noun),
                    tok("2/:", Label::Price),
                ],
            ],
        );
        let cask = &result.txns[0];
        assert_eq!(cask.item().as_deref(), Some("Rum"));
        assert_eq!(cask.mentions(), &vec!["Cask".to_string()]);
        assert_eq!(cask.phrases()[0].phrase, vec!["of", "Rum"]);
        let boxed = &result.txns[1];
        assert_eq!(boxed.item().as_deref(), Some("Box"));
        assert!(boxed.mentions().is_empty());
    }

    #[test]
    fn amounts_after_a_tobacco_item_are_only_possible() {
        let entry = |item: &str| {
            vec![
                tok("By", Label::Trans),
                tok(item, Label::Noun),
                tok("3 hhds", Label::Amt),
                tok("Casks", Label::Noun),
                tok("1000", Label::Cardinal),
                tok("12/:", Label::Price),
            ]
        };
        let result = extract(RowContext::default(), vec![entry("Tobacco"), entry("Flour")]);
        let tobacco = &result.txns[0];
        assert!(tobacco.is_tobacco());
        assert_eq!(tobacco.amount(), &None);
        let flour = &result.txns[1];
        assert!(!flour.is_tobacco());
        assert_eq!(flour.amount().as_deref(), Some("3 hhds"));
    }

    #[test]
    fn people_and_mentions_are_deduplicated() {
        let result = extract(
            RowContext::default(),
            vec![vec![
                tok("To", Label::Trans),
                tok("Hat", Label::Noun),
                tok("Tom Brown", Label::Person),
                tok("Bristol Company", Label::Org),
                tok("5/:", Label::Price),
                tok("tom brown", Label::Person),
                tok("Bristol Company", Label::Org),
            ]],
        );
        let txn = &result.txns[0];
        assert_eq!(txn.people(), &vec!["Tom Brown".to_string()]);
        assert_eq!(txn.mentions(), &vec!["Bristol Company".to_string()]);
    }

    #[test]
    fn ender_and_liber() {
        let result = extract(
            RowContext::default(),
            vec![
                vec![tok("Total", Label::Ender), tok("12/3/4", Label::Price)],
                vec![tok("By", Label::Trans), tok("Liber A", Label::Liber), tok("1/:", Label::Price)],
            ],
        );
        assert!(result.is_ender);
        assert_eq!(result.txns[0].kind(), Some(TxnKind::Ender));
        assert_eq!(result.txns[1].kind(), Some(TxnKind::Liber));
        assert_eq!(result.txns[1].liber().as_deref(), Some("A"));
        assert!(result.txns.iter().all(|t| !t.has_errors()));
    }
}
