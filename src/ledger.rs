use crate::parse::SemanticToken;
use crate::Money;
use getset::{CopyGetters, Getters};
pub use rust_decimal::Decimal;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A string wrapped in [`Arc`](std::sync::Arc) naming the sheet (or file)
/// a row was read from.
pub type SrcSheet = Arc<String>;

/// Locates a row, and optionally one sub-entry of it, in a sheet. This is
/// used to track the origin of every [`Transaction`] as well as for
/// locating errors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Source {
    pub sheet: SrcSheet,
    /// Zero-based row index within the sheet.
    pub row: usize,
    /// Zero-based sub-entry index within the row's cell.
    pub entry: Option<usize>,
}

impl Source {
    pub fn row(sheet: &SrcSheet, row: usize) -> Self {
        Source {
            sheet: sheet.clone(),
            row,
            entry: None,
        }
    }

    pub fn with_entry(&self, entry: usize) -> Self {
        Source {
            entry: Some(entry),
            ..self.clone()
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(entry) => write!(f, "{}:{}.{}", self.sheet, self.row + 1, entry + 1),
            None => write!(f, "{}:{}", self.sheet, self.row + 1),
        }
    }
}

/// Kinds of errors that `scrivener` encountered while turning rows into
/// transactions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// IO error, e.g., a word list or sheet cannot be read.
    Io,
    /// A price, weight or number that cannot be read.
    Syntax,
    /// The token grammar handed the extractor something it never produces.
    Contract,
    /// An entry missing an item or a price.
    Incomplete,
    /// Tobacco weights that do not add up.
    Tobacco,
    /// Currency and sterling could not be told apart.
    Ambiguous,
    /// A block does not sum to its declared total.
    NotBalanced,
}

/// The level of an error. Nothing is dropped on account of an error; the
/// level only tells how much attention the affected transaction needs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// Contains the full information of an error.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub msg: String,
    pub src: Source,
    pub r#type: ErrorType,
    pub level: ErrorLevel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}\n  {}", self.level, self.msg, self.src)
    }
}

impl std::error::Error for Error {}

/// Which money column(s) a row, or a transaction, is quoted in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrencyType {
    /// Colony currency.
    Currency,
    Sterling,
    /// Both columns are filled in; which entry belongs to which is decided
    /// by reconciliation.
    Both,
}

/// `To` (the account holder is charged) or `By` (the holder is credited).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Debit,
    Credit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Debit => write!(f, "To"),
            Direction::Credit => write!(f, "By"),
        }
    }
}

/// Special kinds of transaction. Ordinary sales have no kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnKind {
    Cash,
    Liber,
    Ender,
}

/// Per-row information read from the columns around the transcribed cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowContext {
    pub account_name: Option<String>,
    pub store_owner: Option<String>,
    pub reel: Option<String>,
    pub folio_page: Option<String>,
    pub entry_id: Option<String>,
    pub date: Option<String>,
    /// Declared colony currency total.
    pub currency_total: Option<Money>,
    /// Declared sterling total.
    pub sterling_total: Option<Money>,
    pub commodity: Option<String>,
    pub quantity: Option<Decimal>,
    /// The row carries no money to total.
    pub currency_totaling_contextless: bool,
    /// The row carries no commodity quantity to total.
    pub commodity_totaling_contextless: bool,
    pub is_ender: bool,
}

impl RowContext {
    pub fn currency_type(&self) -> Option<CurrencyType> {
        match (self.currency_total, self.sterling_total) {
            (Some(_), Some(_)) => Some(CurrencyType::Both),
            (Some(_), None) => Some(CurrencyType::Currency),
            (None, Some(_)) => Some(CurrencyType::Sterling),
            (None, None) => None,
        }
    }
}

/// A ledger row: its context columns plus the transcribed cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    #[cfg_attr(feature = "serde", serde(default))]
    pub context: RowContext,
    pub text: String,
}

impl Row {
    pub fn new(text: impl Into<String>, context: RowContext) -> Self {
        Row {
            context,
            text: text.into(),
        }
    }
}

/// One hogshead in a tobacco block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TobaccoEntry {
    pub number: String,
    pub gross_weight: Option<Decimal>,
    pub tare_weight: Option<Decimal>,
    pub weight: Option<Decimal>,
}

/// A `[TM: …]` tobacco mark.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TobaccoMark {
    pub number: String,
    pub text: String,
}

/// A prepositional phrase and the noun it hangs off.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Phrase {
    pub modifies: Option<String>,
    pub phrase: Vec<String>,
}

/// A single purchase, payment or total read from one sub-entry of a row.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters, CopyGetters)]
pub struct Transaction {
    /// Returns the item bought or sold.
    #[getset(get = "pub")]
    pub(crate) item: Option<String>,

    /// Returns the amount as written, e.g. `6 yd`.
    #[getset(get = "pub")]
    pub(crate) amount: Option<String>,

    #[getset(get_copy = "pub")]
    pub(crate) amount_is_combo: bool,

    /// Returns the price as written.
    #[getset(get = "pub")]
    pub(crate) price: Option<String>,

    #[getset(get_copy = "pub")]
    pub(crate) price_is_combo: bool,

    /// Whether the price is per unit of the amount.
    #[getset(get_copy = "pub")]
    pub(crate) price_is_bulk: bool,

    /// Returns the colony currency value.
    #[getset(get_copy = "pub")]
    pub(crate) currency: Option<Money>,

    /// Returns the sterling value.
    #[getset(get_copy = "pub")]
    pub(crate) sterling: Option<Money>,

    #[getset(get_copy = "pub")]
    pub(crate) currency_type: Option<CurrencyType>,

    #[getset(get = "pub")]
    pub(crate) commodity: Option<String>,

    #[getset(get_copy = "pub")]
    pub(crate) quantity: Option<Decimal>,

    #[getset(get = "pub")]
    pub(crate) people: Vec<String>,

    /// Returns nouns that were neither the item nor a person.
    #[getset(get = "pub")]
    pub(crate) mentions: Vec<String>,

    #[getset(get = "pub")]
    pub(crate) date: Option<String>,

    #[getset(get = "pub")]
    pub(crate) tobacco_entries: Vec<TobaccoEntry>,

    #[getset(get = "pub")]
    pub(crate) tobacco_marks: Vec<TobaccoMark>,

    #[getset(get_copy = "pub")]
    pub(crate) is_tobacco: bool,

    #[getset(get = "pub")]
    pub(crate) phrases: Vec<Phrase>,

    #[getset(get_copy = "pub")]
    pub(crate) kind: Option<TxnKind>,

    #[getset(get_copy = "pub")]
    pub(crate) direction: Option<Direction>,

    /// Returns the letter of a `Liber` reference.
    #[getset(get = "pub")]
    pub(crate) liber: Option<String>,

    #[getset(get = "pub")]
    pub(crate) account_name: Option<String>,

    #[getset(get = "pub")]
    pub(crate) store_owner: Option<String>,

    #[getset(get = "pub")]
    pub(crate) reel: Option<String>,

    #[getset(get = "pub")]
    pub(crate) folio_page: Option<String>,

    #[getset(get = "pub")]
    pub(crate) entry_id: Option<String>,

    #[getset(get_copy = "pub")]
    pub(crate) currency_totaling_contextless: bool,

    #[getset(get_copy = "pub")]
    pub(crate) commodity_totaling_contextless: bool,

    /// Returns the data-quality problems found in this transaction.
    #[getset(get = "pub")]
    pub(crate) errors: Vec<String>,

    /// Returns raw token snippets for each error, for human review.
    #[getset(get = "pub")]
    pub(crate) error_context: Vec<String>,

    /// Returns the semantic tokens the transaction was read from.
    #[getset(get = "pub")]
    pub(crate) context: Vec<SemanticToken>,

    /// Returns the source of this transaction.
    #[getset(get = "pub")]
    pub(crate) src: Source,
}

impl Transaction {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn push_error(&mut self, msg: impl Into<String>, context: impl Into<String>) {
        self.errors.push(msg.into());
        self.error_context.push(context.into());
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.src)?;
        if let Some(direction) = self.direction {
            write!(f, " {}", direction)?;
        }
        if let Some(kind) = self.kind {
            write!(f, " [{:?}]", kind)?;
        }
        if let Some(amount) = &self.amount {
            write!(f, " {}", amount)?;
        }
        if let Some(item) = &self.item {
            write!(f, " {}", item)?;
        }
        if let Some(price) = &self.price {
            write!(f, " @ {}", price)?;
        }
        if let Some(currency) = self.currency {
            write!(f, " = {} currency", currency)?;
        }
        if let Some(sterling) = self.sterling {
            write!(f, " = {} sterling", sterling)?;
        }
        for (error, context) in self.errors.iter().zip(self.error_context.iter()) {
            write!(f, "\n    ! {} ({})", error, context)?;
        }
        Ok(())
    }
}

/// An ordered run of transactions closed by an ender row or by a change of
/// account holder.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct TransactionBlock {
    /// Returns the transactions in ledger order.
    #[getset(get = "pub")]
    pub(crate) txns: Vec<Transaction>,

    /// The context of every row that contributed a transaction, keyed by
    /// row index.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) rows: Vec<(usize, RowContext)>,
}

impl TransactionBlock {
    pub fn len(&self) -> usize {
        self.txns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    /// Whether the block was closed by a `Total`/`Subtotal` row.
    pub fn is_ender(&self) -> bool {
        self.rows.last().map_or(false, |(_, ctx)| ctx.is_ender)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.txns.iter()
    }

    pub fn into_txns(self) -> Vec<Transaction> {
        self.txns
    }

    pub(crate) fn row_context(&self, row: usize) -> Option<&RowContext> {
        self.rows
            .iter()
            .find(|(index, _)| *index == row)
            .map(|(_, ctx)| ctx)
    }
}
