//! # scrivener
//!
//! scrivener reads transcribed entries of colonial merchant account books
//! and turns them into structured transactions: items, amounts, prices in
//! pounds, shillings and pence, the people involved, and tobacco weights.
//!
//! A [`parse::Pipeline`] normalizes the text of each row, tags it with a
//! [`parse::Tagger`], combines the tags into semantic tokens and extracts
//! [`Transaction`]s, which are grouped into [`TransactionBlock`]s. Blocks
//! closed by a `Total` row are reconciled and verified against the declared
//! totals by the [`checker`].
#![doc(html_root_url = "https://docs.rs/scrivener/0.1.0")]

pub mod checker;
pub mod config;
mod ledger;
mod money;
pub mod parse;
pub mod relations;
pub mod utils;
pub mod words;

pub use ledger::*;
pub use money::{Component, Money, MoneyError, MoneyParts};
