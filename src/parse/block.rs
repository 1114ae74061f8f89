use super::RowResult;
use crate::checker::{reconcile_block, verify_totals};
use crate::{Error, RowContext, TransactionBlock};

/// Accumulates the transactions of consecutive rows and cuts them into
/// [`TransactionBlock`]s, either at an ender row or where the account holder
/// changes.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    current: TransactionBlock,
    holder: Option<String>,
    /// `(txn index, row index)` in `current` where a new holder begins.
    break_at: Option<(usize, usize)>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions waiting for the next block boundary.
    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Appends one extracted row. Returns the blocks the row closed, already
    /// reconciled and, for ender blocks, verified. Problems found on the way
    /// are appended to `errors`.
    pub fn push_row(
        &mut self,
        row: usize,
        mut ctx: RowContext,
        result: RowResult,
        errors: &mut Vec<Error>,
    ) -> Vec<TransactionBlock> {
        let RowResult {
            txns,
            errors: mut row_errors,
            is_ender,
        } = result;
        errors.append(&mut row_errors);
        ctx.is_ender |= is_ender;

        for txn in txns {
            if let Some(name) = txn.account_name.as_deref() {
                match &self.holder {
                    Some(holder) if holder != name => {
                        if self.break_at.is_none() {
                            log::debug!("row {}: holder changes from {} to {}", row + 1, holder, name);
                            self.break_at = Some((self.current.txns.len(), self.current.rows.len()));
                        }
                        self.holder = Some(name.to_string());
                    }
                    Some(_) => {}
                    None => self.holder = Some(name.to_string()),
                }
            }
            self.current.txns.push(txn);
        }
        self.current.rows.push((row, ctx));

        let mut closed = Vec::new();
        let break_at = self.break_at.take();
        if self.current.is_ender() {
            // An ender totals everything pending, whichever holder it names.
            let block = std::mem::take(&mut self.current);
            self.holder = None;
            closed.push(seal(block, errors));
            return closed;
        }
        if let Some((txn_index, row_index)) = break_at {
            let tail = TransactionBlock {
                txns: self.current.txns.split_off(txn_index),
                rows: self.current.rows.split_off(row_index),
            };
            let head = std::mem::replace(&mut self.current, tail);
            if !head.is_empty() {
                closed.push(seal(head, errors));
            }
        }
        closed
    }

    /// Emits whatever is still pending at the end of a sheet.
    pub fn finish(mut self, errors: &mut Vec<Error>) -> Option<TransactionBlock> {
        if self.current.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.current);
        Some(seal(block, errors))
    }
}

fn seal(mut block: TransactionBlock, errors: &mut Vec<Error>) -> TransactionBlock {
    errors.extend(reconcile_block(&mut block));
    errors.extend(verify_totals(&mut block));
    log::debug!(
        "emit block of {} transactions from {} rows{}",
        block.len(),
        block.rows.len(),
        if block.is_ender() { " (ender)" } else { "" }
    );
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Money, Source, Transaction, TxnKind};
    use std::sync::Arc;

    fn ctx(holder: &str) -> RowContext {
        RowContext {
            account_name: Some(holder.to_string()),
            ..Default::default()
        }
    }

    fn row(index: usize, holder: &str, prices: &[&str]) -> (RowContext, RowResult) {
        let sheet = Arc::new("sheet".to_string());
        let txns = prices
            .iter()
            .enumerate()
            .map(|(entry, price)| Transaction {
                account_name: Some(holder.to_string()),
                currency: Some(Money::parse(price).unwrap()),
                src: Source::row(&sheet, index).with_entry(entry),
                ..Default::default()
            })
            .collect();
        (
            ctx(holder),
            RowResult {
                txns,
                ..Default::default()
            },
        )
    }

    #[test]
    fn holder_change_splits_the_block() {
        let mut builder = BlockBuilder::new();
        let mut errors = Vec::new();
        let mut blocks = Vec::new();
        let rows = [
            ("Smith", vec!["1/:"]),
            ("Smith", vec!["2/:", "3/:"]),
            ("Jones", vec!["4/:"]),
            ("Jones", vec!["5/:"]),
        ];
        for (index, (holder, prices)) in rows.iter().enumerate() {
            let (ctx, result) = row(index, holder, prices);
            blocks.extend(builder.push_row(index, ctx, result, &mut errors));
        }
        assert_eq!(blocks.len(), 1);
        assert_eq!(builder.pending(), 2);
        blocks.extend(builder.finish(&mut errors));
        let sizes: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 2]);
        assert!(blocks[0]
            .iter()
            .all(|t| t.account_name().as_deref() == Some("Smith")));
        assert!(errors.is_empty());
    }

    #[test]
    fn ender_row_closes_and_verifies() {
        let mut builder = BlockBuilder::new();
        let mut errors = Vec::new();
        let (ctx0, result0) = row(0, "Smith", &["1/:"]);
        assert!(builder.push_row(0, ctx0, result0, &mut errors).is_empty());

        let (mut ender_ctx, mut ender) = row(1, "Smith", &["2/:"]);
        ender_ctx.currency_total = Some(Money::parse("2/:").unwrap());
        ender.txns[0].kind = Some(TxnKind::Ender);
        ender.is_ender = true;
        let blocks = builder.push_row(1, ender_ctx, ender, &mut errors);

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_ender());
        let ender = &blocks[0].txns()[1];
        assert_eq!(ender.errors().len(), 1);
        assert!(ender.errors()[0].contains("computed 0/1/0, expected 0/2/0"));
        assert_eq!(errors.len(), 1);
        assert_eq!(builder.pending(), 0);
        assert!(builder.finish(&mut errors).is_none());
    }

    #[test]
    fn ender_with_new_holder_totals_the_whole_block() {
        let mut builder = BlockBuilder::new();
        let mut errors = Vec::new();
        for index in 0..2 {
            let (ctx, result) = row(index, "Smith", &["5/:"]);
            assert!(builder.push_row(index, ctx, result, &mut errors).is_empty());
        }

        let (mut ender_ctx, mut ender) = row(2, "Jones", &["10/:"]);
        ender_ctx.currency_total = Some(Money::parse("10/:").unwrap());
        ender.txns[0].kind = Some(TxnKind::Ender);
        ender.is_ender = true;
        let blocks = builder.push_row(2, ender_ctx, ender, &mut errors);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 3);
        assert!(blocks[0].is_ender());
        assert!(blocks[0].iter().all(|t| !t.has_errors()));
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(builder.pending(), 0);

        // Holder tracking starts over after the ender.
        let (ctx, result) = row(3, "Brown", &["1/:"]);
        assert!(builder.push_row(3, ctx, result, &mut errors).is_empty());
        assert_eq!(builder.pending(), 1);
    }

    #[test]
    fn holder_change_before_an_ender_still_splits() {
        let mut builder = BlockBuilder::new();
        let mut errors = Vec::new();
        let (ctx0, result0) = row(0, "Smith", &["7/:"]);
        builder.push_row(0, ctx0, result0, &mut errors);
        let (ctx1, result1) = row(1, "Jones", &["1/:"]);
        let first = builder.push_row(1, ctx1, result1, &mut errors);
        assert_eq!(first.len(), 1);

        let (mut ender_ctx, mut ender) = row(2, "Jones", &["1/:"]);
        ender_ctx.currency_total = Some(Money::parse("1/:").unwrap());
        ender.txns[0].kind = Some(TxnKind::Ender);
        ender.is_ender = true;
        let blocks = builder.push_row(2, ender_ctx, ender, &mut errors);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 2);
        assert!(errors.is_empty());
    }
}
