//! Currency reconciliation and total verification of transaction blocks.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    CurrencyType, Decimal, Error, ErrorLevel, ErrorType, Money, Transaction, TransactionBlock,
    TxnKind,
};

/// Rows with more priced entries than this are not enumerated.
pub const MAX_RECONCILE_ENTRIES: usize = 20;

/// Which entries of a row were quoted in colony currency and which in
/// sterling. Holds the caller's indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Assignment {
    pub currency: Vec<usize>,
    pub sterling: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Exactly one assignment matches both totals.
    Found(Assignment),
    /// This many distinct assignments match.
    Ambiguous(usize),
    NotFound,
    /// Too many entries to enumerate.
    TooLarge(usize),
}

/// Splits `prices` into a currency part and a sterling part summing to the
/// declared totals, trying every subset of size `1..=n/2` against both
/// totals.
pub fn reconcile(
    prices: &[(usize, Money)],
    currency_total: Money,
    sterling_total: Money,
) -> Reconciliation {
    let n = prices.len();
    if n > MAX_RECONCILE_ENTRIES {
        return Reconciliation::TooLarge(n);
    }
    let total: Money = prices.iter().map(|(_, price)| *price).sum();
    let mut found = BTreeSet::new();
    for mask in 1u32..(1u32 << n) {
        if mask.count_ones() as usize > n / 2 {
            continue;
        }
        let in_subset = |bit: usize| mask & (1 << bit) != 0;
        let subset_sum: Money = (0..n)
            .filter(|&bit| in_subset(bit))
            .map(|bit| prices[bit].1)
            .sum();
        let rest_sum = total - subset_sum;
        let as_currency = subset_sum == currency_total && rest_sum == sterling_total;
        let as_sterling = subset_sum == sterling_total && rest_sum == currency_total;
        if !as_currency && !as_sterling {
            continue;
        }
        let (subset, rest): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|&bit| in_subset(bit));
        let subset: Vec<usize> = subset.into_iter().map(|bit| prices[bit].0).collect();
        let rest: Vec<usize> = rest.into_iter().map(|bit| prices[bit].0).collect();
        if as_currency {
            found.insert(Assignment {
                currency: subset.clone(),
                sterling: rest.clone(),
            });
        }
        if as_sterling {
            found.insert(Assignment {
                currency: rest,
                sterling: subset,
            });
        }
    }
    match found.len() {
        0 => Reconciliation::NotFound,
        1 => match found.into_iter().next() {
            Some(assignment) => Reconciliation::Found(assignment),
            None => Reconciliation::NotFound,
        },
        count => Reconciliation::Ambiguous(count),
    }
}

fn block_error(txn: &mut Transaction, r#type: ErrorType, msg: String, errors: &mut Vec<Error>) {
    log::warn!("{}: {}", txn.src, msg);
    errors.push(Error {
        msg: msg.clone(),
        src: txn.src.clone(),
        r#type,
        level: ErrorLevel::Warning,
    });
    let context = txn.price.clone().unwrap_or_default();
    txn.push_error(msg, context);
}

/// Decides currency versus sterling for the entries of every row in
/// `block` that declares both totals.
pub fn reconcile_block(block: &mut TransactionBlock) -> Vec<Error> {
    let mut errors = Vec::new();
    let mut by_row: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, txn) in block.txns.iter().enumerate() {
        by_row.entry(txn.src.row).or_default().push(index);
    }
    for (row, members) in by_row {
        let Some(ctx) = block.row_context(row) else {
            continue;
        };
        let (Some(currency_total), Some(sterling_total)) = (ctx.currency_total, ctx.sterling_total)
        else {
            continue;
        };
        let prices: Vec<(usize, Money)> = members
            .iter()
            .filter_map(|&index| {
                let txn = &block.txns[index];
                let counted = txn.kind != Some(TxnKind::Ender) && !txn.currency_totaling_contextless;
                txn.currency.filter(|_| counted).map(|money| (index, money))
            })
            .collect();
        if prices.len() < 2 {
            continue;
        }
        let failure = match reconcile(&prices, currency_total, sterling_total) {
            Reconciliation::Found(assignment) => {
                log::debug!("row {}: reconciled {:?}", row + 1, assignment);
                for index in assignment.currency {
                    block.txns[index].currency_type = Some(CurrencyType::Currency);
                }
                for index in assignment.sterling {
                    let txn = &mut block.txns[index];
                    txn.sterling = txn.currency.take();
                    txn.currency_type = Some(CurrencyType::Sterling);
                }
                continue;
            }
            Reconciliation::Ambiguous(count) => format!(
                "Cannot tell currency from sterling: {} assignments match {} currency and {} sterling",
                count, currency_total, sterling_total
            ),
            Reconciliation::NotFound => format!(
                "Cannot tell currency from sterling: no assignment matches {} currency and {} sterling",
                currency_total, sterling_total
            ),
            Reconciliation::TooLarge(count) => format!(
                "Cannot tell currency from sterling: too many entries ({}) to reconcile",
                count
            ),
        };
        for index in members {
            let txn = &mut block.txns[index];
            if !txn.is_tobacco {
                block_error(txn, ErrorType::Ambiguous, failure.clone(), &mut errors);
            }
        }
    }
    errors
}

fn check_sum(what: &str, computed: Money, expected: Option<Money>) -> Result<(), String> {
    match expected {
        Some(expected) if expected != computed => Err(format!(
            "{} total mismatch: computed {}, expected {}",
            what, computed, expected
        )),
        _ => Ok(()),
    }
}

fn check_quantity(computed: Decimal, expected: Option<Decimal>) -> Result<(), String> {
    match expected {
        Some(expected) if expected != computed => Err(format!(
            "Commodity quantity mismatch: computed {}, expected {}",
            computed, expected
        )),
        _ => Ok(()),
    }
}

/// Compares the sums of a block closed by an ender row with the totals the
/// ender row declares. Mismatches are attached to the ender transaction.
pub fn verify_totals(block: &mut TransactionBlock) -> Vec<Error> {
    let mut errors = Vec::new();
    if !block.is_ender() {
        return errors;
    }
    let Some((ender_row, ender_ctx)) = block.rows.last().cloned() else {
        return errors;
    };

    let mut currency = Money::ZERO;
    let mut sterling = Money::ZERO;
    for txn in block.txns.iter() {
        if txn.src.row == ender_row
            || txn.currency_totaling_contextless
            || txn.kind == Some(TxnKind::Ender)
        {
            continue;
        }
        currency += txn.currency.unwrap_or(Money::ZERO);
        sterling += txn.sterling.unwrap_or(Money::ZERO);
    }
    let quantity: Decimal = block
        .rows
        .iter()
        .filter(|(row, ctx)| *row != ender_row && !ctx.commodity_totaling_contextless)
        .filter_map(|(_, ctx)| ctx.quantity)
        .sum();

    let ender_index = block
        .txns
        .iter()
        .rposition(|txn| txn.src.row == ender_row && txn.kind == Some(TxnKind::Ender))
        .or_else(|| block.txns.iter().rposition(|txn| txn.src.row == ender_row));

    let declared_currency = match ender_ctx.currency_type() {
        None => ender_index.and_then(|index| block.txns[index].currency),
        _ => ender_ctx.currency_total,
    };
    let results = [
        check_sum("Currency", currency, declared_currency),
        check_sum("Sterling", sterling, ender_ctx.sterling_total),
        check_quantity(quantity, ender_ctx.quantity),
    ];
    for msg in results.into_iter().filter_map(Result::err) {
        match ender_index {
            Some(index) => {
                block_error(&mut block.txns[index], ErrorType::NotBalanced, msg, &mut errors)
            }
            None => {
                log::warn!("row {}: {}", ender_row + 1, msg);
                errors.push(Error {
                    msg,
                    src: block
                        .txns
                        .last()
                        .map(|txn| txn.src.clone())
                        .unwrap_or_default(),
                    r#type: ErrorType::NotBalanced,
                    level: ErrorLevel::Warning,
                });
            }
        }
    }
    errors
}
