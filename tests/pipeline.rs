use scrivener::parse::{LexiconTagger, Pipeline};
use scrivener::relations::NoRelationships;
use scrivener::words::WordIndex;
use scrivener::{CurrencyType, Decimal, ErrorType, Money, Row, RowContext, TransactionBlock, TxnKind};

fn holder(name: &str) -> RowContext {
    RowContext {
        account_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn parse(rows: &[Row]) -> (Vec<TransactionBlock>, Vec<scrivener::Error>) {
    let words = WordIndex::default();
    let tagger = LexiconTagger::new(&words);
    let pipeline = Pipeline::new(&tagger, &words, &NoRelationships);
    pipeline.parse_sheet("Ledger A", rows)
}

fn money(text: &str) -> Money {
    Money::parse(text).unwrap()
}

#[test]
fn a_simple_sale() {
    let (blocks, errors) = parse(&[Row::new("To 6 yd Lincey 18/:", holder("John Smith"))]);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(blocks.len(), 1);
    let txn = &blocks[0].txns()[0];
    assert_eq!(txn.item().as_deref(), Some("Lincey"));
    assert_eq!(txn.amount().as_deref(), Some("6 yd"));
    assert_eq!(txn.currency(), Some(money("18/:")));
    assert_eq!(txn.account_name().as_deref(), Some("John Smith"));
    assert_eq!(txn.src().to_string(), "Ledger A:1.1");
}

#[test]
fn holder_change_splits_blocks() {
    let rows = vec![
        Row::new("To 1 Hat 5/:", holder("John Smith")),
        Row::new("To 6 yd Lincey 18/:", holder("John Smith")),
        Row::new("To 2 lb Sugar 2/6", holder("John Smith")),
        Row::new("To 1 Hat 5/:", holder("Tom Brown")),
        Row::new("To 1 Hat 5/:", holder("Tom Brown")),
    ];
    let (blocks, _) = parse(&rows);
    let sizes: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 2]);
    assert!(blocks[1]
        .iter()
        .all(|t| t.account_name().as_deref() == Some("Tom Brown")));
}

#[test]
fn ender_rows_verify_totals() {
    let rows = |total: &str| {
        vec![
            Row::new("To 6 yd Lincey 18/:", holder("John Smith")),
            Row::new("To 1 Hat 5/:", holder("John Smith")),
            Row::new(format!("Total {}", total), holder("John Smith")),
            Row::new("To 1 Hat 5/:", holder("John Smith")),
        ]
    };

    let (blocks, errors) = parse(&rows("1/3/:"));
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].is_ender());
    assert_eq!(blocks[0].len(), 3);
    assert!(blocks[0].iter().all(|t| !t.has_errors()));
    assert!(errors.iter().all(|e| e.r#type != ErrorType::NotBalanced));

    let (blocks, errors) = parse(&rows("1/4/:"));
    let ender = &blocks[0].txns()[2];
    assert_eq!(ender.kind(), Some(TxnKind::Ender));
    assert_eq!(
        ender.errors(),
        &vec!["Currency total mismatch: computed 1/3/0, expected 1/4/0".to_string()]
    );
    assert!(blocks[0].txns()[..2].iter().all(|t| !t.has_errors()));
    assert_eq!(
        errors
            .iter()
            .filter(|e| e.r#type == ErrorType::NotBalanced)
            .count(),
        1
    );
}

#[test]
fn ender_naming_a_new_holder_totals_the_whole_block() {
    let rows = vec![
        Row::new("To 1 Hat 5/:", holder("John Smith")),
        Row::new("To 1 Hat 5/:", holder("John Smith")),
        Row::new("Total 10/:", holder("Tom Brown")),
    ];
    let (blocks, errors) = parse(&rows);
    let sizes: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3]);
    assert!(blocks[0].is_ender());
    assert!(blocks[0].iter().all(|t| !t.has_errors()));
    assert!(errors.iter().all(|e| e.r#type != ErrorType::NotBalanced), "{:?}", errors);
}

#[test]
fn oversized_price_does_not_stop_the_sheet() {
    let rows = vec![
        Row::new("To Sugar 99999999999999999L", holder("John Smith")),
        Row::new("To 1 Hat 5/:", holder("John Smith")),
    ];
    let (blocks, errors) = parse(&rows);
    assert_eq!(blocks.len(), 1);
    let txns = blocks[0].txns();
    assert_eq!(txns.len(), 2);
    assert_eq!(txns[0].currency(), None);
    assert!(txns[0].errors().iter().any(|e| e.starts_with("Unreadable price")));
    assert_eq!(txns[1].currency(), Some(money("5/:")));
    assert!(!txns[1].has_errors());
    assert!(errors.iter().any(|e| e.r#type == ErrorType::Syntax));
}

#[test]
fn both_currencies_are_reconciled() {
    let ctx = RowContext {
        currency_total: Some(money("13/:")),
        sterling_total: Some(money("5/:")),
        ..holder("John Smith")
    };
    let (blocks, errors) = parse(&[Row::new("To Sugar 10/:\tTo Rum 5/:\tTo Salt 3/:", ctx)]);
    assert!(errors.is_empty(), "{:?}", errors);
    let txns = blocks[0].txns();
    assert_eq!(txns.len(), 3);
    let types: Vec<_> = txns.iter().map(|t| t.currency_type()).collect();
    assert_eq!(
        types,
        vec![
            Some(CurrencyType::Currency),
            Some(CurrencyType::Sterling),
            Some(CurrencyType::Currency)
        ]
    );
    assert_eq!(txns[1].sterling(), Some(money("5/:")));
    assert_eq!(txns[1].currency(), None);
}

#[test]
fn ambiguous_currencies_are_flagged() {
    let ctx = RowContext {
        currency_total: Some(money("5/:")),
        sterling_total: Some(money("5/:")),
        ..holder("John Smith")
    };
    let (blocks, errors) = parse(&[Row::new("To Sugar 5/:\tTo Rum 5/:", ctx)]);
    assert!(blocks[0].iter().all(|t| t.has_errors()));
    assert_eq!(
        errors
            .iter()
            .filter(|e| e.r#type == ErrorType::Ambiguous)
            .count(),
        2
    );
}

#[test]
fn tobacco_blocks_are_read() {
    let cell = "By 2 hhds Tobacco\nNo 12 1050 98\nNo 13 1100 100 1000\n1952 at 12/6";
    let (blocks, errors) = parse(&[Row::new(cell, holder("John Smith"))]);
    assert!(errors.iter().all(|e| e.r#type != ErrorType::Tobacco), "{:?}", errors);
    let txn = &blocks[0].txns()[0];
    assert!(txn.is_tobacco());
    let weights: Vec<_> = txn.tobacco_entries().iter().map(|e| e.weight).collect();
    assert_eq!(
        weights,
        vec![Some(Decimal::from(952)), Some(Decimal::from(1000))]
    );
    assert_eq!(txn.price().as_deref(), Some("12/6"));
    assert!(txn.price_is_bulk());
}

#[test]
fn unreadable_entries_are_kept() {
    let (blocks, errors) = parse(&[Row::new("To ~ Sugar", holder("John Smith"))]);
    assert_eq!(blocks[0].len(), 1);
    assert!(blocks[0].txns()[0].has_errors());
    assert_eq!(errors[0].r#type, ErrorType::Syntax);
}
