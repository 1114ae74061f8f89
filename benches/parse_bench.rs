use criterion::{criterion_group, criterion_main, Criterion};
use scrivener::parse::{LexiconTagger, Pipeline};
use scrivener::relations::NoRelationships;
use scrivener::words::WordIndex;
use scrivener::{Row, RowContext, TransactionBlock};

const SAMPLE: &str = "To 6 yd Lincey 18/:\nTo 2 lb Sugar @ 1/3 2/6\nBy Cash 1/:/:\nTo 1 pair Shoes 7/6\n";

fn read_rows(path: Option<String>) -> Vec<Row> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path).unwrap(),
        None => SAMPLE.repeat(50),
    };
    text.lines()
        .map(|line| Row::new(line, RowContext::default()))
        .collect()
}

fn parse_rows(rows: &[Row]) -> Vec<TransactionBlock> {
    let words = WordIndex::default();
    let tagger = LexiconTagger::new(&words);
    let pipeline = Pipeline::new(&tagger, &words, &NoRelationships);
    let (blocks, _) = pipeline.parse_sheet("bench", rows);
    blocks
}

fn criterion_benchmark(c: &mut Criterion) {
    let rows = read_rows(std::env::var("SCRIVENER_BENCH_INPUT").ok());
    c.bench_function("Parse rows", |b| b.iter(|| parse_rows(&rows)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
