use super::{normalize, BlockBuilder, Combiner, Extractor, RowResult, SemanticToken, Tagger};
use crate::relations::RelationshipLookup;
use crate::words::WordIndex;
use crate::{Error, Row, Source, SrcSheet, TransactionBlock};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Runs rows through normalization, tagging, combination and extraction,
/// and groups the results into blocks.
pub struct Pipeline<'a, T: Tagger + ?Sized, R: RelationshipLookup + ?Sized> {
    tagger: &'a T,
    combiner: Combiner<'a>,
    extractor: Extractor<'a, R>,
}

impl<'a, T: Tagger + ?Sized, R: RelationshipLookup + ?Sized> Pipeline<'a, T, R> {
    pub fn new(tagger: &'a T, words: &'a WordIndex, relations: &'a R) -> Self {
        Pipeline {
            tagger,
            combiner: Combiner::new(words),
            extractor: Extractor::new(words, relations),
        }
    }

    /// The semantic tokens of every sub-entry of `text`.
    pub fn combine(&self, text: &str) -> Vec<Vec<SemanticToken>> {
        normalize(text)
            .iter()
            .map(|entry| {
                let tagged = self.tagger.tag(entry);
                let combined = self.combiner.combine(entry, &tagged);
                log::trace!(
                    "{:?} -> {}",
                    entry,
                    combined
                        .iter()
                        .map(|token| token.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                combined
            })
            .collect()
    }

    pub fn parse_row(&self, row: &Row, src: &Source) -> RowResult {
        let entries = self.combine(&row.text);
        self.extractor.extract_row(row, src, &entries)
    }

    /// Lazily parses the rows of one sheet. Blocks come out as soon as a
    /// boundary is known.
    pub fn blocks<I>(&self, sheet: &str, rows: I) -> Blocks<'_, 'a, T, R, I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
    {
        Blocks {
            pipeline: self,
            sheet: Arc::new(sheet.to_string()),
            rows: rows.into_iter().enumerate(),
            builder: Some(BlockBuilder::new()),
            ready: VecDeque::new(),
            errors: Vec::new(),
        }
    }

    pub fn parse_sheet(&self, sheet: &str, rows: &[Row]) -> (Vec<TransactionBlock>, Vec<Error>) {
        let mut blocks = self.blocks(sheet, rows.iter().cloned());
        let parsed: Vec<TransactionBlock> = blocks.by_ref().collect();
        (parsed, blocks.into_errors())
    }
}

impl<'a, T, R> Pipeline<'a, T, R>
where
    T: Tagger + Sync + ?Sized,
    R: RelationshipLookup + Sync + ?Sized,
{
    /// Parses independent sheets on up to `threads` worker threads. Results
    /// keep the order of `sheets`.
    pub fn parse_sheets(
        &self,
        sheets: Vec<(String, Vec<Row>)>,
        threads: usize,
    ) -> Vec<(String, Vec<TransactionBlock>, Vec<Error>)> {
        let total = sheets.len();
        let num_threads = threads.clamp(1, total.max(1));
        let queue = Mutex::new(sheets.into_iter().enumerate().collect::<VecDeque<_>>());
        let mut results = std::thread::scope(|scope| {
            let handlers = (0..num_threads)
                .map(|id| {
                    let queue = &queue;
                    scope.spawn(move || self.sheet_worker(id, queue))
                })
                .collect::<Vec<_>>();
            handlers
                .into_iter()
                .flat_map(|handler| handler.join().unwrap())
                .collect::<Vec<_>>()
        });
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    fn sheet_worker(
        &self,
        id: usize,
        queue: &Mutex<VecDeque<(usize, (String, Vec<Row>))>>,
    ) -> Vec<(usize, (String, Vec<TransactionBlock>, Vec<Error>))> {
        let mut parsed = vec![];
        loop {
            let task = queue.lock().unwrap().pop_front();
            let Some((index, (sheet, rows))) = task else {
                return parsed;
            };
            log::debug!("worker {} parses {} ({} rows)", id, sheet, rows.len());
            let (blocks, errors) = self.parse_sheet(&sheet, &rows);
            parsed.push((index, (sheet, blocks, errors)));
        }
    }
}

/// The blocks of one sheet, produced on demand. Errors collected so far are
/// available from [`Blocks::errors`].
pub struct Blocks<'p, 'a, T: Tagger + ?Sized, R: RelationshipLookup + ?Sized, I> {
    pipeline: &'p Pipeline<'a, T, R>,
    sheet: SrcSheet,
    rows: std::iter::Enumerate<I>,
    builder: Option<BlockBuilder>,
    ready: VecDeque<TransactionBlock>,
    errors: Vec<Error>,
}

impl<'p, 'a, T, R, I> Blocks<'p, 'a, T, R, I>
where
    T: Tagger + ?Sized,
    R: RelationshipLookup + ?Sized,
{
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}

impl<'p, 'a, T, R, I> Iterator for Blocks<'p, 'a, T, R, I>
where
    T: Tagger + ?Sized,
    R: RelationshipLookup + ?Sized,
    I: Iterator<Item = Row>,
{
    type Item = TransactionBlock;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = self.ready.pop_front() {
                return Some(block);
            }
            match self.rows.next() {
                Some((index, row)) => {
                    let builder = self.builder.as_mut()?;
                    let src = Source::row(&self.sheet, index);
                    let result = self.pipeline.parse_row(&row, &src);
                    let closed = builder.push_row(index, row.context, result, &mut self.errors);
                    self.ready.extend(closed);
                }
                None => {
                    let builder = self.builder.take()?;
                    return builder.finish(&mut self.errors);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::LexiconTagger;
    use crate::relations::NoRelationships;
    use crate::{Money, RowContext};

    fn holder(name: &str) -> RowContext {
        RowContext {
            account_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn rows_become_blocks_lazily() {
        let words = WordIndex::default();
        let tagger = LexiconTagger::new(&words);
        let pipeline = Pipeline::new(&tagger, &words, &NoRelationships);
        let rows = vec![
            Row::new("To 6 yd Lincey 18/:", holder("Smith")),
            Row::new("To 2 lb Sugar 2/6", holder("Smith")),
            Row::new("To 1 Hat 5/:", holder("Jones")),
        ];
        let mut blocks = pipeline.blocks("sheet", rows);
        let first = blocks.next().unwrap();
        assert_eq!(first.len(), 2);
        let second = blocks.next().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.txns()[0].currency(), Some(Money::parse("5/:").unwrap()));
        assert!(blocks.next().is_none());
        assert!(blocks.next().is_none());
    }

    #[test]
    fn sheets_keep_their_order() {
        let words = WordIndex::default();
        let tagger = LexiconTagger::new(&words);
        let pipeline = Pipeline::new(&tagger, &words, &NoRelationships);
        let sheets = (0..5)
            .map(|i| {
                let rows = (0..=i)
                    .map(|_| Row::new("To 1 Hat 5/:", holder("Smith")))
                    .collect();
                (format!("sheet{}", i), rows)
            })
            .collect();
        let results = pipeline.parse_sheets(sheets, 3);
        assert_eq!(results.len(), 5);
        for (i, (sheet, blocks, _)) in results.iter().enumerate() {
            assert_eq!(sheet, &format!("sheet{}", i));
            assert_eq!(blocks.iter().map(|b| b.len()).sum::<usize>(), i + 1);
        }
    }
}
