mod block;
mod extract;
mod grammar;
mod lexer;
mod normalize;
mod parser;
mod tagger;
mod token;

pub use block::BlockBuilder;
pub use extract::{Extractor, RowResult};
pub use grammar::{Combiner, Label, SemanticToken};
pub use lexer::Lexer;
pub use normalize::normalize;
pub use parser::{Blocks, Pipeline};
pub use tagger::{LexiconTagger, TaggedToken, Tagger, UNRECOGNIZED_POS};
pub use token::Shape;
