use super::Shape;
use logos::{Lexer as LogosLexer, Logos};

/// Walks a normalized sub-entry one word at a time, skipping white space.
pub struct Lexer<'source> {
    llex: LogosLexer<'source, Shape>,
    peeked_token: Option<(Shape, &'source str)>,
}

impl<'source> Lexer<'source> {
    pub fn new(src: &'source str) -> Self {
        let mut lexer = Lexer {
            llex: Shape::lexer(src),
            peeked_token: None,
        };
        lexer.skip_space();
        lexer
    }

    fn skip_space(&mut self) {
        while let Some(token) = self.llex.next() {
            if token != Shape::WhiteSpace {
                self.peeked_token = Some((token, self.llex.slice()));
                return;
            }
        }
    }

    pub fn peek(&self) -> Option<(Shape, &'source str)> {
        self.peeked_token
    }

    #[inline]
    pub fn consume(&mut self) {
        if self.peeked_token.take().is_some() {
            self.skip_space();
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = (Shape, &'source str);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.peek()?;
        self.consume();
        Some(token)
    }
}
