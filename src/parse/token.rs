use logos::Logos;

/// The surface shape of a word as written in a ledger cell.
#[derive(Debug, PartialEq, Eq, Logos, Clone, Copy, Hash)]
pub enum Shape {
    #[regex(r"[ \f\r\t\v\n]+")]
    WhiteSpace,

    /// `6d`, `3L`, `4½d`
    #[regex(r"[0-9]+[½¼¾⅓⅔⅙⅚]?[Lsdp]")]
    UnitMoney,

    /// `10/6`, `5/10/6`, `:/6`, `18/:`, `1/:/6½`
    #[regex(r"[0-9:]+/[0-9:]+(/[0-9:]+)?[½¼¾⅓⅔⅙⅚]?")]
    Slash,

    #[regex(r"[0-9]+[½¼¾⅓⅔⅙⅚]")]
    MixedNumber,

    #[regex(r"[½¼¾⅓⅔⅙⅚]")]
    Fraction,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]+")]
    Decimal,

    #[regex(r"[0-9]+(st|nd|rd|th)")]
    Ordinal,

    #[regex(r"[A-Za-z][A-Za-z0-9_'\-]*\.?")]
    Word,

    #[token("&")]
    Ampersand,

    #[token("@")]
    At,

    #[regex(r#"[,;:.()!?"£$%*+=#/\-]"#)]
    Punct,

    #[error]
    Error,
}

impl Shape {
    /// The shape of `text` when it lexes as exactly one token.
    pub fn of(text: &str) -> Option<Shape> {
        let mut lexer = Shape::lexer(text.trim());
        let shape = lexer.next()?;
        match lexer.next() {
            None => Some(shape),
            Some(_) => None,
        }
    }

    #[inline]
    pub fn is_price(self) -> bool {
        matches!(self, Shape::UnitMoney | Shape::Slash)
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Shape::Integer | Shape::Decimal | Shape::MixedNumber | Shape::Fraction
        )
    }
}

/// Whether `text` is written like a price: `6d` or a slash ratio.
pub fn is_price_shaped(text: &str) -> bool {
    Shape::of(text).map_or(false, Shape::is_price)
}

pub fn is_numeric(text: &str) -> bool {
    Shape::of(text).map_or(false, Shape::is_numeric)
}
