//! Exact arithmetic over the pounds/shillings/pence ladder.
//!
//! A [`Money`] is a single signed count of twelfths of a penny. Twelfths are
//! the smallest unit that represents the halves, thirds, quarters and sixths
//! of a penny written in the ledgers, so every amount stays an integer.

use crate::utils::{glyph_for_twelfths, split_mixed, vulgar_fraction};
use crate::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

pub const TWELFTHS_PER_PENNY: i64 = 12;
pub const PENCE_PER_SHILLING: i64 = 12;
pub const SHILLINGS_PER_POUND: i64 = 20;
pub const TWELFTHS_PER_SHILLING: i64 = TWELFTHS_PER_PENNY * PENCE_PER_SHILLING;
pub const TWELFTHS_PER_POUND: i64 = TWELFTHS_PER_SHILLING * SHILLINGS_PER_POUND;
/// Largest amount, in pounds, accepted from text or columns. Sums of many
/// such amounts still fit in an `i64`.
pub const MAX_POUNDS: i64 = 1_000_000_000;
pub const MAX_TWELFTHS: i64 = MAX_POUNDS * TWELFTHS_PER_POUND;

/// Failure modes of reading an amount of money.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// A unit suffix outside `L`, `s`, `d` and `p`. The token grammar only
    /// hands over price-shaped text, so this is a contract violation.
    UnitSuffix { input: String, suffix: String },
    /// Slash notation with the wrong number of fields or subfields.
    Malformed { input: String, reason: &'static str },
    /// A component that is neither a number nor a known fraction.
    Component { input: String },
    /// A fractional component that does not land on a whole twelfth of a
    /// penny.
    Inexact { input: String },
    /// An amount beyond [`MAX_POUNDS`].
    Overflow { input: String },
}

impl MoneyError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, MoneyError::UnitSuffix { .. })
    }
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::UnitSuffix { input, suffix } => {
                write!(f, "unknown unit {:?} in {:?}", suffix, input)
            }
            MoneyError::Malformed { input, reason } => {
                write!(f, "malformed amount {:?}: {}", input, reason)
            }
            MoneyError::Component { input } => write!(f, "invalid component {:?}", input),
            MoneyError::Inexact { input } => {
                write!(f, "{:?} is not a whole twelfth of a penny", input)
            }
            MoneyError::Overflow { input } => write!(f, "{:?} is too large", input),
        }
    }
}

impl std::error::Error for MoneyError {}

/// The decomposed form of a [`Money`]. All four fields carry the sign of the
/// whole amount.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoneyParts {
    pub pounds: i64,
    pub shillings: i64,
    pub pence: i64,
    /// Remainder in twelfths of a penny.
    pub twelfths: i64,
}

impl From<(i64, i64, i64, i64)> for MoneyParts {
    fn from(tuple: (i64, i64, i64, i64)) -> Self {
        MoneyParts {
            pounds: tuple.0,
            shillings: tuple.1,
            pence: tuple.2,
            twelfths: tuple.3,
        }
    }
}

/// One field of an amount given explicitly, as it arrives from a spreadsheet
/// column: an integer, a float, or text.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Component {
    fn from(value: i64) -> Self {
        Component::Int(value)
    }
}

impl From<i32> for Component {
    fn from(value: i32) -> Self {
        Component::Int(value.into())
    }
}

impl From<f64> for Component {
    fn from(value: f64) -> Self {
        Component::Float(value)
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Component::Text(value.to_string())
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        Component::Text(value)
    }
}

impl Component {
    /// Converts the component to twelfths, given the size of its unit.
    fn twelfths(&self, unit: i64) -> Result<i64, MoneyError> {
        match self {
            Component::Int(value) => bounded(value.checked_mul(unit), &value.to_string()),
            Component::Float(value) => {
                let input = value.to_string();
                let number =
                    Decimal::from_f64(*value).ok_or(MoneyError::Component { input: input.clone() })?;
                exact_twelfths(number, unit, input)
            }
            Component::Text(text) => {
                let cleaned: String = text.chars().filter(|c| !matches!(c, '[' | ']')).collect();
                let cleaned = cleaned.trim();
                if cleaned.is_empty() || cleaned == "-" || cleaned == ":" {
                    return Ok(0);
                }
                if let Some((whole, fraction)) = split_mixed(cleaned) {
                    return whole_and_fraction(whole, fraction, unit, cleaned);
                }
                let number = Decimal::from_str(cleaned).map_err(|_| MoneyError::Component {
                    input: text.clone(),
                })?;
                exact_twelfths(number, unit, text.clone())
            }
        }
    }
}

/// Keeps a count of twelfths within `±MAX_TWELFTHS`.
fn bounded(twelfths: Option<i64>, input: &str) -> Result<i64, MoneyError> {
    twelfths
        .filter(|t| (-MAX_TWELFTHS..=MAX_TWELFTHS).contains(t))
        .ok_or_else(|| MoneyError::Overflow {
            input: input.to_string(),
        })
}

fn exact_twelfths(number: Decimal, unit: i64, input: String) -> Result<i64, MoneyError> {
    let scaled = number
        .checked_mul(Decimal::from(unit))
        .ok_or_else(|| MoneyError::Overflow {
            input: input.clone(),
        })?;
    if !scaled.fract().is_zero() {
        return Err(MoneyError::Inexact { input });
    }
    bounded(scaled.to_i64(), &input)
}

fn whole_and_fraction(
    whole: i64,
    fraction: Option<(i64, i64)>,
    unit: i64,
    input: &str,
) -> Result<i64, MoneyError> {
    let mut twelfths = whole.checked_mul(unit);
    if let Some((num, den)) = fraction {
        if (unit * num) % den != 0 {
            return Err(MoneyError::Inexact {
                input: input.to_string(),
            });
        }
        twelfths = twelfths.and_then(|t| t.checked_add(unit * num / den));
    }
    bounded(twelfths, input)
}

/// Adds the twelfths of several fields, failing past `±MAX_TWELFTHS`.
fn sum_fields(fields: &[i64], input: &str) -> Result<i64, MoneyError> {
    let total = fields
        .iter()
        .try_fold(0i64, |total, field| total.checked_add(*field));
    bounded(total, input)
}

/// An exact amount of money in pounds, shillings and pence.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "MoneyParts", try_from = "MoneyParts")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    twelfths: i64,
}

impl Money {
    pub const ZERO: Money = Money { twelfths: 0 };

    pub fn from_twelfths(twelfths: i64) -> Self {
        Money { twelfths }
    }

    /// Builds an amount from known parts. Overflows like integer arithmetic;
    /// untrusted parts go through `Money::try_from(MoneyParts)`.
    pub fn from_parts(pounds: i64, shillings: i64, pence: i64, twelfths: i64) -> Self {
        Money {
            twelfths: pounds * TWELFTHS_PER_POUND
                + shillings * TWELFTHS_PER_SHILLING
                + pence * TWELFTHS_PER_PENNY
                + twelfths,
        }
    }

    /// Builds an amount from explicitly given columns. Text columns may be
    /// empty or `-` for zero and may carry editorial brackets; floats must
    /// resolve to whole twelfths of a penny.
    pub fn from_components(
        pounds: impl Into<Component>,
        shillings: impl Into<Component>,
        pence: impl Into<Component>,
        twelfths: impl Into<Component>,
    ) -> Result<Self, MoneyError> {
        let (pounds, shillings, pence, twelfths) =
            (pounds.into(), shillings.into(), pence.into(), twelfths.into());
        let fields = [
            pounds.twelfths(TWELFTHS_PER_POUND)?,
            shillings.twelfths(TWELFTHS_PER_SHILLING)?,
            pence.twelfths(TWELFTHS_PER_PENNY)?,
            twelfths.twelfths(1)?,
        ];
        let input = format!("{:?}/{:?}/{:?}/{:?}", pounds, shillings, pence, twelfths);
        sum_fields(&fields, &input).map(Money::from_twelfths)
    }

    /// Reads a transcribed amount: unit form (`6d`, `2L 3s 6½d`, `6d ½`) or
    /// slash form (`10/6`, `5/10/6`, `:/6`, `18/:`).
    pub fn parse(text: &str) -> Result<Self, MoneyError> {
        let trimmed = text.trim();
        let first = trimmed.split_whitespace().next().unwrap_or("");
        if first.contains('/') {
            parse_slash(trimmed)
        } else {
            parse_units(trimmed)
        }
    }

    pub fn twelfths(&self) -> i64 {
        self.twelfths
    }

    pub fn is_zero(&self) -> bool {
        self.twelfths == 0
    }

    pub fn to_parts(&self) -> MoneyParts {
        let sign = self.twelfths.signum();
        let mut rest = self.twelfths.abs();
        let twelfths = rest % TWELFTHS_PER_PENNY;
        rest /= TWELFTHS_PER_PENNY;
        let pence = rest % PENCE_PER_SHILLING;
        rest /= PENCE_PER_SHILLING;
        let shillings = rest % SHILLINGS_PER_POUND;
        let pounds = rest / SHILLINGS_PER_POUND;
        MoneyParts {
            pounds: sign * pounds,
            shillings: sign * shillings,
            pence: sign * pence,
            twelfths: sign * twelfths,
        }
    }

    /// Multiplies by a possibly fractional quantity, rounding to the nearest
    /// twelfth of a penny. `None` past `±MAX_TWELFTHS`.
    pub fn scale(&self, factor: Decimal) -> Option<Money> {
        let scaled = Decimal::from(self.twelfths).checked_mul(factor)?.round();
        bounded(scaled.to_i64(), "").ok().map(Money::from_twelfths)
    }

    pub fn checked_mul(&self, rhs: i64) -> Option<Money> {
        self.twelfths.checked_mul(rhs).map(Money::from_twelfths)
    }

    /// Divides by a count, or `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: i64) -> Option<Money> {
        self.twelfths.checked_div(rhs).map(Money::from_twelfths)
    }

    /// The ratio of two amounts, or `None` when dividing by zero.
    pub fn checked_ratio(&self, rhs: Money) -> Option<Decimal> {
        Decimal::from(self.twelfths).checked_div(Decimal::from(rhs.twelfths))
    }
}

fn parse_unit_word(word: &str, input: &str) -> Result<i64, MoneyError> {
    let suffix_start = word
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic())
        .last()
        .map(|(i, _)| i)
        .ok_or(MoneyError::Malformed {
            input: input.to_string(),
            reason: "missing unit",
        })?;
    let (number, suffix) = word.split_at(suffix_start);
    let unit = match suffix {
        "L" => TWELFTHS_PER_POUND,
        "s" => TWELFTHS_PER_SHILLING,
        "d" | "p" => TWELFTHS_PER_PENNY,
        _ => {
            return Err(MoneyError::UnitSuffix {
                input: input.to_string(),
                suffix: suffix.to_string(),
            })
        }
    };
    let (whole, fraction) = split_mixed(number).ok_or(MoneyError::Component {
        input: word.to_string(),
    })?;
    whole_and_fraction(whole, fraction, unit, word)
}

fn parse_units(input: &str) -> Result<Money, MoneyError> {
    let mut total = 0;
    let mut last_unit = None;
    for word in input.split_whitespace() {
        if let Some((num, den)) = vulgar_fraction(word) {
            let unit = last_unit.ok_or(MoneyError::Malformed {
                input: input.to_string(),
                reason: "fraction without a preceding value",
            })?;
            let fraction = whole_and_fraction(0, Some((num, den)), unit, word)?;
            total = sum_fields(&[total, fraction], input)?;
            continue;
        }
        let value = parse_unit_word(word, input)?;
        last_unit = Some(match word.chars().last() {
            Some('L') => TWELFTHS_PER_POUND,
            Some('s') => TWELFTHS_PER_SHILLING,
            _ => TWELFTHS_PER_PENNY,
        });
        total = sum_fields(&[total, value], input)?;
    }
    if last_unit.is_none() {
        return Err(MoneyError::Malformed {
            input: input.to_string(),
            reason: "no value",
        });
    }
    Ok(Money::from_twelfths(total))
}

/// Reads one slash-separated field. The field may be followed by a fraction
/// of the same unit, either glued (`6½`) or as a second word (`6 ½`).
fn parse_field(field: &str, unit: i64, input: &str) -> Result<i64, MoneyError> {
    let subfields: Vec<&str> = field.split_whitespace().collect();
    match subfields.as_slice() {
        [] => Ok(0),
        [value] => Component::Text(value.to_string()).twelfths(unit),
        [value, fraction] => {
            let whole = Component::Text(value.to_string()).twelfths(unit)?;
            let (num, den) = vulgar_fraction(fraction).ok_or(MoneyError::Component {
                input: fraction.to_string(),
            })?;
            let part = whole_and_fraction(0, Some((num, den)), unit, fraction)?;
            sum_fields(&[whole, part], input)
        }
        _ => Err(MoneyError::Malformed {
            input: input.to_string(),
            reason: "too many subfields",
        }),
    }
}

fn parse_slash(input: &str) -> Result<Money, MoneyError> {
    // A written-out fraction at the end belongs to the last field, not to the
    // slash structure.
    let (body, trailing) = match input.rsplit_once(char::is_whitespace) {
        Some((head, tail)) if tail.contains('/') && vulgar_fraction(tail).is_some() => {
            (head.trim(), vulgar_fraction(tail))
        }
        _ => (input, None),
    };
    let fields: Vec<&str> = body.split('/').collect();
    let (pounds, shillings, pence) = match fields.as_slice() {
        [shillings, pence] => ("", *shillings, *pence),
        [pounds, shillings, pence] => (*pounds, *shillings, *pence),
        _ => {
            return Err(MoneyError::Malformed {
                input: input.to_string(),
                reason: "expected two or three fields",
            })
        }
    };
    let fraction = match trailing {
        Some(fraction) => whole_and_fraction(0, Some(fraction), TWELFTHS_PER_PENNY, input)?,
        None => 0,
    };
    let fields = [
        parse_field(pounds, TWELFTHS_PER_POUND, input)?,
        parse_field(shillings, TWELFTHS_PER_SHILLING, input)?,
        parse_field(pence, TWELFTHS_PER_PENNY, input)?,
        fraction,
    ];
    sum_fields(&fields, input).map(Money::from_twelfths)
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl From<Money> for MoneyParts {
    fn from(money: Money) -> Self {
        money.to_parts()
    }
}

impl TryFrom<MoneyParts> for Money {
    type Error = MoneyError;

    fn try_from(parts: MoneyParts) -> Result<Self, Self::Error> {
        Money::from_components(parts.pounds, parts.shillings, parts.pence, parts.twelfths)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.to_parts();
        if self.twelfths < 0 {
            write!(f, "-")?;
        }
        write!(
            f,
            "{}/{}/{}",
            parts.pounds.abs(),
            parts.shillings.abs(),
            parts.pence.abs()
        )?;
        let twelfths = parts.twelfths.abs();
        if twelfths != 0 {
            match glyph_for_twelfths(twelfths) {
                Some(glyph) => write!(f, "{}", glyph)?,
                None => write!(f, " {}/12", twelfths)?,
            }
        }
        Ok(())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money::from_twelfths(self.twelfths + rhs.twelfths)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money::from_twelfths(self.twelfths - rhs.twelfths)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.twelfths += rhs.twelfths;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.twelfths -= rhs.twelfths;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money::from_twelfths(-self.twelfths)
    }
}

/// Panics or wraps on overflow like integer multiplication; see
/// [`Money::checked_mul`].
impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Self::Output {
        Money::from_twelfths(self.twelfths * rhs)
    }
}

/// Divides by a count, truncating toward zero to whole twelfths. Panics
/// when `rhs` is zero, like integer division; see [`Money::checked_div`].
impl Div<i64> for Money {
    type Output = Money;

    fn div(self, rhs: i64) -> Self::Output {
        Money::from_twelfths(self.twelfths / rhs)
    }
}

/// The ratio of two amounts. Panics when `rhs` is zero, like integer
/// division; see [`Money::checked_ratio`].
impl Div<Money> for Money {
    type Output = Decimal;

    fn div(self, rhs: Money) -> Self::Output {
        Decimal::from(self.twelfths) / Decimal::from(rhs.twelfths)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &str) -> (i64, i64, i64, i64) {
        let p = Money::parse(text).unwrap().to_parts();
        (p.pounds, p.shillings, p.pence, p.twelfths)
    }

    #[test]
    fn parse_unit_forms() {
        assert_eq!(parts("6d"), (0, 0, 6, 0));
        assert_eq!(parts("6p"), (0, 0, 6, 0));
        assert_eq!(parts("3s"), (0, 3, 0, 0));
        assert_eq!(parts("2L 3s 6d"), (2, 3, 6, 0));
        assert_eq!(parts("6½d"), (0, 0, 6, 6));
        assert_eq!(parts("6d ¼"), (0, 0, 6, 3));
        assert_eq!(parts("6d 1/3"), (0, 0, 6, 4));
    }

    #[test]
    fn parse_slash_forms() {
        assert_eq!(parts("10/6"), (0, 10, 6, 0));
        assert_eq!(parts("5/10/6"), (5, 10, 6, 0));
        assert_eq!(parts(":/6"), (0, 0, 6, 0));
        assert_eq!(parts("18/:"), (0, 18, 0, 0));
        assert_eq!(parts("1/:/⅙"), (1, 0, 0, 2));
        assert_eq!(parts("10/6 ½"), (0, 10, 6, 6));
        assert_eq!(parts("10/6½"), (0, 10, 6, 6));
        assert_eq!(parts("10/6 1/2"), (0, 10, 6, 6));
    }

    #[test]
    fn parse_failures() {
        let err = Money::parse("6x").unwrap_err();
        assert!(err.is_contract_violation());
        assert!(matches!(
            Money::parse("1/2/3/4"),
            Err(MoneyError::Malformed { .. })
        ));
        assert!(matches!(
            Money::parse("10/6 ½ 3"),
            Err(MoneyError::Malformed { .. })
        ));
        assert!(!Money::parse("1/2/3/4").unwrap_err().is_contract_violation());
    }

    #[test]
    fn components() {
        let money = Money::from_components("[1]", "-", 6, "").unwrap();
        assert_eq!(money, Money::from_parts(1, 0, 6, 0));
        let money = Money::from_components(0, 1.5, 0.0, 0).unwrap();
        assert_eq!(money, Money::from_parts(0, 1, 6, 0));
        assert_eq!(
            Money::from_components(0, 0, "6½", 0).unwrap(),
            Money::from_parts(0, 0, 6, 6)
        );
        assert!(matches!(
            Money::from_components(0, 0, 0.3, 0),
            Err(MoneyError::Inexact { .. })
        ));
    }

    #[test]
    fn parts_round_trip() {
        for (l, s, d, t) in [(0, 0, 0, 0), (3, 19, 11, 11), (12, 0, 6, 3), (1, 1, 1, 1)] {
            let parts = Money::from_parts(l, s, d, t).to_parts();
            assert_eq!((parts.pounds, parts.shillings, parts.pence, parts.twelfths), (l, s, d, t));
        }
    }

    #[test]
    fn negative_parts_keep_sign() {
        let money = Money::from_parts(0, 1, 0, 0) - Money::from_parts(1, 2, 3, 4);
        let parts = money.to_parts();
        assert_eq!(
            (parts.pounds, parts.shillings, parts.pence, parts.twelfths),
            (-1, -1, -3, -4)
        );
        assert_eq!(money.to_string(), "-1/1/3⅓");
    }

    #[test]
    fn arithmetic() {
        let a = Money::parse("1/5/6").unwrap();
        let b = Money::parse("14/6").unwrap();
        let c = Money::parse("3d").unwrap();
        assert_eq!(a + b, Money::from_parts(2, 0, 0, 0));
        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b, b + a);
        assert_eq!((a + b).twelfths(), a.twelfths() + b.twelfths());
        assert_eq!(c * 4, Money::parse("1s").unwrap());
        assert_eq!(Money::parse("1s").unwrap() / 4, c);
        assert_eq!(Money::parse("1s").unwrap() / c, Decimal::from(4));
        assert_eq!(Money::ZERO.checked_ratio(Money::ZERO), None);
        assert_eq!(vec![a, b, c].iter().sum::<Money>(), Money::parse("2/0/3").unwrap());
        let mut d = a;
        d += b;
        d -= b;
        assert_eq!(d, a);
        assert!(b < a);
        assert_eq!(c.scale(Decimal::new(15, 1)), Some(Money::parse("4½d").unwrap()));
        assert_eq!(c.checked_div(0), None);
        assert_eq!(c.checked_div(3), Some(Money::parse("1d").unwrap()));
        assert_eq!(Money::from_twelfths(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        for text in [
            "99999999999999999L",
            "99999999999999999/:/:",
            "1000000001L",
            "9223372036854775807d",
        ] {
            assert!(
                matches!(Money::parse(text), Err(MoneyError::Overflow { .. })),
                "{}",
                text
            );
        }
        assert!(!Money::parse("99999999999999999L").unwrap_err().is_contract_violation());
        assert_eq!(
            Money::parse("1000000000L").unwrap(),
            Money::from_twelfths(MAX_TWELFTHS)
        );
        assert!(matches!(
            Money::from_components(i64::MAX, 0, 0, 0),
            Err(MoneyError::Overflow { .. })
        ));
        assert!(matches!(
            Money::try_from(MoneyParts::from((MAX_POUNDS, 0, 0, 1))),
            Err(MoneyError::Overflow { .. })
        ));
        assert_eq!(Money::parse("1s").unwrap().scale(Decimal::MAX), None);
    }
}
