use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::{OfxError, Result};

/// Exponents beyond this are rejected rather than expanded
const MAX_EXPONENT: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// Exact signed transaction amount
///
/// Equality, ordering and hashing use the value only. `scale` is the number
/// of fraction digits the amount was written with and only affects display.
#[derive(Debug, Clone)]
pub struct Amount {
    value: BigRational,
    scale: u32,
}

impl Amount {
    pub fn new(value: BigRational) -> Self {
        Self { value, scale: 0 }
    }

    pub fn value(&self) -> &BigRational {
        &self.value
    }

    pub fn sign(&self) -> Sign {
        if self.value.is_zero() {
            Sign::Zero
        } else if self.value.is_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

fn ten_pow(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10), exp as usize)
}

/// Signed decimal literal with optional exponent, returning the value and its written scale
fn parse_decimal(text: &str) -> Option<(BigRational, u32)> {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], text[idx + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    if exponent.unsigned_abs() > MAX_EXPONENT as u64 {
        return None;
    }

    let (negative, digits) = match mantissa.as_bytes().first() {
        Some(b'-') => (true, &mantissa[1..]),
        Some(b'+') => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut numerator: BigInt = format!("{}{}", whole, fraction).parse().ok()?;
    if negative {
        numerator = -numerator;
    }

    let scale = fraction.len() as i64 - exponent;
    let value = if scale >= 0 {
        BigRational::new(numerator, ten_pow(scale as u32))
    } else {
        BigRational::from_integer(numerator * ten_pow((-scale) as u32))
    };

    Some((value, scale.max(0) as u32))
}

fn parse_rational(text: &str) -> Option<Amount> {
    match text.split_once('/') {
        Some((numerator, denominator)) => {
            let (numerator, _) = parse_decimal(numerator)?;
            let (denominator, _) = parse_decimal(denominator)?;
            if denominator.is_zero() {
                return None;
            }
            Some(Amount::new(numerator / denominator))
        }
        None => parse_decimal(text).map(|(value, scale)| Amount { value, scale }),
    }
}

impl FromStr for Amount {
    type Err = OfxError;

    fn from_str(s: &str) -> Result<Self> {
        parse_rational(s.trim()).ok_or_else(|| OfxError::invalid_amount(s))
    }
}

/// Fraction digits needed to write `denominator` exactly, if it terminates
fn terminating_digits(denominator: &BigInt) -> Option<u32> {
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut rest = denominator.clone();
    let (mut twos, mut fives) = (0u32, 0u32);

    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }

    rest.is_one().then_some(twos.max(fives))
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(digits) = terminating_digits(self.value.denom()) else {
            // Repeating decimals are written as a fraction
            return write!(f, "{}/{}", self.value.numer(), self.value.denom());
        };
        let digits = digits.max(self.scale);

        let scaled = self.value.numer() * ten_pow(digits) / self.value.denom();
        if scaled.is_negative() {
            f.write_str("-")?;
        }
        let magnitude = scaled.abs().to_string();
        if digits == 0 {
            return f.write_str(&magnitude);
        }

        let padded = format!("{:0>width$}", magnitude, width = digits as usize + 1);
        let (whole, fraction) = padded.split_at(padded.len() - digits as usize);
        write!(f, "{}.{}", whole, fraction)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::new(BigRational::zero())
    }
}

impl From<BigRational> for Amount {
    fn from(value: BigRational) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Amount {}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for Amount {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            value: self.value + rhs.value,
            scale: self.scale.max(rhs.scale),
        }
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::default(), |acc, a| acc + a.clone())
    }
}
