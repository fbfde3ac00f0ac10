use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Money amount represented as **integer cents**.
///
/// The backend speaks plain JSON numbers (`99.99`); they are rounded to the
/// nearest cent on the way in so that client-side sums never drift.
///
/// Journal amounts are always non-negative: the direction of the money lives
/// in the entry type, never in the sign. Summaries may still carry a negative
/// net balance.
///
/// Arithmetic saturates at the `i64` cent range instead of overflowing.
///
/// # Examples
///
/// ```rust
/// use api_types::Amount;
///
/// let amount = Amount::new(1_234_56);
/// assert_eq!(amount.cents(), 123456);
/// assert_eq!(amount.to_string(), "$1,234.56");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use api_types::Amount;
///
/// assert_eq!("10".parse::<Amount>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<Amount>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<Amount>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Amount(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount")]
    Invalid,
    #[error("too many decimals")]
    TooManyDecimals,
    #[error("amount too large")]
    Overflow,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Converts a decimal number (as sent by the backend) to cents.
    ///
    /// Returns `None` for non-finite values or values outside the `i64` cent
    /// range.
    #[must_use]
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    /// Returns the amount as a decimal number of currency units.
    #[must_use]
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = group_thousands(abs / 100);
        let cents = abs % 100;
        write!(f, "{sign}${units}.{cents:02}")
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Amount> for i64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(self.0.saturating_neg())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| de::Error::custom(format!("amount out of range: {value}")))
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses user input such as `12.50`, `12,5` or `-3` into cents.
    ///
    /// At most two fractional digits are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (negative, digits) = match input.as_bytes().first() {
            Some(b'-') => (true, input[1..].trim_start()),
            Some(b'+') => (false, input[1..].trim_start()),
            _ => (false, input),
        };
        if digits.is_empty() {
            return Err(ParseAmountError::Empty);
        }

        let normalized = digits.replace(',', ".");
        let (whole, fraction) = normalized
            .split_once('.')
            .unwrap_or((normalized.as_str(), ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(ParseAmountError::Invalid);
        }
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 | 2 => {
                let padded = format!("{fraction:0<2}");
                padded.parse::<i64>().map_err(|_| ParseAmountError::Invalid)?
            }
            _ => return Err(ParseAmountError::TooManyDecimals),
        };

        let cents = whole
            .parse::<i64>()
            .ok()
            .and_then(|units| units.checked_mul(100))
            .and_then(|cents| cents.checked_add(fraction_cents))
            .ok_or(ParseAmountError::Overflow)?;
        Ok(Amount(if negative { -cents } else { cents }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_dollars_with_grouping() {
        assert_eq!(Amount::new(0).to_string(), "$0.00");
        assert_eq!(Amount::new(123_456).to_string(), "$1,234.56");
        assert_eq!(Amount::new(-50_000).to_string(), "-$500.00");
        assert_eq!(Amount::new(100_000_000).to_string(), "$1,000,000.00");
        assert_eq!(Amount::new(5).to_string(), "$0.05");
    }

    #[test]
    fn decimal_input_rounds_to_cents() {
        assert_eq!(Amount::from_decimal(99.999), Some(Amount::new(10_000)));
        assert_eq!(Amount::from_decimal(0.1 + 0.2), Some(Amount::new(30)));
        assert_eq!(Amount::from_decimal(f64::NAN), None);
        assert_eq!(Amount::from_decimal(f64::INFINITY), None);
    }

    #[test]
    fn json_numbers_decode_and_encode() {
        let amount: Amount = serde_json::from_str("5000").unwrap();
        assert_eq!(amount.cents(), 500_000);
        let amount: Amount = serde_json::from_str("12.5").unwrap();
        assert_eq!(amount.cents(), 1250);
        assert_eq!(serde_json::to_string(&Amount::new(1999)).unwrap(), "19.99");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Amount>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Amount>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<Amount>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<Amount>().unwrap().cents(), -1);
        assert_eq!("  2.30 ".parse::<Amount>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(ParseAmountError::Empty));
        assert_eq!("12.345".parse::<Amount>(), Err(ParseAmountError::TooManyDecimals));
        assert_eq!("1.2.3".parse::<Amount>(), Err(ParseAmountError::Invalid));
        assert_eq!("abc".parse::<Amount>(), Err(ParseAmountError::Invalid));
    }

    #[test]
    fn arithmetic_saturates_at_the_cent_range() {
        let half = Amount::new(i64::MAX / 2 + 1);
        assert_eq!(half + half, Amount::new(i64::MAX));
        assert_eq!([half, half, half].iter().sum::<Amount>(), Amount::new(i64::MAX));
        assert_eq!(Amount::new(i64::MIN) - half, Amount::new(i64::MIN));
        assert_eq!(-Amount::new(i64::MIN), Amount::new(i64::MAX));

        let mut total = half;
        total += half;
        assert_eq!(total, Amount::new(i64::MAX));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Amount = [Amount::new(100), Amount::new(250)].iter().sum();
        assert_eq!(total, Amount::new(350));
    }
}
