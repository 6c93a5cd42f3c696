//! Fixed-point money amounts stored as integer cents.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A signed amount of money in integer cents.
///
/// Positive amounts are income or money owed to someone, negative amounts are
/// expenses. Using integer cents keeps sums exact, e.g. the shares of a split
/// always add up to exactly the split's total.
///
/// The arithmetic operators saturate at the bounds of `i64`. Use
/// [Money::checked_add] or [Money::checked_sum] where an overflow must be reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero dollars.
    pub const ZERO: Money = Money(0);

    /// The largest magnitude accepted from user input, one hundred billion dollars.
    ///
    /// Sums of many such amounts stay well inside `i64`.
    pub const MAX_INPUT: Money = Money(10_000_000_000_000);

    /// Create an amount from integer cents.
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// The amount in dollars for display and charts.
    ///
    /// Do not use the result for arithmetic.
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// The absolute value of the amount.
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Returns `true` if the amount is less than zero.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `true` if the amount is greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two amounts, returning `None` on overflow.
    pub const fn checked_add(self, rhs: Money) -> Option<Money> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sum `amounts`.
    ///
    /// # Errors
    /// Returns [Error::AmountOverflow] if the total does not fit in 64 bits of cents.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Money, Error> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
            .ok_or(Error::AmountOverflow)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();

        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = Error;

    /// Parse a decimal string such as "12.34", "-5", "+0,5" or "$1,000.00".
    ///
    /// Commas are treated as thousands separators when a dot is also present,
    /// otherwise a single comma is treated as the decimal separator.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if the string is empty, is not a number,
    /// has more than two decimal places or is larger than [Money::MAX_INPUT].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAmount(s.to_owned());

        let trimmed = s.trim();
        let (is_negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.trim_start().strip_prefix('$').unwrap_or(rest.trim_start());

        let normalised = if rest.contains('.') {
            rest.replace(',', "")
        } else {
            rest.replace(',', ".")
        };

        let (dollars_str, cents_str) = match normalised.split_once('.') {
            Some((dollars, cents)) => (dollars, cents),
            None => (normalised.as_str(), ""),
        };

        if dollars_str.is_empty() && cents_str.is_empty() {
            return Err(invalid());
        }

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(dollars_str) || !all_digits(cents_str) || cents_str.len() > 2 {
            return Err(invalid());
        }

        let dollars: i64 = if dollars_str.is_empty() {
            0
        } else {
            dollars_str.parse().map_err(|_| invalid())?
        };
        let cents: i64 = match cents_str.len() {
            0 => 0,
            1 => cents_str.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => cents_str.parse().map_err(|_| invalid())?,
        };

        let total = dollars
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .filter(|value| *value <= Money::MAX_INPUT.0)
            .ok_or_else(invalid)?;

        Ok(Money(if is_negative { -total } else { total }))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |total, amount| total + amount)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money)
    }
}
