//! Provides a safe, self-contained type for representing prices.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::ops::AddAssign;

use num_traits::CheckedAdd;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

/// Number of decimal digits carried by every [`Money`] amount (cents).
pub const DECIMALS: u32 = 2;

/// An error that can occur when parsing a string into a `Money` amount.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseMoneyError {
    /// The string is not in a valid numeric format (e.g., "abc", "1.2.3").
    #[error("invalid price format")]
    InvalidFormat,
    /// The string has more decimal places than a price supports (e.g., "1.234").
    #[error("too many decimal places for a price")]
    TooManyDecimals,
}

/// A monetary value in the store's currency.
///
/// Internally, the amount is stored as a signed 64-bit integer of minor units
/// (cents) to prevent floating-point inaccuracies when summing a cart. On the
/// wire it travels as a plain JSON number, which is what the backend speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    amount: i64,
}

impl Money {
    pub const ZERO: Money = Money { amount: 0 };

    /// Returns the raw amount in minor units (cents).
    pub fn as_minor_units(&self) -> i64 {
        self.amount
    }

    /// Returns the amount as a float, for wire encoding.
    pub fn as_float(&self) -> f64 {
        self.amount as f64 / 10_f64.powi(DECIMALS as i32)
    }

    /// Creates a new `Money` from a floating-point value, typically from an API.
    ///
    /// The float is rounded to the nearest minor unit.
    ///
    /// # Examples
    /// ```
    /// use api::money::Money;
    /// let amount = Money::new_from_float(123.456);
    /// assert_eq!(amount.as_minor_units(), 12346);
    /// ```
    pub fn new_from_float(value: f64) -> Self {
        let multiplier = 10_f64.powi(DECIMALS as i32);
        let amount = (value * multiplier).round() as i64;

        Self { amount }
    }

    /// Creates a new `Money` directly from minor units.
    ///
    /// # Example
    /// ```
    /// use api::money::Money;
    /// let amount = Money::new_from_minor(12345);
    /// assert_eq!(amount.to_string(), "123.45");
    /// ```
    pub fn new_from_minor(amount: i64) -> Self {
        Self { amount }
    }

    /// Creates a new `Money` by parsing user input such as `"19.9"` or `"5"`.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Examples
    /// ```
    /// use api::money::{Money, ParseMoneyError};
    /// let amount = Money::new_from_str("123.45").unwrap();
    /// assert_eq!(amount.as_minor_units(), 12345);
    ///
    /// let err = Money::new_from_str("1.234").unwrap_err();
    /// assert_eq!(err, ParseMoneyError::TooManyDecimals);
    /// ```
    pub fn new_from_str(s: &str) -> Result<Self, ParseMoneyError> {
        let s = s.trim();

        let (is_negative, s) = if let Some(stripped) = s.strip_prefix('-') {
            (true, stripped)
        } else {
            (false, s)
        };

        let mut parts = s.split('.');
        let major_str = parts.next().unwrap_or("");
        let minor_str = parts.next().unwrap_or("");

        if parts.next().is_some() || (major_str.is_empty() && minor_str.is_empty()) {
            return Err(ParseMoneyError::InvalidFormat);
        }

        if minor_str.len() > DECIMALS as usize {
            return Err(ParseMoneyError::TooManyDecimals);
        }

        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !digits_only(major_str) || !digits_only(minor_str) {
            return Err(ParseMoneyError::InvalidFormat);
        }

        let major_units = if major_str.is_empty() {
            0
        } else {
            major_str
                .parse::<i64>()
                .map_err(|_| ParseMoneyError::InvalidFormat)?
        };

        let minor_units = if minor_str.is_empty() {
            0
        } else {
            minor_str
                .parse::<i64>()
                .map_err(|_| ParseMoneyError::InvalidFormat)?
        };

        let scaling_factor = 10_i64.pow(DECIMALS - minor_str.len() as u32);
        let scaled_minor_units = minor_units
            .checked_mul(scaling_factor)
            .ok_or(ParseMoneyError::InvalidFormat)?;

        let mut total_minor_units = major_units
            .checked_mul(10_i64.pow(DECIMALS))
            .ok_or(ParseMoneyError::InvalidFormat)?
            .checked_add(scaled_minor_units)
            .ok_or(ParseMoneyError::InvalidFormat)?;

        if is_negative {
            total_minor_units = -total_minor_units;
        }

        Ok(Self::new_from_minor(total_minor_units))
    }

    /// Multiplies a unit price by a quantity. Returns `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Self> {
        self.amount
            .checked_mul(i64::from(quantity))
            .map(Self::new_from_minor)
    }

    /// Formats the amount with a dollar sign (e.g., "$25.34").
    pub fn to_string_with_symbol(&self) -> String {
        format!("${}", self)
    }
}

/// Formats the amount as a numeric string with two decimals (e.g., "25.34").
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = 10_i64.pow(DECIMALS);
        let sign = if self.amount < 0 { "-" } else { "" };
        let major_units = (self.amount / divisor).abs();
        let minor_units = self.amount.abs() % divisor;

        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            major_units,
            minor_units,
            width = DECIMALS as usize
        )
    }
}

/// Saturates at the bounds of `i64` minor units.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            amount: self.amount.saturating_add(rhs.amount),
        }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Implements checked addition. Returns `None` if the addition overflows.
impl CheckedAdd for Money {
    fn checked_add(&self, v: &Self) -> Option<Self> {
        self.amount
            .checked_add(v.amount)
            .map(|amount| Self { amount })
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_float())
    }
}

/// Field decoder for prices that must not be negative.
pub fn deserialize_non_negative<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Money, D::Error> {
    let price = Money::deserialize(deserializer)?;
    if price.amount < 0 {
        return Err(serde::de::Error::custom(format!(
            "price must not be negative, got {price}"
        )));
    }
    Ok(price)
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("price must be a finite number"));
        }
        Ok(Money::new_from_float(value))
    }
}
