use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const EUR_CURRENCY_CODE: &str = "EUR";
pub const EUR_CURRENCY_CODE_LOWER: &str = "eur";

//--------------------------------------      EurCents       ---------------------------------------------------------
/// An amount of money in Euro cents. All financial arithmetic in the gateway happens on this
/// type, so amounts never touch floating point.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct EurCents(i64);

op!(binary EurCents, Add, add);
op!(binary EurCents, Sub, sub);
op!(inplace EurCents, AddAssign, add_assign);
op!(inplace EurCents, SubAssign, sub_assign);
op!(unary EurCents, Neg, neg);

impl Mul<i64> for EurCents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.0 * rhs)
    }
}

impl Sum for EurCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Euro cents: {0}")]
pub struct EurConversionError(String);

impl From<i64> for EurCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for EurCents {
    type Error = EurConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(EurConversionError(format!("Value {value} is too large to convert to EurCents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl PartialEq for EurCents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for EurCents {}

impl Display for EurCents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let euros = self.0 as f64 / 100.0;
        write!(f, "{euros:0.2}€")
    }
}

impl EurCents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

//--------------------------------------    CommissionRate   ---------------------------------------------------------
/// A commission rate in basis points (1500 = 15%). Stored on each commission as a snapshot of
/// the creator's rate at creation time.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct CommissionRate(i64);

#[derive(Debug, Clone, Error)]
#[error("Invalid commission rate: {0} basis points. Rates must lie in 0..=10000.")]
pub struct RateError(i64);

impl CommissionRate {
    pub fn from_basis_points(bps: i64) -> Result<Self, RateError> {
        if (0..=10_000).contains(&bps) {
            Ok(Self(bps))
        } else {
            Err(RateError(bps))
        }
    }

    pub fn basis_points(&self) -> i64 {
        self.0
    }

    /// Applies the rate to an amount, rounding half away from zero.
    pub fn apply(&self, amount: EurCents) -> EurCents {
        let scaled = amount.value() * self.0;
        let quotient = scaled / 10_000;
        let remainder = scaled % 10_000;
        let adjust = if remainder.abs() * 2 >= 10_000 { scaled.signum() } else { 0 };
        EurCents::from(quotient + adjust)
    }
}

impl Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pct = self.0 as f64 / 100.0;
        write!(f, "{pct:0.2}%")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rate_application_rounds_half_away_from_zero() {
        let rate = CommissionRate::from_basis_points(1500).unwrap();
        assert_eq!(rate.apply(EurCents::from(10_000)), EurCents::from(1_500));
        // 3.33 * 15% = 0.4995 -> 0.50
        assert_eq!(rate.apply(EurCents::from(333)), EurCents::from(50));
        // 0.03 * 15% = 0.0045 -> 0.00
        assert_eq!(rate.apply(EurCents::from(3)), EurCents::from(0));
        assert_eq!(rate.apply(EurCents::from(-10_000)), EurCents::from(-1_500));
    }

    #[test]
    fn rate_bounds() {
        assert!(CommissionRate::from_basis_points(0).is_ok());
        assert!(CommissionRate::from_basis_points(10_000).is_ok());
        assert!(CommissionRate::from_basis_points(-1).is_err());
        assert!(CommissionRate::from_basis_points(10_001).is_err());
    }

    #[test]
    fn display_formats() {
        assert_eq!(EurCents::from(1234).to_string(), "12.34€");
        assert_eq!(EurCents::from(-5).to_string(), "-0.05€");
        assert_eq!(CommissionRate::from_basis_points(1500).unwrap().to_string(), "15.00%");
    }
}
