use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Cents       -----------------------------------------------------------
/// A monetary amount in integer cents. Every price and total in the engine is a sum of these;
/// fractional amounts cannot be represented, so they cannot silently accumulate.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {} is too large to convert to Cents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts whole currency units into cents.
    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_as_decimal() {
        assert_eq!(Cents::from(6500).to_string(), "65.00");
        assert_eq!(Cents::from(509).to_string(), "5.09");
        assert_eq!(Cents::from(-1250).to_string(), "-12.50");
        assert_eq!(Cents::default().to_string(), "0.00");
    }

    #[test]
    fn arithmetic() {
        let a = Cents::from(2000);
        let b = Cents::from(500);
        assert_eq!(a + b, Cents::from(2500));
        assert_eq!(a - b, Cents::from(1500));
        assert_eq!(a * 3, Cents::from(6000));
        assert_eq!(-b, Cents::from(-500));
        let mut c = a;
        c += b;
        assert_eq!(c, Cents::from(2500));
    }

    #[test]
    fn summing_line_totals() {
        let lines = [Cents::from(2000) * 3, Cents::from(500) * 1];
        let total: Cents = lines.into_iter().sum();
        assert_eq!(total, Cents::from(6500));
    }

    #[test]
    fn u64_conversion_guards_overflow() {
        assert!(Cents::try_from(u64::MAX).is_err());
        assert_eq!(Cents::try_from(12345u64).unwrap(), Cents::from(12345));
    }

    #[test]
    fn whole_unit_construction() {
        assert_eq!(Cents::from_whole(65), Cents::from(6500));
        assert_eq!(Cents::from_whole(65).to_string(), "65.00");
        assert_eq!(Cents::from_whole(-3), Cents::from(-300));
    }
}
