use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Idr        -----------------------------------------------------------
/// An amount of Indonesian rupiah, in whole rupiah. QRIS settlements are always whole-rupiah amounts, so no
/// sub-unit representation is needed.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Idr(i64);

op!(binary Idr, Add, add);
op!(binary Idr, Sub, sub);
op!(inplace Idr, AddAssign, add_assign);
op!(inplace Idr, SubAssign, sub_assign);
op!(unary Idr, Neg, neg);

impl Sum for Idr {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rupiah: {0}")]
pub struct IdrConversionError(String);

impl From<i64> for Idr {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Idr {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Idr {}

impl TryFrom<u64> for Idr {
    type Error = IdrConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(IdrConversionError(format!("Value {value} is too large to convert to Idr")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Idr {
    type Err = IdrConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self).map_err(|e| IdrConversionError(format!("{s} is not a valid amount. {e}")))
    }
}

impl Display for Idr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rp{}", self.0)
    }
}

impl Idr {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Idr::from(20_000);
        let b = Idr::from(7);
        assert_eq!(a + b, Idr::from(20_007));
        assert_eq!(a - b, Idr::from(19_993));
        assert_eq!(-b, Idr::from(-7));
    }

    #[test]
    fn parsing_and_display() {
        let amount = "20000".parse::<Idr>().unwrap();
        assert_eq!(amount, Idr::from(20_000));
        assert_eq!(amount.to_string(), "Rp20000");
        assert!("not a number".parse::<Idr>().is_err());
    }

    #[test]
    fn positivity() {
        assert!(Idr::from(1).is_positive());
        assert!(!Idr::from(0).is_positive());
        assert!(!Idr::from(-5).is_positive());
    }
}
