//! Voting weight.
//!
//! A single validator's weight is a fixed-point integer (u128 raw units). The
//! canonical string form is the base-10 raw value; it is what crosses the
//! election-manager boundary. Sums of weights are [`WeightTotal`], which is
//! unbounded so totals and scaled quorum comparisons never lose precision.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};
use std::str::FromStr;

use crate::TypesError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Weight(u128);

impl Weight {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Weight {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|e| TypesError::InvalidWeight(format!("{s}: {e}")))
    }
}

impl From<u128> for Weight {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

/// Exact sum of any number of weights.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeightTotal(BigUint);

impl WeightTotal {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `None` once the total no longer fits a single weight.
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Lossy, for logging ratios.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }

    /// `ceil(self / divisor)`. Panics on a zero divisor like integer division.
    pub fn div_ceil(&self, divisor: u32) -> Self {
        let divisor = BigUint::from(divisor);
        Self((&self.0 + &divisor - 1u32) / divisor)
    }
}

impl From<Weight> for WeightTotal {
    fn from(weight: Weight) -> Self {
        Self(BigUint::from(weight.0))
    }
}

impl From<u128> for WeightTotal {
    fn from(raw: u128) -> Self {
        Self(BigUint::from(raw))
    }
}

impl Add<Weight> for WeightTotal {
    type Output = Self;
    fn add(self, rhs: Weight) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for &WeightTotal {
    type Output = WeightTotal;
    fn mul(self, rhs: u32) -> WeightTotal {
        WeightTotal(&self.0 * rhs)
    }
}

impl Sum<Weight> for WeightTotal {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Weight> for WeightTotal {
    fn sum<I: Iterator<Item = &'a Weight>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for WeightTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
