//! Money in integer minor-currency units.
//!
//! Every amount in the storefront is a whole number of cents. Floating point
//! never touches a price: arithmetic stays in `u64` and conversion to a
//! decimal only happens for display.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in US cents.
///
/// Serializes as a bare integer (`1000` for $10.00), which is the wire
/// format of `priceInCents`, `unitPriceInCents` and `totalInCents`.
///
/// ```
/// use nut_barn_core::Price;
///
/// let bag = Price::from_cents(1000);
/// assert_eq!(bag.times(2).to_string(), "$20.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// A price of zero cents.
    pub const ZERO: Self = Self(0);

    /// Create a price from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Multiply a unit price by a quantity.
    ///
    /// Saturates instead of wrapping; no realistic cart gets near `u64::MAX` cents.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// The amount in dollars as a two-place decimal (`1050` -> `10.50`).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), 2)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal())
    }
}
