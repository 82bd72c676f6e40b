//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing or combining a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// The value is zero or negative.
    #[error("quantity must be a positive integer (got {0})")]
    NotPositive(i64),
    /// The value does not fit the store's integer column.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Largest accepted quantity.
        max: u32,
        /// Offending value.
        got: i64,
    },
    /// Merging two quantities would exceed the maximum.
    #[error("quantity overflow when merging cart lines")]
    Overflow,
}

/// A strictly positive item count.
///
/// Capped at `i32::MAX` so every quantity can be stored in a Postgres
/// `INTEGER` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a single cart line may hold.
    #[allow(clippy::cast_sign_loss)] // i32::MAX is positive
    pub const MAX: u32 = i32::MAX as u32;

    /// A quantity of one.
    pub const ONE: Self = Self(1);

    /// Validate an integer quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for `value <= 0` and
    /// `QuantityError::TooLarge` above [`Quantity::MAX`].
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive(value));
        }
        u32::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(QuantityError::TooLarge {
                max: Self::MAX,
                got: value,
            })
    }

    /// Returns the count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the count as a signed database integer.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // bounded by Quantity::MAX
    pub const fn as_i32(&self) -> i32 {
        self.0 as i32
    }

    /// Sum two quantities, as done when the same product is added twice.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::Overflow` if the sum exceeds [`Quantity::MAX`].
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(QuantityError::Overflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}
