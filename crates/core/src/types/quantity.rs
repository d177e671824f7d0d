//! Requested quantity for cart adds and updates.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero is never a valid line quantity; removal deletes the line instead.
    #[error("quantity must be at least {min}")]
    TooSmall {
        /// Smallest accepted quantity.
        min: u32,
    },
    /// Above the per-line limit.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Largest accepted quantity.
        max: u32,
        /// The rejected value.
        got: u32,
    },
}

/// Units requested by a single add or update, always within `1..=100`.
///
/// Cart lines returned by the backend can exceed this after merges and use a
/// plain non-zero count instead.
///
/// ```
/// use vivias_core::Quantity;
///
/// assert!(Quantity::new(1).is_ok());
/// assert!(Quantity::new(100).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest quantity a line can hold.
    pub const MIN: u32 = 1;
    /// Largest quantity a single add or update may request.
    pub const MAX: u32 = 100;
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooSmall` for 0 and `QuantityError::TooLarge`
    /// above [`Quantity::MAX`].
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value < Self::MIN {
            return Err(QuantityError::TooSmall { min: Self::MIN });
        }
        if value > Self::MAX {
            return Err(QuantityError::TooLarge {
                max: Self::MAX,
                got: value,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl From<Quantity> for NonZeroU32 {
    fn from(quantity: Quantity) -> Self {
        // The value is at least one, so the addition never saturates
        Self::MIN.saturating_add(quantity.0 - 1)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(Quantity::new(0), Err(QuantityError::TooSmall { min: 1 }));
        assert_eq!(Quantity::new(1).unwrap().get(), 1);
        assert_eq!(Quantity::new(100).unwrap().get(), 100);
        assert_eq!(
            Quantity::new(101),
            Err(QuantityError::TooLarge { max: 100, got: 101 })
        );
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().get(), 3);
    }

    #[test]
    fn test_into_non_zero() {
        let quantity = Quantity::new(60).unwrap();
        assert_eq!(NonZeroU32::from(quantity).get(), 60);
        assert_eq!(NonZeroU32::from(Quantity::ONE), NonZeroU32::MIN);
    }

    #[test]
    fn test_default_is_one() {
        assert_eq!(Quantity::default(), Quantity::ONE);
    }
}
