//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, messages};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Unit price of a product. Always finite and non-negative.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl ValueObject for Price {}

impl Price {
    pub const ZERO: Price = Price(0.0);

    /// Validate a raw amount. Errors are reported against the `price` field.
    pub fn new(amount: f64) -> DomainResult<Self> {
        if !amount.is_finite() {
            return Err(DomainError::field("price", messages::NOT_A_NUMBER));
        }
        if amount < 0.0 {
            return Err(DomainError::field("price", messages::GREATER_EQUAL_ZERO));
        }
        Ok(Self(amount))
    }

    pub fn amount(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for f64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero_and_positive_amounts() {
        assert_eq!(Price::new(0.0).unwrap(), Price::ZERO);
        assert_eq!(Price::new(99.5).unwrap().amount(), 99.5);
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        let err = Price::new(-1.0).unwrap_err();
        match err {
            DomainError::Validation(fields) => {
                assert_eq!(fields.get("price").unwrap(), [messages::GREATER_EQUAL_ZERO]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(Price::new(f64::NAN).is_err());
        assert!(Price::new(f64::INFINITY).is_err());
    }

    #[test]
    fn deserialization_goes_through_validation() {
        assert!(serde_json::from_str::<Price>("-5").is_err());
        assert_eq!(serde_json::from_str::<Price>("12.5").unwrap().amount(), 12.5);
    }
}
