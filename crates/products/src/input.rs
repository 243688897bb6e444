//! Validation of client-supplied product fields.
//!
//! `stock` is deliberately absent: it is server-owned and only moves through
//! the ledger.

use serde::Deserialize;

use stockflow_core::error::messages;
use stockflow_core::{DomainResult, FieldErrors, Price};

const MAX_NAME_LEN: usize = 256;

/// Raw product fields as received from a caller (all optional).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub available: Option<bool>,
}

/// Validated fields for a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub available: bool,
}

/// Validated changes for an existing product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub available: Option<bool>,
}

impl NewProduct {
    /// `name` and `price` are required; `available` defaults to `false`.
    pub fn validate(input: ProductInput) -> DomainResult<Self> {
        let patch = ProductPatch::for_replace(input)?;
        match (patch.name, patch.price) {
            (Some(name), Some(price)) => Ok(Self {
                name,
                price,
                available: patch.available.unwrap_or(false),
            }),
            // for_replace already reported the missing fields
            _ => Err(required(&["name", "price"])),
        }
    }
}

impl ProductPatch {
    /// Full replacement: `name` and `price` must be present.
    pub fn for_replace(input: ProductInput) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        if input.name.is_none() {
            errors.add("name", messages::REQUIRED);
        }
        if input.price.is_none() {
            errors.add("price", messages::REQUIRED);
        }
        let patch = collect(input, &mut errors);
        errors.into_result()?;
        Ok(patch)
    }

    /// Partial update: only present fields are validated and applied.
    pub fn for_patch(input: ProductInput) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        let patch = collect(input, &mut errors);
        errors.into_result()?;
        Ok(patch)
    }
}

fn collect(input: ProductInput, errors: &mut FieldErrors) -> ProductPatch {
    let name = input.name.and_then(|name| {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            errors.add("name", messages::BLANK);
            None
        } else if trimmed.chars().count() > MAX_NAME_LEN {
            errors.add("name", messages::TOO_LONG);
            None
        } else {
            Some(trimmed.to_string())
        }
    });

    let price = input.price.and_then(|amount| match Price::new(amount) {
        Ok(price) => Some(price),
        Err(stockflow_core::DomainError::Validation(fields)) => {
            for msg in fields.get("price").unwrap_or_default() {
                errors.add("price", msg.clone());
            }
            None
        }
        Err(_) => None,
    });

    ProductPatch {
        name,
        price,
        available: input.available,
    }
}

fn required(fields: &[&str]) -> stockflow_core::DomainError {
    let mut errors = FieldErrors::new();
    for field in fields {
        errors.add(*field, messages::REQUIRED);
    }
    errors.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::DomainError;

    fn fields(err: DomainError) -> FieldErrors {
        match err {
            DomainError::Validation(f) => f,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_name_and_price() {
        let errors = fields(NewProduct::validate(ProductInput::default()).unwrap_err());
        assert_eq!(errors.get("name").unwrap(), [messages::REQUIRED]);
        assert_eq!(errors.get("price").unwrap(), [messages::REQUIRED]);
    }

    #[test]
    fn create_defaults_available_to_false() {
        let product = NewProduct::validate(ProductInput {
            name: Some("Product 1".into()),
            price: Some(20.0),
            available: None,
        })
        .unwrap();
        assert!(!product.available);
    }

    #[test]
    fn negative_price_is_a_field_error() {
        let errors = fields(
            NewProduct::validate(ProductInput {
                name: Some("Product 1".into()),
                price: Some(-1.0),
                available: Some(true),
            })
            .unwrap_err(),
        );
        assert_eq!(errors.get("price").unwrap(), [messages::GREATER_EQUAL_ZERO]);
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn blank_and_oversized_names_are_rejected() {
        let errors = fields(
            ProductPatch::for_patch(ProductInput {
                name: Some("   ".into()),
                ..Default::default()
            })
            .unwrap_err(),
        );
        assert_eq!(errors.get("name").unwrap(), [messages::BLANK]);

        let errors = fields(
            ProductPatch::for_patch(ProductInput {
                name: Some("x".repeat(257)),
                ..Default::default()
            })
            .unwrap_err(),
        );
        assert_eq!(errors.get("name").unwrap(), [messages::TOO_LONG]);
    }

    #[test]
    fn empty_patch_is_valid() {
        assert_eq!(
            ProductPatch::for_patch(ProductInput::default()).unwrap(),
            ProductPatch::default()
        );
    }
}
