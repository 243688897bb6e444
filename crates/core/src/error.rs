//! Domain error model.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Field-level validation messages shared by the input validators.
pub mod messages {
    pub const REQUIRED: &str = "This field is required.";
    pub const BLANK: &str = "This field may not be blank.";
    pub const TOO_LONG: &str = "Ensure this field has no more than 256 characters.";
    pub const GREATER_EQUAL_ZERO: &str = "Value must be greater or equal than zero.";
    pub const GREATER_ZERO: &str = "Value must be greater than zero.";
    pub const NOT_A_NUMBER: &str = "A valid number is required.";
    pub const TOO_LARGE: &str = "Ensure this value is less than or equal to 9223372036854775807.";
    pub const OBJECT_DOES_NOT_EXIST: &str = "Object does not exist.";
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// rule violations, missing resources). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A business rule was violated.
    #[error("{}", .0.message())]
    Rule(Rule),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("{}", .0.not_found_message())]
    NotFound(Resource),
}

impl DomainError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(resource: Resource) -> Self {
        Self::NotFound(resource)
    }

    /// The rule behind this error, if it is a rule violation.
    pub fn rule(&self) -> Option<Rule> {
        match self {
            DomainError::Rule(rule) => Some(*rule),
            _ => None,
        }
    }
}

impl From<Rule> for DomainError {
    fn from(value: Rule) -> Self {
        Self::Rule(value)
    }
}

impl From<FieldErrors> for DomainError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}

/// Business rules whose violation is reported as `{ok: false, message}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    DuplicatedProduct,
    NotEditableOrder,
    ProductNotAvailable,
    StockAvailability,
    CancelStockAvailability,
    InsufficientStock,
    NegativeQuantity,
    AlreadyCancelled,
    ProtectedProduct,
}

impl Rule {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Rule::DuplicatedProduct => "duplicated_product",
            Rule::NotEditableOrder => "not_editable_order",
            Rule::ProductNotAvailable => "product_not_available",
            Rule::StockAvailability => "stock_availability",
            Rule::CancelStockAvailability => "cancel_stock_availability",
            Rule::InsufficientStock => "insufficient_stock",
            Rule::NegativeQuantity => "negative_quantity",
            Rule::AlreadyCancelled => "already_cancelled",
            Rule::ProtectedProduct => "protected_product",
        }
    }

    /// Human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Rule::DuplicatedProduct => "A product is duplicated on the same Order.",
            Rule::NotEditableOrder => "Order cant be modified at this point.",
            Rule::ProductNotAvailable => "The requested product is not available.",
            Rule::StockAvailability => "This order cant be supplied due stock availability.",
            Rule::CancelStockAvailability => {
                "This order cant be cancelled due stock availability."
            }
            Rule::InsufficientStock => "Stock cannot go below zero.",
            Rule::NegativeQuantity => messages::GREATER_EQUAL_ZERO,
            Rule::AlreadyCancelled => "Already cancelled.",
            Rule::ProtectedProduct => {
                "You can't delete this Product because it have some references."
            }
        }
    }
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Resource kinds that can be reported as missing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Product,
    Order,
    OrderDetail,
}

impl Resource {
    pub fn not_found_message(self) -> &'static str {
        match self {
            Resource::Product => "No Product was found for the given id.",
            Resource::Order => "No Order was found for the given id.",
            Resource::OrderDetail => "No Order Detail was found for the given id.",
        }
    }
}

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Nest another set of errors under `prefix` (e.g. `details[0].quantity`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, msgs) in other.0 {
            for msg in msgs {
                self.add(format!("{prefix}.{field}"), msg);
            }
        }
    }

    /// `Ok(())` when no errors were collected.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, msgs) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, msgs.join(" "))?;
        }
        Ok(())
    }
}
