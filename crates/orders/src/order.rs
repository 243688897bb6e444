use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::error::messages;
use stockflow_core::{DomainError, DomainResult, Entity, FieldErrors, OrderId, Rule};

use crate::detail::{DetailDraft, DetailInput};

/// Direction of the stock movement an order represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock increases when processed.
    Ingress,
    /// Stock decreases when processed.
    #[default]
    Egress,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Ingress => "INGRESS",
            MovementType::Egress => "EGRESS",
        }
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INGRESS" => Ok(MovementType::Ingress),
            "EGRESS" => Ok(MovementType::Egress),
            other => Err(DomainError::field(
                "movement_type",
                format!("\"{other}\" is not a valid choice."),
            )),
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Draft,
    Processed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(OrderStatus::Draft),
            "PROCESSED" => Ok(OrderStatus::Processed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::field(
                "status",
                format!("\"{other}\" is not a valid choice."),
            )),
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order header. Line items live in [`crate::OrderDetail`] and are loaded separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    movement_type: MovementType,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// New orders always start in `Draft`.
    pub fn create(id: OrderId, movement_type: MovementType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            movement_type,
            status: OrderStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an order from persisted state.
    pub fn restore(
        id: OrderId,
        movement_type: MovementType,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            movement_type,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Only draft orders accept detail changes or processing.
    pub fn is_editable(&self) -> bool {
        matches!(self.status, OrderStatus::Draft)
    }

    pub(crate) fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub(crate) fn ensure_editable(&self) -> DomainResult<()> {
        if !self.is_editable() {
            return Err(Rule::NotEditableOrder.into());
        }
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Raw order creation payload.
///
/// Only `movement_type` and `details` are writable; status and totals are
/// server-owned and are not even representable here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderInput {
    pub movement_type: Option<String>,
    pub details: Option<Vec<DetailInput>>,
}

/// Validated order creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub movement_type: MovementType,
    pub details: Vec<DetailDraft>,
}

impl NewOrder {
    /// `details` is required (it may be empty); `movement_type` defaults to `EGRESS`.
    ///
    /// Field errors are reported first; duplicate products in the payload are a
    /// rule violation.
    pub fn validate(input: OrderInput) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        let movement_type = match input.movement_type.as_deref() {
            None => MovementType::default(),
            Some(raw) => match raw.parse::<MovementType>() {
                Ok(m) => m,
                Err(DomainError::Validation(fields)) => {
                    for msg in fields.get("movement_type").unwrap_or_default() {
                        errors.add("movement_type", msg.clone());
                    }
                    MovementType::default()
                }
                Err(other) => return Err(other),
            },
        };

        let mut details = Vec::new();
        match input.details {
            None => errors.add("details", messages::REQUIRED),
            Some(items) => {
                for (idx, item) in items.into_iter().enumerate() {
                    match DetailDraft::validate(item) {
                        Ok(draft) => details.push(draft),
                        Err(DomainError::Validation(fields)) => {
                            errors.merge_prefixed(&format!("details[{idx}]"), fields)
                        }
                        Err(other) => return Err(other),
                    }
                }
            }
        }

        errors.into_result()?;

        for (idx, draft) in details.iter().enumerate() {
            if details[..idx].iter().any(|d| d.product_id == draft.product_id) {
                return Err(Rule::DuplicatedProduct.into());
            }
        }

        Ok(Self {
            movement_type,
            details,
        })
    }
}
