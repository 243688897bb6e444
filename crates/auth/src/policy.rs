//! Explicit authorization policy: `(action, roles) -> allow/deny`.

use thiserror::Error;

use crate::{Principal, Role};

/// Everything an authenticated caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ReadProducts,
    WriteProducts,
    ReadOrders,
    WriteOrders,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ReadProducts => "products.read",
            Action::WriteProducts => "products.write",
            Action::ReadOrders => "orders.read",
            Action::WriteOrders => "orders.write",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{0}' requires a staff, admin or superuser role")]
    Forbidden(&'static str),
}

/// Product writes need one privileged role; everything else only needs an
/// authenticated caller, which the token check already established.
pub fn is_allowed(action: Action, roles: &[Role]) -> bool {
    match action {
        Action::WriteProducts => roles.iter().any(Role::is_privileged),
        Action::ReadProducts | Action::ReadOrders | Action::WriteOrders => true,
    }
}

pub fn authorize(principal: &Principal, action: Action) -> Result<(), AuthzError> {
    if is_allowed(action, &principal.roles) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(action.as_str()))
    }
}
