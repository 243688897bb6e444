use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in tokens.
///
/// Roles are opaque strings; only the policy gives them meaning. Unknown roles
/// are kept and simply grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const SUPERUSER: Role = Role(Cow::Borrowed("superuser"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Staff, admin and superuser may manage the product catalog.
    pub fn is_privileged(&self) -> bool {
        matches!(self.as_str(), "staff" | "admin" | "superuser")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
