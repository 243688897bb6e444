use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Role;

/// Identity of an authenticated caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// An authenticated caller as seen by authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { id, roles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_ids_serialize_as_their_display_form() {
        let id = PrincipalId::new();
        assert_eq!(serde_json::to_value(id).unwrap(), id.to_string());
        let back: PrincipalId = serde_json::from_value(serde_json::to_value(id).unwrap()).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(PrincipalId::new(), PrincipalId::default());
    }
}
