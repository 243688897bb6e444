use stockflow_auth::{Principal, PrincipalId, Role};

/// Authenticated caller of the current request, set by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self {
            principal: Principal::new(principal_id, roles),
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.id
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
