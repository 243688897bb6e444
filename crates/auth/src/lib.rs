//! `stockflow-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: token validation produces claims, and the
//! policy maps `(action, roles)` to allow/deny.

pub mod claims;
pub mod jwt;
pub mod policy;
pub mod principal;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use policy::{Action, AuthzError, authorize, is_allowed};
pub use principal::{Principal, PrincipalId};
pub use roles::Role;
