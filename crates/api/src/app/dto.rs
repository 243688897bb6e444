use serde::Deserialize;
use serde::Serialize;

use stockflow_core::DomainError;

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub available: Option<String>,
}

impl ListProductsQuery {
    /// `?available=` accepts `true/false`, `True/False` and `1/0`.
    pub fn available(&self) -> Result<Option<bool>, DomainError> {
        match self.available.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(DomainError::field(
                    "available",
                    format!("\"{raw}\" is not a valid boolean."),
                )),
            },
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub principal_id: String,
    pub roles: Vec<String>,
}
