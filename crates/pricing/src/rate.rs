//! Exchange-rate provider seam and the rate payload format.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure to obtain a usable exchange rate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateError {
    /// Transport failure, timeout or non-success status.
    #[error("We can't get exchange rate from service. ({0})")]
    Unavailable(String),

    /// The payload does not have the expected shape.
    #[error("Wrong format on exchange response.")]
    Malformed,

    /// No entry carries the configured name.
    #[error("Expected change not found.")]
    NotFound,

    /// Zero, negative or non-finite rate.
    #[error("invalid exchange rate: {0}")]
    InvalidRate(f64),
}

/// Source of the local-currency-per-USD rate.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn fetch_rate(&self) -> Result<f64, RateError>;
}

/// Constant rate. Used by tests and offline setups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRate(pub f64);

#[async_trait]
impl ExchangeRateProvider for FixedRate {
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        Ok(self.0)
    }
}

/// Pick the `compra` value of the entry named `entry` from a rate payload.
///
/// The payload is an array of `{"casa": {"nombre": .., "compra": ..}}`.
/// Entries are checked in order; a malformed entry before the match fails the
/// whole payload. `compra` may use a decimal comma.
pub fn parse_rate(body: &[u8], entry: &str) -> Result<f64, RateError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| RateError::Malformed)?;
    let items = payload.as_array().ok_or(RateError::Malformed)?;

    for item in items {
        let casa = item
            .get("casa")
            .filter(|c| c.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or(RateError::Malformed)?;
        let (Some(name), Some(buy)) = (casa.get("nombre"), casa.get("compra")) else {
            return Err(RateError::Malformed);
        };
        if name.as_str() != Some(entry) {
            continue;
        }
        let rate = match buy {
            Value::String(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| RateError::Malformed)?,
            Value::Number(n) => n.as_f64().ok_or(RateError::Malformed)?,
            _ => return Err(RateError::Malformed),
        };
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::InvalidRate(rate));
        }
        return Ok(rate);
    }

    Err(RateError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: &str = "Dolar Blue";

    #[test]
    fn picks_named_entry_with_decimal_comma() {
        let body = br#"[
            {"casa": {"nombre": "Dolar Oficial", "compra": "95,50"}},
            {"casa": {"nombre": "Dolar Blue", "compra": "150,25"}}
        ]"#;
        assert_eq!(parse_rate(body, BLUE).unwrap(), 150.25);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let body = br#"[{"casa": {"nombre": "Dolar Oficial", "compra": "95,50"}}]"#;
        assert_eq!(parse_rate(body, BLUE), Err(RateError::NotFound));
    }

    #[test]
    fn shape_errors_are_malformed() {
        for body in [
            &br#"{"casa": {}}"#[..],
            br#"[{"other": 1}]"#,
            br#"[{"casa": {}}]"#,
            br#"[{"casa": {"nombre": "Dolar Blue"}}]"#,
            br#"[{"casa": {"nombre": "Dolar Blue", "compra": "n/a"}}]"#,
            b"not json",
        ] {
            assert_eq!(parse_rate(body, BLUE), Err(RateError::Malformed));
        }
    }

    #[test]
    fn zero_rate_is_rejected() {
        let body = br#"[{"casa": {"nombre": "Dolar Blue", "compra": "0"}}]"#;
        assert!(matches!(parse_rate(body, BLUE), Err(RateError::InvalidRate(_))));
    }

    #[tokio::test]
    async fn fixed_rate_returns_its_value() {
        assert_eq!(FixedRate(2.0).fetch_rate().await.unwrap(), 2.0);
    }
}
