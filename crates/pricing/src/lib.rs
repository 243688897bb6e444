//! Order totals and currency conversion.
//!
//! Totals are a pure function of the current lines. The USD figure divides by
//! a rate obtained from an [`ExchangeRateProvider`]; the HTTP implementation
//! lives in the infra crate.

pub mod calculator;
pub mod rate;

pub use calculator::{total, usd_total};
pub use rate::{ExchangeRateProvider, FixedRate, RateError, parse_rate};
