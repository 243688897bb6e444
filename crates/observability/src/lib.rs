//! Process-wide tracing setup shared by the binaries and tests.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing using `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| LogFormat::parse(&raw))
        .unwrap_or_default();
    tracing::init(format);
}
