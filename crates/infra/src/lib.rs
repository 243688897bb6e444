//! Infrastructure layer: storage backends, configuration, the exchange-rate
//! client and the application services that tie them to the domain crates.

pub mod config;
pub mod external;
pub mod retry;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, ExchangeRateConfig, StorageConfig};
pub use external::HttpExchangeRateProvider;
pub use services::{DetailView, InventoryService, OrderView, ServiceError, ServiceResult};
pub use store::{InMemoryStore, InventoryStore, PostgresStore, StoreError, StoreTx};
