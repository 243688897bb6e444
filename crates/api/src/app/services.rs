//! Service wiring: picks the storage backend and rate provider from config.

use std::sync::Arc;

use stockflow_infra::{
    AppConfig, HttpExchangeRateProvider, InMemoryStore, InventoryService, InventoryStore,
    PostgresStore, StorageConfig,
};

pub async fn build_service(config: &AppConfig) -> anyhow::Result<InventoryService> {
    let store: Arc<dyn InventoryStore> = match &config.storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
        StorageConfig::Postgres { database_url } => {
            let store = PostgresStore::connect(database_url).await?;
            store.migrate().await?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
    };

    let rates = Arc::new(HttpExchangeRateProvider::new(config.exchange_rate.clone())?);
    Ok(InventoryService::new(store, rates))
}
