//! Catalog adapters: the WooCommerce REST listing and an offline JSON snapshot.

pub mod records;
pub mod snapshot;
pub mod woocommerce;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use orderdesk_core::catalog::CatalogProvider;
use orderdesk_core::config::{CatalogConfig, CatalogSource, ConfigError};

pub use records::parse_products;
pub use snapshot::SnapshotCatalog;
pub use woocommerce::WooCommerceCatalog;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not build catalog http client: {0}")]
    Client(String),
}

/// Builds the provider selected by `[catalog]` configuration.
pub fn catalog_provider(
    config: &CatalogConfig,
) -> Result<Arc<dyn CatalogProvider>, StorefrontError> {
    match config.source()? {
        CatalogSource::Snapshot(path) => Ok(Arc::new(SnapshotCatalog::new(path))),
        CatalogSource::WooCommerce { base_url, consumer_key, consumer_secret } => {
            let catalog = WooCommerceCatalog::new(
                &base_url,
                consumer_key,
                consumer_secret,
                config.page_size,
                Duration::from_secs(config.timeout_secs),
            )
            .map_err(|error| StorefrontError::Client(error.to_string()))?;
            Ok(Arc::new(catalog))
        }
    }
}
