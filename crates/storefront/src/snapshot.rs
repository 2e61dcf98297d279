use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use orderdesk_core::catalog::{CatalogError, CatalogProvider, ProductRecord};

use crate::records::parse_products;

/// Reads the catalog from a JSON file on every call.
pub struct SnapshotCatalog {
    path: PathBuf,
}

impl SnapshotCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogProvider for SnapshotCatalog {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            CatalogError::Unreachable(format!(
                "could not read catalog snapshot `{}`: {error}",
                self.path.display()
            ))
        })?;

        let records = parse_products(&body)?;
        debug!(
            event_name = "catalog.snapshot.loaded",
            path = %self.path.display(),
            product_count = records.len(),
            "catalog snapshot loaded"
        );
        Ok(records)
    }
}
