use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::catalog::{CatalogItem, FilteredCatalog};
use crate::domain::category::Category;
use crate::errors::ApplicationError;
use crate::session::store::{load_json, save_json, SessionStore};
use crate::session::CATALOG_CACHE_KEY;

/// One product as the upstream provider lists it, before filtering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog provider unreachable: {0}")]
    Unreachable(String),
    #[error("catalog data malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Returns the provider's listing in its own order. May be truncated at
    /// the provider's page size.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError>;
}

pub struct CatalogFilter {
    provider: Arc<dyn CatalogProvider>,
    store: Arc<dyn SessionStore>,
    cache_ttl_secs: u64,
}

impl CatalogFilter {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        store: Arc<dyn SessionStore>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self { provider, store, cache_ttl_secs }
    }

    pub async fn filter(&self, category: Category) -> Result<FilteredCatalog, ApplicationError> {
        if let Some(records) = self.cached_snapshot().await {
            match filter_snapshot(category, &records) {
                Ok(filtered) => {
                    debug!(
                        event_name = "catalog.filter.cache_hit",
                        category = %category,
                        item_count = filtered.len(),
                        "filtered catalog from cached snapshot"
                    );
                    return Ok(filtered);
                }
                Err(error) => warn!(
                    event_name = "catalog.cache.invalid",
                    error = %error,
                    "cached catalog snapshot rejected, refetching"
                ),
            }
        }

        let records = self.provider.list_products().await.map_err(|error| {
            warn!(
                event_name = "catalog.fetch.failed",
                category = %category,
                error = %error,
                "catalog provider call failed"
            );
            ApplicationError::from(error)
        })?;
        let filtered = filter_snapshot(category, &records)?;

        if let Err(error) =
            save_json(self.store.as_ref(), CATALOG_CACHE_KEY, &records, self.cache_ttl_secs).await
        {
            warn!(
                event_name = "catalog.cache.write_failed",
                error = %error,
                "could not cache catalog snapshot"
            );
        }

        info!(
            event_name = "catalog.filter.fetched",
            category = %category,
            upstream_count = records.len(),
            item_count = filtered.len(),
            "filtered catalog from provider"
        );
        Ok(filtered)
    }

    async fn cached_snapshot(&self) -> Option<Vec<ProductRecord>> {
        match load_json::<Vec<ProductRecord>>(self.store.as_ref(), CATALOG_CACHE_KEY).await {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    event_name = "catalog.cache.read_failed",
                    error = %error,
                    "could not read cached catalog snapshot"
                );
                None
            }
        }
    }
}

/// Keeps records tagged with `category`, in provider order. The first record
/// with a given name wins; later duplicates are dropped.
pub fn filter_snapshot(
    category: Category,
    records: &[ProductRecord],
) -> Result<FilteredCatalog, CatalogError> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for record in records {
        if !record.tags.iter().any(|tag| category.matches_tag(tag)) {
            continue;
        }
        if !seen.insert(record.name.as_str()) {
            continue;
        }

        items.push(CatalogItem {
            name: record.name.clone(),
            price: format_price(&record.price).map_err(|error| match error {
                CatalogError::Malformed(detail) => {
                    CatalogError::Malformed(format!("product `{}`: {detail}", record.name))
                }
                other => other,
            })?,
            categories: record.categories.clone(),
            tags: record.tags.clone(),
        });
    }

    Ok(FilteredCatalog::new(category, items))
}

pub fn format_price(raw: &str) -> Result<String, CatalogError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok("$0.00".to_string());
    }

    let amount = Decimal::from_str(raw)
        .map_err(|error| CatalogError::Malformed(format!("price `{raw}`: {error}")))?;
    let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(format!("${amount:.2}"))
}
