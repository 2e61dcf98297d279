use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use orderdesk_core::catalog::{CatalogError, CatalogProvider, ProductRecord};

use crate::records::parse_products;

const PRODUCTS_PATH: &str = "/wp-json/wc/v3/products";

/// Published products from the WooCommerce REST API, first page only.
///
/// The listing is capped at `page_size` items; anything past the first page is
/// never seen by the assistant.
pub struct WooCommerceCatalog {
    client: Client,
    products_url: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
    page_size: u32,
}

impl WooCommerceCatalog {
    pub fn new(
        base_url: &str,
        consumer_key: SecretString,
        consumer_secret: SecretString,
        page_size: u32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            products_url: format!("{}{PRODUCTS_PATH}", base_url.trim_end_matches('/')),
            consumer_key,
            consumer_secret,
            page_size,
        })
    }

    pub fn products_url(&self) -> &str {
        &self.products_url
    }
}

#[async_trait]
impl CatalogProvider for WooCommerceCatalog {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
        let response = self
            .client
            .get(&self.products_url)
            .query(&[("per_page", self.page_size.to_string()), ("status", "publish".to_string())])
            .basic_auth(
                self.consumer_key.expose_secret(),
                Some(self.consumer_secret.expose_secret()),
            )
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "catalog.woocommerce.request_failed",
                    error = %error,
                    timeout = error.is_timeout(),
                    "woocommerce product request failed"
                );
                CatalogError::Unreachable(format!("woocommerce request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Unreachable(format!("woocommerce returned {status}")));
        }

        let body = response.text().await.map_err(|error| {
            CatalogError::Unreachable(format!("could not read woocommerce response: {error}"))
        })?;
        let records = parse_products(&body)?;

        if records.len() >= self.page_size as usize {
            warn!(
                event_name = "catalog.woocommerce.page_full",
                page_size = self.page_size,
                "product listing filled a whole page and may be truncated"
            );
        }
        info!(
            event_name = "catalog.woocommerce.fetched",
            product_count = records.len(),
            "woocommerce products fetched"
        );
        Ok(records)
    }
}
