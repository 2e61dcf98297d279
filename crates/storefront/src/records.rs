use serde::Deserialize;
use serde_json::Value;

use orderdesk_core::catalog::{CatalogError, ProductRecord};

/// A category or tag reference. WooCommerce sends `{ "id", "name", "slug" }`
/// objects; hand-written snapshots may use bare names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TermRef {
    Name(String),
    Object { name: String },
}

impl TermRef {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListedProduct {
    name: String,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    categories: Vec<TermRef>,
    #[serde(default)]
    tags: Option<Vec<TermRef>>,
}

/// Decodes a product listing body into provider-ordered records.
pub fn parse_products(body: &str) -> Result<Vec<ProductRecord>, CatalogError> {
    let listed: Vec<ListedProduct> = serde_json::from_str(body)
        .map_err(|error| CatalogError::Malformed(format!("product listing: {error}")))?;

    listed.into_iter().map(into_record).collect()
}

fn into_record(product: ListedProduct) -> Result<ProductRecord, CatalogError> {
    let price = match product.price {
        Value::Null => String::new(),
        Value::String(price) => price,
        Value::Number(price) => price.to_string(),
        other => {
            return Err(CatalogError::Malformed(format!(
                "product `{}` has a non-scalar price: {other}",
                product.name
            )))
        }
    };

    Ok(ProductRecord {
        name: product.name,
        price,
        categories: product.categories.into_iter().map(TermRef::into_name).collect(),
        tags: product.tags.unwrap_or_default().into_iter().map(TermRef::into_name).collect(),
    })
}
