use serde::{Deserialize, Serialize};

use crate::domain::category::Category;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub price: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl CatalogItem {
    pub fn is_tagged(&self, category: Category) -> bool {
        self.tags.iter().any(|tag| category.matches_tag(tag))
    }
}

/// Catalog narrowed to one category, in provider order. Built once per
/// selection and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilteredCatalog {
    category: Category,
    items: Vec<CatalogItem>,
}

#[derive(Serialize)]
struct CatalogPayload<'a> {
    products: &'a [CatalogItem],
}

impl FilteredCatalog {
    pub fn new(category: Category, items: Vec<CatalogItem>) -> Self {
        Self { category, items }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_product(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    pub fn product_names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }

    /// `{"products": [...]}`, the shape embedded into the system prompt.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&CatalogPayload { products: &self.items })
    }
}
