use thiserror::Error;

use crate::catalog::CatalogError;
use crate::domain::category::Category;
use crate::session::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("quantity for `{product_name}` must be a positive integer, got {quantity}")]
    InvalidQuantity { product_name: String, quantity: i64 },
    #[error("`{product_name}` is not part of the {category} catalog")]
    UnknownProduct { product_name: String, category: Category },
    #[error("unknown category `{0}` (expected agent|property)")]
    UnknownCategory(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("session has no active category selection")]
    SessionNotInitialized,
    #[error("user input was empty")]
    EmptyInput,
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("model issued {0} tool calls in a single turn")]
    UnsupportedMultiCall(usize),
    #[error("session store failure: {0}")]
    Store(String),
}

impl ApplicationError {
    /// Stable snake_case code, safe to hand to clients alongside the reply text.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidQuantity { .. }) => "invalid_quantity",
            Self::Domain(DomainError::UnknownProduct { .. }) => "unknown_product",
            Self::Domain(DomainError::UnknownCategory(_)) => "unknown_category",
            Self::CatalogUnavailable(_) => "catalog_unavailable",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::SessionNotInitialized => "session_not_initialized",
            Self::EmptyInput => "empty_input",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::UnknownTool(_) => "unknown_tool",
            Self::UnsupportedMultiCall(_) => "unsupported_multi_call",
            Self::Store(_) => "session_store",
        }
    }

    /// Conversational text shown to the end user. Never includes protocol detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(DomainError::InvalidQuantity { product_name, .. }) => format!(
                "The quantity for {product_name} must be at least 1, so your order was not changed."
            ),
            Self::Domain(DomainError::UnknownProduct { product_name, category }) => format!(
                "I couldn't find {product_name} in the {category} catalog, so your order was not changed."
            ),
            Self::Domain(DomainError::UnknownCategory(_)) => {
                "Please choose either Agent or Property.".to_string()
            }
            Self::CatalogUnavailable(_) => {
                "Sorry, I cannot retrieve product information right now. Please select Agent or Property again to retry."
                    .to_string()
            }
            Self::ProviderUnavailable(_) => {
                "Sorry, I'm having trouble reaching the ordering assistant. Please try again in a moment."
                    .to_string()
            }
            Self::SessionNotInitialized => "Please select Agent or Property type first.".to_string(),
            Self::EmptyInput => "Please type a message first.".to_string(),
            Self::InvalidArguments(_) | Self::UnknownTool(_) | Self::UnsupportedMultiCall(_) => {
                "Sorry, I ran into an error retrieving a response. Please try rephrasing your request."
                    .to_string()
            }
            Self::Store(_) => {
                "Sorry, your session could not be updated. Please try again.".to_string()
            }
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Store(value.to_string())
    }
}

impl From<CatalogError> for ApplicationError {
    fn from(value: CatalogError) -> Self {
        Self::CatalogUnavailable(value.to_string())
    }
}
