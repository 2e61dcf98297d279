//! Session and order orchestration core for the conversational ordering assistant.
//!
//! The pipeline runs in one direction:
//! - `session::gate` decides which buyer category is active,
//! - `catalog` narrows the product listing to that category,
//! - `context` seeds the system prompt and resets the order,
//! - `order_store` applies validated tool calls to the live order.
//!
//! Everything session-scoped lives in a `SessionStore` keyed by `SessionId` and
//! expires passively with a fixed TTL window.

pub mod catalog;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod order_store;
pub mod session;

pub use catalog::{CatalogError, CatalogFilter, CatalogProvider, ProductRecord};
pub use context::{ContextBuilder, SystemContext};
pub use domain::catalog::{CatalogItem, FilteredCatalog};
pub use domain::category::Category;
pub use domain::order::{Order, OrderLine, EMPTY_ORDER_SUMMARY};
pub use domain::tool_call::{ToolCall, ToolName};
pub use errors::{ApplicationError, DomainError};
pub use order_store::{OrderOutcome, OrderStore};
pub use session::gate::{GateState, GateTransition, SessionGate};
pub use session::store::{InMemorySessionStore, SessionStore, StoreError};
pub use session::SessionId;
