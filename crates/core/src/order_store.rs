use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::context::load_live_context;
use crate::domain::order::{Order, OrderLine, EMPTY_ORDER_SUMMARY};
use crate::domain::tool_call::ToolCall;
use crate::errors::{ApplicationError, DomainError};
use crate::session::store::{load_json, save_json, SessionStore, StoreError};
use crate::session::SessionId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderOutcome {
    Added(OrderLine),
    Removed(OrderLine),
    NotFound { product_name: String },
}

/// The authoritative order for each session, stored beside its system context.
pub struct OrderStore {
    store: Arc<dyn SessionStore>,
}

impl OrderStore {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Applies one validated tool call. Every rejection leaves the stored
    /// order untouched, and writes keep the system context's expiry.
    pub async fn apply(
        &self,
        session: &SessionId,
        call: &ToolCall,
    ) -> Result<OrderOutcome, ApplicationError> {
        let store = self.store.as_ref();
        let now = Utc::now();
        let context = load_live_context(store, session)
            .await?
            .ok_or(ApplicationError::SessionNotInitialized)?;
        let ttl_secs =
            context.remaining_ttl_secs(now).ok_or(ApplicationError::SessionNotInitialized)?;
        let mut order = load_json::<Order>(store, &session.order_key())
            .await?
            .ok_or(ApplicationError::SessionNotInitialized)?;

        let outcome = match call {
            ToolCall::AddToOrder { product_name, quantity } => {
                let quantity = positive_quantity(product_name, *quantity)?;
                if !context.offers_product(product_name) {
                    return Err(DomainError::UnknownProduct {
                        product_name: product_name.clone(),
                        category: context.category,
                    }
                    .into());
                }

                let line =
                    OrderLine { product_name: product_name.clone(), quantity, added_at: now };
                OrderOutcome::Added(order.upsert(line).clone())
            }
            ToolCall::RemoveFromOrder { product_name } => match order.remove(product_name) {
                Some(line) => OrderOutcome::Removed(line),
                None => {
                    debug!(
                        event_name = "order.remove.not_found",
                        session_id = %session,
                        product_name = %product_name,
                        "remove requested for a product not in the order"
                    );
                    return Ok(OrderOutcome::NotFound { product_name: product_name.clone() });
                }
            },
        };

        save_json(store, &session.order_key(), &order, ttl_secs).await?;
        info!(
            event_name = "order.updated",
            session_id = %session,
            tool = %call.name(),
            product_name = %call.product_name(),
            line_count = order.len(),
            "order updated from tool call"
        );
        Ok(outcome)
    }

    /// An owned copy of the current order; empty when absent or expired.
    pub async fn snapshot(&self, session: &SessionId) -> Result<Order, ApplicationError> {
        Ok(self.live_order(session).await?.unwrap_or_default())
    }

    pub async fn summarize(&self, session: &SessionId) -> Result<String, ApplicationError> {
        let order = self.live_order(session).await?;
        Ok(order.map_or_else(|| EMPTY_ORDER_SUMMARY.to_string(), |order| order.summary()))
    }

    /// The stored order, but only while its system context is still live.
    async fn live_order(&self, session: &SessionId) -> Result<Option<Order>, StoreError> {
        let store = self.store.as_ref();
        if load_live_context(store, session).await?.is_none() {
            return Ok(None);
        }
        load_json::<Order>(store, &session.order_key()).await
    }
}

fn positive_quantity(product_name: &str, quantity: i64) -> Result<u32, DomainError> {
    u32::try_from(quantity).ok().filter(|quantity| *quantity > 0).ok_or_else(|| {
        DomainError::InvalidQuantity { product_name: product_name.to_string(), quantity }
    })
}
