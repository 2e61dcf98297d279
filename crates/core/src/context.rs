use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::info;

use crate::domain::catalog::FilteredCatalog;
use crate::domain::category::Category;
use crate::domain::order::Order;
use crate::errors::ApplicationError;
use crate::session::store::{expiry_after, load_json, save_json, SessionStore, StoreError};
use crate::session::SessionId;

pub const SYSTEM_ROLE: &str = "system";

const PERSONA_TEMPLATE: &str = "You are a Real Estate Marketing Assistant \
helping with {{ category }} marketing orders.

Your primary functions:
1. Help customers choose appropriate marketing materials
2. Provide clear product recommendations based on needs
3. Answer questions about product specifications and pricing
4. Track order items as customers request them

When discussing products:
- Be concise but informative
- Group by category (Print Marketing, Photography, Video) when relevant
- Use exact product names and prices
- Focus on key features and benefits

Available products: {{ catalog_json }}";

/// The system-role instruction block seeded for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContext {
    pub role: String,
    pub content: String,
    pub category: Category,
    pub product_names: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SystemContext {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whole seconds left in the window, `None` once it has closed.
    pub fn remaining_ttl_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let remaining = (self.expires_at - now).num_seconds();
        u64::try_from(remaining).ok().filter(|secs| *secs > 0)
    }

    pub fn offers_product(&self, product_name: &str) -> bool {
        self.product_names.iter().any(|name| name == product_name)
    }
}

pub struct ContextBuilder {
    store: Arc<dyn SessionStore>,
    ttl_secs: u64,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn SessionStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Replaces the session's system context and empties its order, opening a
    /// fresh TTL window for both. Nothing from a previous selection survives.
    /// On error the caller must [`clear`](Self::clear) the session.
    pub async fn initialize(
        &self,
        session: &SessionId,
        catalog: &FilteredCatalog,
    ) -> Result<SystemContext, ApplicationError> {
        let category = catalog.category();
        let content = render_persona(catalog)?;
        let issued_at = Utc::now();
        let context = SystemContext {
            role: SYSTEM_ROLE.to_string(),
            content,
            category,
            product_names: catalog.product_names(),
            issued_at,
            expires_at: expiry_after(issued_at, self.ttl_secs),
        };

        // Order first: a failed context write must never leave a new context
        // beside the previous order.
        let store = self.store.as_ref();
        save_json(store, &session.order_key(), &Order::new(), self.ttl_secs).await?;
        save_json(store, &session.system_context_key(), &context, self.ttl_secs).await?;

        info!(
            event_name = "session.context.initialized",
            session_id = %session,
            category = %category,
            item_count = catalog.len(),
            "system context seeded and order reset"
        );
        Ok(context)
    }

    pub async fn current(
        &self,
        session: &SessionId,
    ) -> Result<Option<SystemContext>, ApplicationError> {
        Ok(load_live_context(self.store.as_ref(), session).await?)
    }

    pub async fn clear(&self, session: &SessionId) -> Result<(), ApplicationError> {
        self.store.delete(&session.system_context_key()).await?;
        self.store.delete(&session.order_key()).await?;
        info!(
            event_name = "session.context.cleared",
            session_id = %session,
            "session data cleared"
        );
        Ok(())
    }
}

pub(crate) async fn load_live_context(
    store: &dyn SessionStore,
    session: &SessionId,
) -> Result<Option<SystemContext>, StoreError> {
    let context = load_json::<SystemContext>(store, &session.system_context_key()).await?;
    Ok(context.filter(|context| !context.is_expired_at(Utc::now())))
}

fn render_persona(catalog: &FilteredCatalog) -> Result<String, ApplicationError> {
    let catalog_json = catalog.to_json_pretty().map_err(|error| {
        ApplicationError::CatalogUnavailable(format!("could not serialize catalog: {error}"))
    })?;

    let mut context = Context::new();
    context.insert("category", catalog.category().as_str());
    context.insert("catalog_json", &catalog_json);

    Tera::one_off(PERSONA_TEMPLATE, &context, false).map_err(|error| {
        ApplicationError::CatalogUnavailable(format!("could not render system context: {error}"))
    })
}
