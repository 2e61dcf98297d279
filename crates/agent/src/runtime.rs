use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use orderdesk_core::catalog::{CatalogFilter, CatalogProvider};
use orderdesk_core::config::{AppConfig, DEFAULT_SESSION_TTL_SECS};
use orderdesk_core::context::ContextBuilder;
use orderdesk_core::domain::catalog::FilteredCatalog;
use orderdesk_core::domain::category::Category;
use orderdesk_core::domain::order::EMPTY_ORDER_SUMMARY;
use orderdesk_core::errors::ApplicationError;
use orderdesk_core::order_store::OrderStore;
use orderdesk_core::session::gate::{GateTransition, SessionGate};
use orderdesk_core::session::store::SessionStore;
use orderdesk_core::session::SessionId;

use crate::conversation::ConversationDriver;
use crate::llm::LlmClient;

pub const GREETING: &str = "Are you ordering for an Agent or a Property?";
pub const RESET_REPLY: &str =
    "Your order has been reset. Are you ordering for an Agent or a Property?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub ttl_secs: u64,
    pub catalog_timeout: Duration,
    pub completion_timeout: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl_secs: config.session.ttl_secs,
            catalog_timeout: Duration::from_secs(config.catalog.timeout_secs),
            completion_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            catalog_timeout: Duration::from_secs(20),
            completion_timeout: Duration::from_secs(30),
        }
    }
}

/// Text for the user plus a machine-readable class when the operation failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<&'static str>,
}

impl AssistantReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), error_class: None }
    }

    pub fn from_error(
        session: &SessionId,
        operation: &'static str,
        error: &ApplicationError,
    ) -> Self {
        warn!(
            event_name = "agent.operation.failed",
            session_id = %session,
            operation,
            error_class = error.error_class(),
            error = %error,
            "operation degraded to a conversational reply"
        );
        Self { text: error.user_message(), error_class: Some(error.error_class()) }
    }

    pub fn is_error(&self) -> bool {
        self.error_class.is_some()
    }
}

type GateHandle = Arc<tokio::sync::Mutex<SessionGate>>;

struct TrackedGate {
    gate: GateHandle,
    touched_at: Instant,
}

/// The client-facing surface. Each session's operations run one at a time
/// under that session's lock, network calls included.
pub struct AssistantRuntime {
    catalog: CatalogFilter,
    contexts: Arc<ContextBuilder>,
    orders: Arc<OrderStore>,
    driver: ConversationDriver,
    settings: RuntimeSettings,
    gates: Mutex<HashMap<SessionId, TrackedGate>>,
}

impl AssistantRuntime {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog_provider: Arc<dyn CatalogProvider>,
        llm: Arc<dyn LlmClient>,
        settings: RuntimeSettings,
    ) -> Self {
        let catalog = CatalogFilter::new(catalog_provider, store.clone(), settings.ttl_secs);
        let contexts = Arc::new(ContextBuilder::new(store.clone(), settings.ttl_secs));
        let orders = Arc::new(OrderStore::new(store));
        let driver = ConversationDriver::new(
            contexts.clone(),
            orders.clone(),
            llm,
            settings.completion_timeout,
        );

        Self { catalog, contexts, orders, driver, settings, gates: Mutex::new(HashMap::new()) }
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub async fn open_session(&self) -> (SessionId, &'static str) {
        let session = SessionId::generate();
        self.track(&session);
        info!(event_name = "session.opened", session_id = %session, "session opened");
        (session, GREETING)
    }

    /// Sessions currently holding a gate.
    pub fn tracked_sessions(&self) -> usize {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Enters or switches the category. A catalog failure leaves the gate and
    /// session data as they were; a failed write resets the session instead.
    pub async fn select_category(
        &self,
        session: &SessionId,
        category: Category,
    ) -> AssistantReply {
        let handle = self.track(session);
        let mut gate = handle.lock().await;

        let filtered = match self.filtered_catalog(category).await {
            Ok(filtered) => filtered,
            Err(error) => return AssistantReply::from_error(session, "select_category", &error),
        };
        if let Err(error) = self.contexts.initialize(session, &filtered).await {
            let previous = gate.reset();
            if let Err(clear_error) = self.contexts.clear(session).await {
                warn!(
                    event_name = "session.reset.failed",
                    session_id = %session,
                    error = %clear_error,
                    "could not clear session data after a failed selection"
                );
            }
            info!(
                event_name = "session.gate.reset_after_failure",
                session_id = %session,
                previous = ?previous,
                "selection failed mid-write; session reset to unselected"
            );
            return AssistantReply::from_error(session, "select_category", &error);
        }

        match gate.select(category) {
            GateTransition::Entered(category) => info!(
                event_name = "session.gate.entered",
                session_id = %session,
                category = %category,
                "category selected"
            ),
            GateTransition::Reselected { previous, current } => info!(
                event_name = "session.gate.reselected",
                session_id = %session,
                previous = %previous,
                category = %current,
                "category re-selected; order reset"
            ),
        }
        AssistantReply::ok(format!("Great! Let's put together an order for {category} marketing."))
    }

    /// Unknown sessions are treated as unselected and never gain a gate here.
    pub async fn send_turn(&self, session: &SessionId, text: &str) -> AssistantReply {
        let result = match self.lookup(session) {
            Some(handle) => {
                let gate = handle.lock().await;
                self.driver.turn(session, gate.active_category(), text).await
            }
            None => self.driver.turn(session, None, text).await,
        };

        match result {
            Ok(reply) => AssistantReply::ok(reply),
            Err(error) => AssistantReply::from_error(session, "send_turn", &error),
        }
    }

    /// Clears session data and drops the session's gate.
    pub async fn reset_session(&self, session: &SessionId) -> AssistantReply {
        let (previous, cleared) = match self.lookup(session) {
            Some(handle) => {
                let mut gate = handle.lock().await;
                let previous = gate.reset();
                let cleared = self.contexts.clear(session).await;
                self.forget(session, &handle);
                (previous, cleared)
            }
            None => (None, self.contexts.clear(session).await),
        };

        match cleared {
            Ok(()) => {
                info!(
                    event_name = "session.reset",
                    session_id = %session,
                    previous = ?previous,
                    "session reset to unselected"
                );
                AssistantReply::ok(RESET_REPLY)
            }
            Err(error) => AssistantReply::from_error(session, "reset_session", &error),
        }
    }

    pub async fn order_summary(&self, session: &SessionId) -> Result<String, ApplicationError> {
        let Some(handle) = self.lookup(session) else {
            return Ok(EMPTY_ORDER_SUMMARY.to_string());
        };
        let _gate = handle.lock().await;
        self.orders.summarize(session).await
    }

    pub async fn active_category(&self, session: &SessionId) -> Option<Category> {
        let handle = self.lookup(session)?;
        let gate = handle.lock().await;
        gate.active_category()
    }

    async fn filtered_catalog(
        &self,
        category: Category,
    ) -> Result<FilteredCatalog, ApplicationError> {
        tokio::time::timeout(self.settings.catalog_timeout, self.catalog.filter(category))
            .await
            .map_err(|_| {
                ApplicationError::CatalogUnavailable(format!(
                    "catalog fetch timed out after {}s",
                    self.settings.catalog_timeout.as_secs()
                ))
            })?
    }

    /// Returns the session's gate, creating it if needed. Creating one first
    /// evicts gates left idle for a full TTL window.
    fn track(&self, session: &SessionId) -> GateHandle {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        if !gates.contains_key(session) {
            let idle_after = Duration::from_secs(self.settings.ttl_secs);
            let before = gates.len();
            gates.retain(|_, tracked| {
                tracked.touched_at.elapsed() < idle_after || Arc::strong_count(&tracked.gate) > 1
            });
            if before > gates.len() {
                debug!(
                    event_name = "session.gate.evicted",
                    evicted = before - gates.len(),
                    "idle session gates evicted"
                );
            }
        }
        let tracked = gates.entry(session.clone()).or_insert_with(|| TrackedGate {
            gate: GateHandle::default(),
            touched_at: Instant::now(),
        });
        tracked.touched_at = Instant::now();
        tracked.gate.clone()
    }

    fn lookup(&self, session: &SessionId) -> Option<GateHandle> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let tracked = gates.get_mut(session)?;
        tracked.touched_at = Instant::now();
        Some(tracked.gate.clone())
    }

    /// Drops the gate unless another operation is already queued on it.
    fn forget(&self, session: &SessionId, handle: &GateHandle) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(handle) <= 2 {
            gates.remove(session);
        }
    }
}
