use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use orderdesk_core::context::ContextBuilder;
use orderdesk_core::domain::category::Category;
use orderdesk_core::errors::ApplicationError;
use orderdesk_core::order_store::OrderStore;
use orderdesk_core::session::SessionId;

use crate::dispatcher::ToolCallDispatcher;
use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use crate::tools::order_tool_schemas;

const ORDER_STATE_PREFIX: &str = "Current order items: ";

/// Runs one user turn: prompt assembly, a single completion, then dispatch.
pub struct ConversationDriver {
    contexts: Arc<ContextBuilder>,
    orders: Arc<OrderStore>,
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolCallDispatcher,
    completion_timeout: Duration,
}

impl ConversationDriver {
    pub fn new(
        contexts: Arc<ContextBuilder>,
        orders: Arc<OrderStore>,
        llm: Arc<dyn LlmClient>,
        completion_timeout: Duration,
    ) -> Self {
        let dispatcher = ToolCallDispatcher::new(orders.clone());
        Self { contexts, orders, llm, dispatcher, completion_timeout }
    }

    /// `active` is the gate's current category. The caller must hold the
    /// session lock for the whole turn.
    pub async fn turn(
        &self,
        session: &SessionId,
        active: Option<Category>,
        input: &str,
    ) -> Result<String, ApplicationError> {
        let category = active.ok_or(ApplicationError::SessionNotInitialized)?;
        if input.trim().is_empty() {
            return Err(ApplicationError::EmptyInput);
        }

        let context = self
            .contexts
            .current(session)
            .await?
            .filter(|context| context.category == category)
            .ok_or(ApplicationError::SessionNotInitialized)?;

        let order = self.orders.snapshot(session).await?;
        let order_json = serde_json::to_string(&order)
            .map_err(|error| ApplicationError::Store(format!("could not encode order: {error}")))?;

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(context.content),
                ChatMessage::system(format!("{ORDER_STATE_PREFIX}{order_json}")),
                ChatMessage::user(input),
            ],
            tools: order_tool_schemas(),
        };

        let completion =
            match tokio::time::timeout(self.completion_timeout, self.llm.complete(request)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        event_name = "agent.turn.timeout",
                        session_id = %session,
                        timeout_secs = self.completion_timeout.as_secs(),
                        "chat completion timed out; turn discarded"
                    );
                    return Err(ApplicationError::ProviderUnavailable(format!(
                        "chat completion timed out after {}s",
                        self.completion_timeout.as_secs()
                    )));
                }
            };

        let reply = self.dispatcher.dispatch(session, completion).await?;
        info!(
            event_name = "agent.turn.completed",
            session_id = %session,
            category = %category,
            order_lines = order.len(),
            "conversation turn completed"
        );
        Ok(reply)
    }
}
