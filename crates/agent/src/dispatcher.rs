use std::sync::Arc;

use tracing::{info, warn};

use orderdesk_core::errors::ApplicationError;
use orderdesk_core::order_store::{OrderOutcome, OrderStore};
use orderdesk_core::session::SessionId;

use crate::llm::ChatCompletion;
use crate::tools::parse_invocation;

pub const ITEM_NOT_FOUND_REPLY: &str = "Item not found in your order.";

/// Turns one completion into the text shown to the user. Tool results are
/// confirmed locally and never sent back to the model.
pub struct ToolCallDispatcher {
    orders: Arc<OrderStore>,
}

impl ToolCallDispatcher {
    pub fn new(orders: Arc<OrderStore>) -> Self {
        Self { orders }
    }

    pub async fn dispatch(
        &self,
        session: &SessionId,
        completion: ChatCompletion,
    ) -> Result<String, ApplicationError> {
        let invocations = match completion {
            ChatCompletion::Text(text) => return Ok(text),
            ChatCompletion::ToolCalls(invocations) if !invocations.is_empty() => invocations,
            ChatCompletion::Empty | ChatCompletion::ToolCalls(_) => {
                return Err(ApplicationError::ProviderUnavailable(
                    "completion carried neither text nor a tool call".to_string(),
                ))
            }
        };

        let [invocation] = invocations.as_slice() else {
            warn!(
                event_name = "agent.dispatch.multi_call",
                session_id = %session,
                call_count = invocations.len(),
                "model issued an unsupported number of tool calls"
            );
            return Err(ApplicationError::UnsupportedMultiCall(invocations.len()));
        };

        let call = parse_invocation(invocation).map_err(|error| {
            warn!(
                event_name = "agent.dispatch.rejected",
                session_id = %session,
                tool = %invocation.name,
                error = %error,
                "tool invocation rejected"
            );
            error
        })?;

        let outcome = self.orders.apply(session, &call).await?;
        info!(
            event_name = "agent.dispatch.applied",
            session_id = %session,
            tool = %call.name(),
            "tool call applied"
        );
        Ok(confirmation(&outcome))
    }
}

pub fn confirmation(outcome: &OrderOutcome) -> String {
    match outcome {
        OrderOutcome::Added(line) => {
            format!("Added {} x {} to your order.", line.quantity, line.product_name)
        }
        OrderOutcome::Removed(line) => format!("Removed {} from your order.", line.product_name),
        OrderOutcome::NotFound { .. } => ITEM_NOT_FOUND_REPLY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orderdesk_core::context::ContextBuilder;
    use orderdesk_core::domain::catalog::{CatalogItem, FilteredCatalog};
    use orderdesk_core::domain::category::Category;
    use orderdesk_core::errors::ApplicationError;
    use orderdesk_core::order_store::OrderStore;
    use orderdesk_core::session::store::InMemorySessionStore;
    use orderdesk_core::session::SessionId;

    use super::{ToolCallDispatcher, ITEM_NOT_FOUND_REPLY};
    use crate::llm::{ChatCompletion, ToolInvocation};

    async fn dispatcher() -> (ToolCallDispatcher, Arc<OrderStore>, SessionId) {
        let store = Arc::new(InMemorySessionStore::new());
        let session = SessionId::generate();
        let items = vec![CatalogItem {
            name: "Flyer Pack".to_string(),
            price: "$49.50".to_string(),
            categories: vec!["Print Marketing".to_string()],
            tags: vec!["agent".to_string()],
        }];
        ContextBuilder::new(store.clone(), 3600)
            .initialize(&session, &FilteredCatalog::new(Category::Agent, items))
            .await
            .expect("seed context");
        let orders = Arc::new(OrderStore::new(store));
        (ToolCallDispatcher::new(orders.clone()), orders, session)
    }

    fn call(name: &str, arguments: &str) -> ToolInvocation {
        ToolInvocation { name: name.to_string(), arguments: arguments.to_string() }
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let (dispatcher, orders, session) = dispatcher().await;
        let reply = dispatcher
            .dispatch(&session, ChatCompletion::Text("Our flyers ship in 3 days.".to_string()))
            .await
            .expect("text reply");

        assert_eq!(reply, "Our flyers ship in 3 days.");
        assert!(orders.snapshot(&session).await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn confirms_add_and_remove_locally() {
        let (dispatcher, orders, session) = dispatcher().await;

        let added = dispatcher
            .dispatch(
                &session,
                ChatCompletion::ToolCalls(vec![call(
                    "add_to_order",
                    r#"{"product_name":"Flyer Pack","quantity":3}"#,
                )]),
            )
            .await
            .expect("add");
        assert_eq!(added, "Added 3 x Flyer Pack to your order.");
        assert_eq!(orders.snapshot(&session).await.expect("snapshot").len(), 1);

        let removed = dispatcher
            .dispatch(
                &session,
                ChatCompletion::ToolCalls(vec![call(
                    "remove_from_order",
                    r#"{"product_name":"Flyer Pack"}"#,
                )]),
            )
            .await
            .expect("remove");
        assert_eq!(removed, "Removed Flyer Pack from your order.");

        let missing = dispatcher
            .dispatch(
                &session,
                ChatCompletion::ToolCalls(vec![call(
                    "remove_from_order",
                    r#"{"product_name":"Flyer Pack"}"#,
                )]),
            )
            .await
            .expect("not found is not an error");
        assert_eq!(missing, ITEM_NOT_FOUND_REPLY);
    }

    #[tokio::test]
    async fn protocol_violations_never_mutate_the_order() {
        let (dispatcher, orders, session) = dispatcher().await;
        let add = r#"{"product_name":"Flyer Pack","quantity":1}"#;

        let missing_quantity = r#"{"product_name":"Flyer Pack"}"#;
        let zero_quantity = r#"{"product_name":"Flyer Pack","quantity":0}"#;
        let cases = vec![
            (
                ChatCompletion::ToolCalls(vec![
                    call("add_to_order", add),
                    call("add_to_order", add),
                ]),
                "unsupported_multi_call",
            ),
            (ChatCompletion::ToolCalls(vec![call("checkout", add)]), "unknown_tool"),
            (
                ChatCompletion::ToolCalls(vec![call("add_to_order", missing_quantity)]),
                "invalid_arguments",
            ),
            (
                ChatCompletion::ToolCalls(vec![call("add_to_order", zero_quantity)]),
                "invalid_quantity",
            ),
            (ChatCompletion::ToolCalls(Vec::new()), "provider_unavailable"),
            (ChatCompletion::Empty, "provider_unavailable"),
        ];

        for (completion, expected_class) in cases {
            let error: ApplicationError =
                dispatcher.dispatch(&session, completion).await.expect_err("rejected");
            assert_eq!(error.error_class(), expected_class);
        }

        assert!(orders.snapshot(&session).await.expect("snapshot").is_empty());
    }
}
