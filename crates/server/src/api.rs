use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use orderdesk_agent::{AssistantReply, AssistantRuntime};
use orderdesk_core::domain::category::Category;
use orderdesk_core::errors::ApplicationError;
use orderdesk_core::session::SessionId;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOpened {
    pub session_id: String,
    pub reply: AssistantReply,
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub summary: String,
}

pub fn router(runtime: Arc<AssistantRuntime>) -> Router {
    Router::new()
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{id}", delete(reset_session))
        .route("/api/sessions/{id}/category", post(select_category))
        .route("/api/sessions/{id}/turns", post(send_turn))
        .route("/api/sessions/{id}/order", get(order_summary))
        .with_state(runtime)
}

async fn open_session(State(runtime): State<Arc<AssistantRuntime>>) -> impl IntoResponse {
    let (session, greeting) = runtime.open_session().await;
    (
        StatusCode::CREATED,
        Json(SessionOpened { session_id: session.0, reply: AssistantReply::ok(greeting) }),
    )
}

async fn select_category(
    State(runtime): State<Arc<AssistantRuntime>>,
    Path(id): Path<String>,
    Json(request): Json<CategoryRequest>,
) -> (StatusCode, Json<AssistantReply>) {
    let session = SessionId(id);
    match request.category.parse::<Category>() {
        Ok(category) => (StatusCode::OK, Json(runtime.select_category(&session, category).await)),
        Err(error) => {
            let error = ApplicationError::from(error);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(AssistantReply::from_error(&session, "select_category", &error)),
            )
        }
    }
}

async fn send_turn(
    State(runtime): State<Arc<AssistantRuntime>>,
    Path(id): Path<String>,
    Json(request): Json<TurnRequest>,
) -> Json<AssistantReply> {
    Json(runtime.send_turn(&SessionId(id), &request.text).await)
}

async fn reset_session(
    State(runtime): State<Arc<AssistantRuntime>>,
    Path(id): Path<String>,
) -> Json<AssistantReply> {
    Json(runtime.reset_session(&SessionId(id)).await)
}

async fn order_summary(
    State(runtime): State<Arc<AssistantRuntime>>,
    Path(id): Path<String>,
) -> Response {
    let session = SessionId(id);
    match runtime.order_summary(&session).await {
        Ok(summary) => Json(OrderSummaryResponse { summary }).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AssistantReply::from_error(&session, "order_summary", &error)),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use orderdesk_agent::llm::{ChatCompletion, ChatRequest, LlmClient, LlmError, ToolInvocation};
    use orderdesk_agent::{AssistantRuntime, RuntimeSettings};
    use orderdesk_core::catalog::{CatalogError, CatalogProvider, ProductRecord};
    use orderdesk_core::session::store::InMemorySessionStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::router;

    struct QueuedLlm {
        replies: Mutex<VecDeque<ChatCompletion>>,
    }

    #[async_trait]
    impl LlmClient for QueuedLlm {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatCompletion, LlmError> {
            let next = self.replies.lock().expect("replies lock").pop_front();
            Ok(next.unwrap_or(ChatCompletion::Empty))
        }
    }

    struct OneProduct;

    #[async_trait]
    impl CatalogProvider for OneProduct {
        async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
            Ok(vec![ProductRecord {
                name: "Flyer Pack".to_string(),
                price: "49.50".to_string(),
                categories: vec!["Print Marketing".to_string()],
                tags: vec!["agent".to_string()],
            }])
        }
    }

    fn app(replies: Vec<ChatCompletion>) -> Router {
        let llm = Arc::new(QueuedLlm { replies: Mutex::new(replies.into()) });
        let runtime = AssistantRuntime::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(OneProduct),
            llm,
            RuntimeSettings::default(),
        );
        router(Arc::new(runtime))
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response =
            app.clone().oneshot(request.body(body).expect("request")).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn full_session_over_http() {
        let app = app(vec![ChatCompletion::ToolCalls(vec![ToolInvocation {
            name: "add_to_order".to_string(),
            arguments: r#"{"product_name":"Flyer Pack","quantity":2}"#.to_string(),
        }])]);

        let (status, opened) = call(&app, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["reply"]["text"], "Are you ordering for an Agent or a Property?");
        let id = opened["session_id"].as_str().expect("session id").to_string();

        let (status, selected) = call(
            &app,
            Method::POST,
            &format!("/api/sessions/{id}/category"),
            Some(json!({ "category": "agent" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(selected["text"], "Great! Let's put together an order for Agent marketing.");
        assert!(selected.get("error_class").is_none());

        let (_, turn) = call(
            &app,
            Method::POST,
            &format!("/api/sessions/{id}/turns"),
            Some(json!({ "text": "two flyer packs please" })),
        )
        .await;
        assert_eq!(turn["text"], "Added 2 x Flyer Pack to your order.");

        let (status, order) =
            call(&app, Method::GET, &format!("/api/sessions/{id}/order"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["summary"], "Current Order:\n- Flyer Pack (Qty: 2)\n");

        let (_, reset) = call(&app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(
            reset["text"],
            "Your order has been reset. Are you ordering for an Agent or a Property?"
        );
        let (_, order) = call(&app, Method::GET, &format!("/api/sessions/{id}/order"), None).await;
        assert_eq!(order["summary"], "No items in your order yet.");
    }

    #[tokio::test]
    async fn unknown_category_is_unprocessable() {
        let app = app(Vec::new());
        let (status, reply) = call(
            &app,
            Method::POST,
            "/api/sessions/abc/category",
            Some(json!({ "category": "broker" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(reply["error_class"], "unknown_category");
        assert_eq!(reply["text"], "Please choose either Agent or Property.");
    }

    #[tokio::test]
    async fn turn_without_selection_prompts_for_a_category() {
        let app = app(Vec::new());
        let (status, reply) = call(
            &app,
            Method::POST,
            "/api/sessions/unknown-session/turns",
            Some(json!({ "text": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["error_class"], "session_not_initialized");
        assert_eq!(reply["text"], "Please select Agent or Property type first.");
    }
}
