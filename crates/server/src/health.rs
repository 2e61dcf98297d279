use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use orderdesk_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: Option<DbPool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub session_store: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: Option<DbPool>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let session_store = match &state.db_pool {
        Some(pool) => database_check(pool).await,
        None => HealthCheck { status: "ready", detail: "in-memory session store".to_string() },
    };
    let ready = session_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "orderdesk assistant runtime initialized".to_string(),
        },
        session_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use orderdesk_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn memory_store_is_always_ready() {
        let (status, Json(payload)) = health(State(HealthState { db_pool: None })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.session_store.detail, "in-memory session store");
    }

    #[tokio::test]
    async fn sqlite_store_reports_database_reachability() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: Some(pool.clone()) })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");

        pool.close().await;
        let (status, Json(payload)) = health(State(HealthState { db_pool: Some(pool) })).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.session_store.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
