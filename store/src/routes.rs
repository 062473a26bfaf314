use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use checkout::error::CheckoutError;
use checkout::fulfillment::FulfillmentTracker;
use checkout::model::ModelId;
use checkout::settlement::SettlementHandler;
use checkout::webhook::{WebhookAck, WebhookHandler};
use common::config::BackendConfig;
use http::HeaderMap;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub webhook: Arc<WebhookHandler>,
    pub settlement: Arc<SettlementHandler>,
    pub fulfillment: Arc<FulfillmentTracker>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/orders/{id}/pay", post(mark_order_paid))
        .route("/orders/{id}/deliver", post(deliver_order))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_backend(
    config: &BackendConfig,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);
    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match state.webhook.handle(&body, signature).await {
        Ok(WebhookAck::Settled { order_id }) => (
            StatusCode::OK,
            Json(json!({ "message": format!("order {order_id} settled") })),
        )
            .into_response(),
        Ok(WebhookAck::Ignored { event_type }) => (
            StatusCode::OK,
            Json(json!({ "message": format!("event {event_type} acknowledged") })),
        )
            .into_response(),
        Err(err) => {
            error!("Webhook rejected: {}", err);
            let status = match err {
                CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
                CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::AlreadyPaid => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, err.to_string()).into_response()
        }
    }
}

async fn mark_order_paid(
    State(state): State<AppState>,
    Path(order_id): Path<ModelId>,
) -> Response {
    match state.settlement.mark_paid_cod(order_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            error!("mark_order_paid failed for {}: {}", order_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn deliver_order(State(state): State<AppState>, Path(order_id): Path<ModelId>) -> Response {
    match state.fulfillment.deliver_order(order_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            error!("deliver_order failed for {}: {}", order_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
