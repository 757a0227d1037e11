use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::GatewaySettings;
use crate::observability::HealthChecker;
use crate::services::PaymentService;

/// Webhook authentication material, extracted from the gateway settings
/// once at startup.
#[derive(Clone)]
pub struct WebhookContext {
    pub secret_key: String,
    pub signature_header: String,
}

impl From<&GatewaySettings> for WebhookContext {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            secret_key: settings.secret_key.clone(),
            signature_header: settings.signature_header.clone(),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub webhook: WebhookContext,
    pub metrics_handle: Option<PrometheusHandle>,
    pub health_checker: Option<Arc<HealthChecker>>,
}

impl AppState {
    pub fn new(payments: Arc<PaymentService>, webhook: WebhookContext) -> Self {
        Self {
            payments,
            webhook,
            metrics_handle: None,
            health_checker: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn with_health_checker(mut self, checker: Arc<HealthChecker>) -> Self {
        self.health_checker = Some(checker);
        self
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Payment endpoints
        .route("/payments/initiate", post(handlers::initiate_payment))
        .route("/payments/notification", post(handlers::payment_notification))
        .route("/payments/return", post(handlers::payment_return))
        .route("/payments/stats", get(handlers::payment_stats))
        .route("/payments/:id", get(handlers::get_payment))
        .route(
            "/payments/reference/:reference",
            get(handlers::get_payment_by_reference),
        )
        .route(
            "/payments/payer/:payer_id",
            get(handlers::list_payments_by_payer),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
