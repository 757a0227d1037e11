use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};

use crate::api::requests::{InitiatePaymentRequest, ReturnPayload};
use crate::api::responses::{
    ApiResponse, ErrorResponse, InitiatePaymentResponse, NotificationAck, PaymentResponse,
    ValidationErrorDetail,
};
use crate::error::AppError;
use crate::gateway::signature;
use crate::gateway::NotificationPayload;
use crate::models::PaymentStatistics;
use crate::observability::{get_metrics, mask_reference, AggregatedHealth};
use crate::services::ResolutionSource;

use super::routes::AppState;

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

/// Maps an application error onto the HTTP envelope. Infrastructure
/// errors keep their detail in the server log only.
fn error_reply(error: AppError) -> ErrorReply {
    let (status, code, message) = match &error {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        AppError::DuplicateReference(reference) => (
            StatusCode::CONFLICT,
            "DUPLICATE_REFERENCE",
            format!("a payment with reference {reference} already exists"),
        ),
        AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        AppError::GatewayRejected(msg) => {
            (StatusCode::BAD_GATEWAY, "GATEWAY_REJECTED", msg.clone())
        }
        AppError::GatewayUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "GATEWAY_UNAVAILABLE",
            "payment gateway is temporarily unreachable".to_string(),
        ),
        AppError::AuthenticationFailed => (
            StatusCode::BAD_REQUEST,
            "AUTHENTICATION_FAILED",
            "invalid signature".to_string(),
        ),
        _ => {
            tracing::error!("internal error: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    };

    (
        status,
        Json(ApiResponse::<()>::error(ErrorResponse::new(code, message))),
    )
}

fn validation_reply(errors: Vec<crate::api::requests::ValidationError>) -> ErrorReply {
    let details: Vec<ValidationErrorDetail> = errors
        .into_iter()
        .map(|e| ValidationErrorDetail {
            field: e.field,
            message: e.message,
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                .with_details(details),
        )),
    )
}

// ============================================================================
// Health & metrics
// ============================================================================

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AggregatedHealth>>, ErrorReply> {
    match &state.health_checker {
        Some(checker) => Ok(Json(ApiResponse::success(checker.check_all().await))),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(ErrorResponse::new(
                "HEALTH_UNAVAILABLE",
                "health checker not configured",
            ))),
        )),
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if let Some(checker) = &state.health_checker {
        if !checker.is_ready().await {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Payment handlers
// ============================================================================

/// Creates a payment and initiates it with the gateway.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InitiatePaymentResponse>>), ErrorReply> {
    if let Err(errors) = request.validate() {
        return Err(validation_reply(errors));
    }

    match state.payments.create_payment(request.into_create()).await {
        Ok(record) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(InitiatePaymentResponse::from(record))),
        )),
        Err(e) => Err(error_reply(e)),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ErrorReply> {
    match state.payments.get_payment(id).await {
        Ok(record) => Ok(Json(ApiResponse::success(PaymentResponse::from(record)))),
        Err(e) => Err(error_reply(e)),
    }
}

pub async fn get_payment_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ErrorReply> {
    match state.payments.get_by_reference(&reference).await {
        Ok(record) => Ok(Json(ApiResponse::success(PaymentResponse::from(record)))),
        Err(e) => Err(error_reply(e)),
    }
}

pub async fn list_payments_by_payer(
    State(state): State<AppState>,
    Path(payer_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ErrorReply> {
    match state.payments.list_by_payer(payer_id).await {
        Ok(records) => Ok(Json(ApiResponse::success(
            records.into_iter().map(PaymentResponse::from).collect(),
        ))),
        Err(e) => Err(error_reply(e)),
    }
}

pub async fn payment_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PaymentStatistics>>, ErrorReply> {
    match state.payments.statistics().await {
        Ok(stats) => Ok(Json(ApiResponse::success(stats))),
        Err(e) => Err(error_reply(e)),
    }
}

// ============================================================================
// Webhook
// ============================================================================

/// Gateway notification endpoint.
///
/// An unauthenticated callback must never move a payment's status: the
/// signature check happens before any lookup or mutation. Once
/// authenticated, the webhook only tells us *that* something happened —
/// a server-to-server verify call determines *what*.
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<NotificationPayload>,
) -> Result<Json<ApiResponse<NotificationAck>>, ErrorReply> {
    let supplied = headers
        .get(state.webhook.signature_header.as_str())
        .and_then(|value| value.to_str().ok());

    let authenticated = supplied
        .map(|token| signature::verify_token(&payload, &state.webhook.secret_key, token))
        .unwrap_or(false);

    if !authenticated {
        // Unauthenticated input: log a masked reference only.
        tracing::warn!(
            reference = %mask_reference(&payload.cpm_trans_id),
            header_present = supplied.is_some(),
            "rejected webhook with invalid signature"
        );
        get_metrics().record_webhook_rejected();
        return Err(error_reply(AppError::AuthenticationFailed));
    }

    if payload.cpm_trans_id.is_empty() {
        return Err(error_reply(AppError::Validation(
            "notification is missing the transaction reference".to_string(),
        )));
    }

    match state
        .payments
        .reconcile(&payload.cpm_trans_id, ResolutionSource::Webhook)
        .await
    {
        Ok(record) => Ok(Json(ApiResponse::success(NotificationAck {
            external_reference: record.external_reference,
            status: Some(record.status),
        }))),
        Err(AppError::GatewayUnavailable(message)) => {
            // Take no action; the gateway retries and the worker still
            // holds the queue entry.
            tracing::warn!(
                reference = %payload.cpm_trans_id,
                message = %message,
                "gateway unavailable during webhook verification"
            );
            Ok(Json(ApiResponse::success(NotificationAck {
                external_reference: payload.cpm_trans_id,
                status: None,
            })))
        }
        Err(e) => Err(error_reply(e)),
    }
}

/// Post-checkout return endpoint: the payer lands here after the gateway
/// page. Read-only.
pub async fn payment_return(
    State(state): State<AppState>,
    Form(payload): Form<ReturnPayload>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ErrorReply> {
    let Some(reference) = payload.transaction_id else {
        return Err(error_reply(AppError::Validation(
            "transaction_id is required".to_string(),
        )));
    };

    match state.payments.get_by_reference(&reference).await {
        Ok(record) => Ok(Json(ApiResponse::success(PaymentResponse::from(record)))),
        Err(e) => Err(error_reply(e)),
    }
}
