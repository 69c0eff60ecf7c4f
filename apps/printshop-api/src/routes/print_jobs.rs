//! # Print Job Routes
//!
//! Each variant gets its own resource; the generic `/print-jobs` resource
//! reads across all of them.
//!
//! ## Variant Resources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  /digital-prints  /offset-prints  /duplo-prints  /sublimation-prints   │
//! │  /other-prints                                                          │
//! │                                                                         │
//! │     GET    /                 list of that variant                      │
//! │     POST   /                 create (print_type forced from the path)  │
//! │     GET    /summary          totals of that variant                    │
//! │     GET    /customer/{id}    that variant, one customer                │
//! │     GET    /{id}             404 if the job is another variant         │
//! │     PUT    /{id}             re-priced on save                         │
//! │     DELETE /{id}                                                       │
//! │     POST   /{id}/payment      PAYMENT_RECORDED audit                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Audit records use the variant's entity type (`DigitalPrint`, ...) and
//! carry the job id and customer name.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use printshop_core::print_job::{JobPayment, JobPaymentInput, JobRecord, PrintJob, PrintType};
use printshop_core::types::PaymentStatus;
use printshop_core::validation::{validate_job_payment, validate_print_job};
use printshop_core::{AuditAction, AuditEvent};
use printshop_db::PrintJobSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery};
use crate::routes::{created, Created};
use crate::state::AppState;

/// Result of recording a payment.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment: JobPayment,
    pub job: PrintJob,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrintJobQuery {
    pub print_type: Option<PrintType>,
    pub status: Option<PaymentStatus>,
}

pub fn routes() -> Router<AppState> {
    let mut router = Router::new()
        .route("/print-jobs", get(list_all))
        .route("/print-jobs/summary", get(summary_all))
        .route("/print-jobs/customer/{customer_id}", get(list_all_by_customer))
        .route("/print-jobs/status/{status}", get(list_by_status))
        .route("/print-jobs/{id}", get(get_any))
        .route("/print-jobs/{id}/payments", get(payments).post(record_any_payment));

    for print_type in PrintType::ALL {
        router = router.nest(variant_path(print_type), variant_routes(print_type));
    }
    router
}

/// URL segment of a variant resource.
pub fn variant_path(print_type: PrintType) -> &'static str {
    match print_type {
        PrintType::Digital => "/digital-prints",
        PrintType::Offset => "/offset-prints",
        PrintType::Duplo => "/duplo-prints",
        PrintType::Sublimation => "/sublimation-prints",
        PrintType::Other => "/other-prints",
    }
}

fn variant_routes(print_type: PrintType) -> Router<AppState> {
    Router::new()
        .route("/", get(list_variant).post(create_variant))
        .route("/summary", get(summary_variant))
        .route("/customer/{customer_id}", get(list_variant_by_customer))
        .route("/{id}", get(get_variant).put(update_variant).delete(delete_variant))
        .route("/{id}/payment", post(record_variant_payment))
        .layer(Extension(print_type))
}

/// Parses a request body as a job of `print_type`, whatever tag the client
/// sent.
fn parse_record(mut body: Value, print_type: PrintType) -> ApiResult<JobRecord> {
    let Some(fields) = body.as_object_mut() else {
        return Err(ApiError::validation("Expected a JSON object"));
    };
    let tag = serde_json::to_value(print_type)
        .map_err(|e| ApiError::internal(format!("Failed to encode print type: {}", e)))?;
    fields.insert("print_type".to_string(), tag);

    serde_json::from_value(body)
        .map_err(|e| ApiError::validation(format!("Invalid print job: {}", e)))
}

fn job_event(job: &PrintJob, action: AuditAction) -> AuditEvent {
    AuditEvent::new(job.print_type().entity_type(), job.id, action)
        .print_job(job.id, job.job.customer_name.clone())
}

// =============================================================================
// Variant Handlers
// =============================================================================

async fn list_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    Ok(Json(state.db.print_jobs().list(Some(print_type)).await?))
}

async fn list_variant_by_customer(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    ApiPath(customer_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    let jobs = state
        .db
        .print_jobs()
        .list_by_customer(customer_id)
        .await?
        .into_iter()
        .filter(|job| job.print_type() == print_type)
        .collect();
    Ok(Json(jobs))
}

async fn summary_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
) -> ApiResult<Json<PrintJobSummary>> {
    Ok(Json(state.db.print_jobs().summary(Some(print_type)).await?))
}

async fn get_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PrintJob>> {
    Ok(Json(state.db.print_jobs().get_typed(id, print_type).await?))
}

async fn create_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    actor: Actor,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Created<PrintJob>> {
    let record = parse_record(body, print_type)?;
    validate_print_job(&record)?;

    let job = state.db.print_jobs().create(record).await?;
    state
        .audit(&actor, job_event(&job, AuditAction::Create).new_value(&job))
        .await;
    Ok(created(job))
}

async fn update_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<PrintJob>> {
    let record = parse_record(body, print_type)?;
    validate_print_job(&record)?;

    let (before, after) = state.db.print_jobs().update(id, record).await?;
    state
        .audit(
            &actor,
            job_event(&after, AuditAction::Update)
                .old_value(&before)
                .new_value(&after),
        )
        .await;
    Ok(Json(after))
}

async fn delete_variant(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.print_jobs().get_typed(id, print_type).await?;
    let deleted = state.db.print_jobs().delete(id).await?;

    state
        .audit(&actor, job_event(&deleted, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_variant_payment(
    State(state): State<AppState>,
    Extension(print_type): Extension<PrintType>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<JobPaymentInput>,
) -> ApiResult<Created<PaymentReceipt>> {
    state.db.print_jobs().get_typed(id, print_type).await?;
    record_payment(&state, &actor, id, input).await
}

// =============================================================================
// Cross-Variant Handlers
// =============================================================================

async fn list_all(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PrintJobQuery>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    let jobs = state.db.print_jobs().list(query.print_type).await?;
    let jobs = match query.status {
        Some(status) => jobs
            .into_iter()
            .filter(|job| job.job.payment_status == status)
            .collect(),
        None => jobs,
    };
    Ok(Json(jobs))
}

async fn summary_all(State(state): State<AppState>) -> ApiResult<Json<PrintJobSummary>> {
    Ok(Json(state.db.print_jobs().summary(None).await?))
}

async fn list_all_by_customer(
    State(state): State<AppState>,
    ApiPath(customer_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    Ok(Json(state.db.print_jobs().list_by_customer(customer_id).await?))
}

async fn list_by_status(
    State(state): State<AppState>,
    ApiPath(status): ApiPath<PaymentStatus>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    Ok(Json(state.db.print_jobs().list_by_status(status).await?))
}

async fn get_any(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<PrintJob>> {
    Ok(Json(state.db.print_jobs().get(id).await?))
}

async fn payments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<JobPayment>>> {
    state.db.print_jobs().get(id).await?;
    Ok(Json(state.db.print_jobs().payments(id).await?))
}

async fn record_any_payment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<JobPaymentInput>,
) -> ApiResult<Created<PaymentReceipt>> {
    record_payment(&state, &actor, id, input).await
}

async fn record_payment(
    state: &AppState,
    actor: &Actor,
    id: i64,
    input: JobPaymentInput,
) -> ApiResult<Created<PaymentReceipt>> {
    validate_job_payment(&input)?;

    let (before, payment, after) = state.db.print_jobs().record_payment(id, &input).await?;
    state
        .audit(
            actor,
            job_event(&after, AuditAction::PaymentRecorded)
                .old_value(&before)
                .new_value(&after),
        )
        .await;
    Ok(created(PaymentReceipt { payment, job: after }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use printshop_core::print_job::PrintDetails;
    use serde_json::json;

    #[test]
    fn test_path_decides_the_variant() {
        let body = json!({
            "print_type": "digital",
            "job_number": "SUB-1",
            "customer_id": null,
            "sublimation_type": "mugs",
            "quantity": 10,
            "unit_price": 45000,
            "job_name": null,
            "job_description": null
        });
        let record = parse_record(body, PrintType::Sublimation).unwrap();
        assert!(matches!(record.details, PrintDetails::Sublimation(_)));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = parse_record(json!([1, 2]), PrintType::Digital).unwrap_err();
        assert_eq!(err.message, "Expected a JSON object");
    }

    #[test]
    fn test_every_variant_has_a_distinct_path() {
        let mut paths: Vec<_> = PrintType::ALL.into_iter().map(variant_path).collect();
        paths.dedup();
        assert_eq!(paths.len(), 5);
    }
}
