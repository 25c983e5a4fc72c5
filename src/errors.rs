use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Structured error body returned by every endpoint.
///
/// `kind` is the stable, machine-readable discriminator; clients branch on it
/// rather than on the message text.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error kind (e.g. "capacity_exceeded")
    #[schema(example = "capacity_exceeded")]
    pub kind: String,
    /// Human-readable error description
    #[schema(example = "plan 550e8400-e29b-41d4-a716-446655440000 has 40 units of capacity left, requested 60")]
    pub message: String,
    /// Whether the caller may retry the same request against fresh state
    pub retryable: bool,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Error type for all workflow operations.
///
/// Validation errors are terminal for the request: they indicate a caller
/// logic or data error and must surface to the actor unchanged. Only
/// `ConcurrentModification` and `Transient` are retryable, and retrying is
/// the caller's job; the engine never retries internally.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// New job card would overcommit the plan's total quantity.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Backward move, repeat step, or a move the card's state forbids.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Step id outside the catalog.
    #[error("Unknown step: {0}")]
    UnknownStep(i32),

    /// Inspection precondition violated (status, quantity split, score range).
    #[error("Invalid inspection: {0}")]
    InvalidInspection(String),

    /// A QA report already exists for this job card.
    #[error("Job card {0} has already been inspected")]
    AlreadyInspected(Uuid),

    /// The rejection was already resolved; resolution is terminal.
    #[error("Rejection {0} is already resolved")]
    AlreadyResolved(Uuid),

    /// Cumulative sent quantity would exceed the requested quantity.
    #[error("Over-fulfillment: {0}")]
    OverFulfillment(String),

    /// Lost an optimistic-concurrency race; re-fetch and retry.
    #[error("Concurrent modification of {0}")]
    ConcurrentModification(Uuid),

    /// Timeout or transport failure against the store; retryable with backoff.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Pool-acquire failures and timed-out connections/statements are worth a
/// retry with backoff; everything else is a real persistence fault.
fn is_transient_db_err(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Conn(source) | DbErr::Exec(source) => {
            let msg = source.to_string().to_lowercase();
            msg.contains("timed out") || msg.contains("timeout")
        }
        _ => false,
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if is_transient_db_err(&err) {
            ServiceError::Transient(err.to_string())
        } else {
            ServiceError::DatabaseError(err)
        }
    }
}

impl ServiceError {
    /// Stable wire identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::UnknownStep(_) => "unknown_step",
            Self::InvalidInspection(_) => "invalid_inspection",
            Self::AlreadyInspected(_) => "already_inspected",
            Self::AlreadyResolved(_) => "already_resolved",
            Self::OverFulfillment(_) => "over_fulfillment",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::Transient(_) => "transient",
            Self::InternalError(_) => "internal",
        }
    }

    /// Whether the caller may retry the same call against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_) | Self::Transient(_))
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidTransition(_)
            | Self::UnknownStep(_)
            | Self::InvalidInspection(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyInspected(_)
            | Self::AlreadyResolved(_)
            | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::CapacityExceeded(_) | Self::OverFulfillment(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message suitable for HTTP responses. Internal errors get a generic
    /// body so implementation details never leak; full detail is logged.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            kind: self.kind().to_string(),
            message: self.response_message(),
            retryable: self.is_retryable(),
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_retryable() {
        for err in [
            ServiceError::CapacityExceeded("x".into()),
            ServiceError::InvalidTransition("x".into()),
            ServiceError::UnknownStep(42),
            ServiceError::InvalidInspection("x".into()),
            ServiceError::AlreadyInspected(Uuid::nil()),
            ServiceError::AlreadyResolved(Uuid::nil()),
            ServiceError::OverFulfillment("x".into()),
        ] {
            assert!(!err.is_retryable(), "{} must not be retryable", err.kind());
            assert!(err.status_code().is_client_error());
        }
    }

    #[test]
    fn retryable_errors_map_to_retryable_statuses() {
        let conflict = ServiceError::ConcurrentModification(Uuid::nil());
        assert!(conflict.is_retryable());
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let transient = ServiceError::Transient("timeout".into());
        assert!(transient.is_retryable());
        assert_eq!(transient.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn database_errors_do_not_leak_detail() {
        let err = ServiceError::DatabaseError(DbErr::Custom("secret dsn".into()));
        assert_eq!(err.response_message(), "Database error");
    }

    #[test]
    fn pool_and_timeout_failures_surface_as_transient() {
        use assert_matches::assert_matches;
        use sea_orm::error::{ConnAcquireErr, RuntimeErr};

        let acquire: ServiceError = DbErr::ConnectionAcquire(ConnAcquireErr::Timeout).into();
        assert_matches!(acquire, ServiceError::Transient(_));
        assert!(acquire.is_retryable());
        assert_eq!(acquire.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let exec: ServiceError =
            DbErr::Exec(RuntimeErr::Internal("statement timed out".into())).into();
        assert_matches!(exec, ServiceError::Transient(_));
        assert!(exec.is_retryable());

        let custom: ServiceError = DbErr::Custom("constraint violated".into()).into();
        assert_matches!(custom, ServiceError::DatabaseError(_));
        assert!(!custom.is_retryable());
        assert_eq!(custom.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
