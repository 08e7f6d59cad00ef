//! Error handling for the stock ledger
//!
//! Business rejections are typed variants callers can branch on; storage and
//! transport failures collapse into opaque internal errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use shared::{AmountOverflow, Dependents, FieldError, ReferenceKind};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error("Insufficient stock for {material_name}: available {available}, requested {requested}")]
    InsufficientStock {
        material_name: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Duplicate {entity} name: {name}")]
    DuplicateName { entity: ReferenceKind, name: String },

    #[error("Cannot deactivate {entity} '{name}': still referenced by {}", .dependents.describe())]
    ReferentialIntegrity {
        entity: ReferenceKind,
        name: String,
        dependents: Dependents,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: ReferenceKind) -> Self {
        AppError::NotFound(kind.label().to_string())
    }

    /// Stable machine readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::DuplicateName { .. } => "DUPLICATE_NAME",
            AppError::ReferentialIntegrity { .. } => "REFERENTIAL_INTEGRITY",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this is an infrastructure failure rather than a business rejection
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_)
                | AppError::DatabaseError(_)
                | AppError::Internal(_)
                | AppError::InternalError(_)
        )
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation {
            field: err.field.to_string(),
            message: err.message.to_string(),
        }
    }
}

impl From<AmountOverflow> for AppError {
    fn from(err: AmountOverflow) -> Self {
        AppError::validation(err.field, "Amount is out of range")
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new(code, message.clone())
                },
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorDetail::new(code, msg.clone()))
            }
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(code, format!("{} not found", resource)),
            ),
            AppError::InsufficientStock {
                material_name,
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    details: Some(json!({
                        "material_name": material_name,
                        "available": available,
                        "requested": requested,
                        "shortfall": *requested - *available,
                    })),
                    ..ErrorDetail::new(code, self.to_string())
                },
            ),
            AppError::DuplicateName { entity, name } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some("name".to_string()),
                    details: Some(json!({ "entity": entity, "name": name })),
                    ..ErrorDetail::new(code, format!("A {} named '{}' already exists", entity, name))
                },
            ),
            AppError::ReferentialIntegrity {
                entity,
                name,
                dependents,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    details: Some(json!({
                        "entity": entity,
                        "name": name,
                        "dependents": dependents,
                    })),
                    ..ErrorDetail::new(code, self.to_string())
                },
            ),
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(code, "An internal server error occurred"),
            ),
        };

        if self.is_internal() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(code, error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_insufficient_stock_message_carries_numbers() {
        let err = AppError::InsufficientStock {
            material_name: "Cement".to_string(),
            available: Decimal::from(125),
            requested: Decimal::from(200),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Cement: available 125, requested 200"
        );
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_referential_integrity_names_blockers() {
        let err = AppError::ReferentialIntegrity {
            entity: ReferenceKind::Unit,
            name: "Bag".to_string(),
            dependents: Dependents {
                inflows: 2,
                outflows: 0,
                materials: 0,
            },
        };
        assert_eq!(
            err.to_string(),
            "Cannot deactivate unit 'Bag': still referenced by 2 inflow record(s)"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("Material".into()), StatusCode::NOT_FOUND),
            (
                AppError::InsufficientStock {
                    material_name: "Sand".into(),
                    available: Decimal::from_str("1.5").unwrap(),
                    requested: Decimal::from(2),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::DuplicateName {
                    entity: ReferenceKind::Project,
                    name: "Tower B".into(),
                },
                StatusCode::CONFLICT,
            ),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
