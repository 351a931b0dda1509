//! Request/response shapes for the operations API.

use std::str::FromStr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::AppError;
use crate::domain::{Operation, OperationId, OperationStatus, cents_to_decimal};

/// Body of `POST /operations`.
///
/// Fields stay loosely typed so that missing and malformed values are
/// reported as validation errors rather than generic JSON rejections.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOperationRequest {
    #[serde(default)]
    pub receiver_id: Option<Value>,
    #[serde(default)]
    pub gross_value: Option<Value>,
}

impl CreateOperationRequest {
    pub fn validate(self) -> Result<(String, Decimal), AppError> {
        let receiver_id = match self.receiver_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let (Some(receiver_id), Some(gross_value)) = (receiver_id, self.gross_value) else {
            return Err(AppError::InvalidInput(
                "receiver_id and gross_value are required".to_string(),
            ));
        };

        let gross_value = match gross_value {
            Value::Number(n) => parse_json_number(&n.to_string()),
            _ => None,
        }
        .filter(|d| *d > Decimal::ZERO)
        .ok_or_else(|| {
            AppError::InvalidInput("gross_value must be a positive number".to_string())
        })?;

        Ok((receiver_id, gross_value))
    }
}

fn parse_json_number(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Operation as rendered on the wire. Amounts are JSON numbers.
#[derive(Debug, Serialize)]
pub struct OperationRecord {
    pub id: OperationId,
    pub receiver_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_value: Decimal,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Operation> for OperationRecord {
    fn from(op: Operation) -> Self {
        Self {
            id: op.id,
            receiver_id: op.receiver_id,
            gross_value: cents_to_decimal(op.gross_cents),
            fee: cents_to_decimal(op.fee_cents),
            net_value: cents_to_decimal(op.net_cents),
            status: op.status,
            created_at: op.created_at,
        }
    }
}

/// Operation plus a human-readable outcome message.
#[derive(Debug, Serialize)]
pub struct OperationEnvelope {
    pub message: &'static str,
    pub operation: OperationRecord,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) | AppError::AlreadyConfirmed(_) => StatusCode::BAD_REQUEST,
            AppError::ReceiverNotFound(_) | AppError::OperationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = ?self, "request failed");
            "An internal error occurred. Please try again later.".to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
