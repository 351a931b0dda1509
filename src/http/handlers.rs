use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::application::{AppError, OperationService};
use crate::domain::OperationId;

use super::types::{CreateOperationRequest, OperationEnvelope, OperationRecord};

/// POST /operations
pub async fn create_operation(
    State(service): State<OperationService>,
    payload: Result<Json<CreateOperationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OperationEnvelope>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let (receiver_id, gross_value) = request.validate()?;

    let operation = service.create_operation(&receiver_id, gross_value).await?;

    Ok((
        StatusCode::CREATED,
        Json(OperationEnvelope {
            message: "Awaiting confirmation.",
            operation: operation.into(),
        }),
    ))
}

/// GET /operations/{id}
pub async fn get_operation(
    State(service): State<OperationService>,
    Path(id): Path<String>,
) -> Result<Json<OperationRecord>, AppError> {
    let operation = service.get_operation(parse_operation_id(&id)?).await?;
    Ok(Json(operation.into()))
}

/// POST /operations/{id}/confirm
pub async fn confirm_operation(
    State(service): State<OperationService>,
    Path(id): Path<String>,
) -> Result<Json<OperationEnvelope>, AppError> {
    let operation = service.confirm_operation(parse_operation_id(&id)?).await?;
    Ok(Json(OperationEnvelope {
        message: "Operation confirmed.",
        operation: operation.into(),
    }))
}

// An id that is not a UUID cannot name any stored operation.
fn parse_operation_id(id: &str) -> Result<OperationId, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::OperationNotFound(id.to_string()))
}
