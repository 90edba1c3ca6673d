use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::RepositoryError;

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        RepositoryError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        RepositoryError::Constraint(msg) => {
            json_error(StatusCode::CONFLICT, "constraint_violation", msg)
        }
        RepositoryError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

/// Response for a path parameter that failed to parse into a typed id.
pub fn invalid_id_response(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
