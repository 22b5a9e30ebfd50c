use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::PoolError;
use serde::Serialize;
use shared::ShopError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything a handler can fail with. Domain errors keep their message;
/// infrastructure errors are logged and reported generically.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Shop(#[from] ShopError),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<PoolError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Shop(err) => match err {
                ShopError::Validation(_) | ShopError::Conflict(_) => StatusCode::BAD_REQUEST,
                ShopError::NotFound(_) | ShopError::EmptyCatalog => StatusCode::NOT_FOUND,
                ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
                ShopError::InsufficientStock { .. } | ShopError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                ShopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(DieselError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::CheckViolation,
                _,
            )) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Pool(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Shop(ShopError::Storage(_)) => "internal server error".to_string(),
            ApiError::Shop(err) => err.to_string(),
            ApiError::Database(DieselError::NotFound) => "not found".to_string(),
            ApiError::Database(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                "record already exists".to_string()
            }
            ApiError::Database(DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _)) => {
                "value is out of the allowed range".to_string()
            }
            _ => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::OrderStatus;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (ShopError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ShopError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ShopError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ShopError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ShopError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ShopError::EmptyCatalog, StatusCode::NOT_FOUND),
            (
                ShopError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (ShopError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(anyhow::anyhow!("password=hunter2 connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");

        let err = ApiError::from(ShopError::Storage("/var/db locked".into()));
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn check_violations_are_client_errors() {
        let err = ApiError::from(DieselError::DatabaseError(
            DatabaseErrorKind::CheckViolation,
            Box::new("cart_items_quantity_check".to_string()),
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "value is out of the allowed range");
    }

    #[test]
    fn diesel_not_found_is_404() {
        assert_eq!(ApiError::from(DieselError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(DieselError::RollbackTransaction).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
