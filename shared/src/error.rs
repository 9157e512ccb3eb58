use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("{0}")]
    UnavailableDates(String),
    #[error("the requested dates kept conflicting with concurrent bookings")]
    ConflictRetryExceeded,
    #[error("transaction error")]
    TransactionError(#[source] sqlx::Error),
    #[error("database operation error")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("{0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    KeyValueStoreError(#[from] redis::RedisError),
    #[error("{0}")]
    BcryptError(#[from] bcrypt::BcryptError),
    #[error("{0}")]
    ConvertToUuidError(#[from] uuid::Error),
    #[error("authentication is required")]
    UnauthenticatedError,
    #[error("authorization failed")]
    UnauthorizedError,
    #[error("the operation is not permitted for this user")]
    ForbiddenOperation,
    #[error("{0}")]
    ConversionEntityError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self {
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::ConvertToUuidError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnavailableDates(_) => StatusCode::CONFLICT,
            AppError::ConflictRetryExceeded => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UnauthenticatedError => StatusCode::UNAUTHORIZED,
            AppError::UnauthorizedError | AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
            e @ (AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::KeyValueStoreError(_)
            | AppError::BcryptError(_)
            | AppError::ConversionEntityError(_)) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Unexpected error happened"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        status_code.into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_dates_maps_to_conflict() {
        let res = AppError::UnavailableDates("already reserved".into()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn exhausted_retries_map_to_service_unavailable() {
        let res = AppError::ConflictRetryExceeded.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn forbidden_operation_maps_to_forbidden() {
        let res = AppError::ForbiddenOperation.into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_entity_maps_to_not_found() {
        let res = AppError::EntityNotFound("reservation not found".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
