//! API handlers module

pub mod comparisons;
pub mod conversation;
pub mod documents;
pub mod health;
pub mod sessions;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path},
    http::request::Parts,
};
use paperlens_common::errors::AppError;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Path parameters whose rejection uses the API error envelope
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.body_text(),
            })?;
        Ok(ApiPath(value))
    }
}

/// Turn a JSON body rejection into the API error envelope
pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::InvalidFormat {
        message: rejection.body_text(),
    }
}

/// Run derive-based validation on a request body
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(|e| {
        let field = e.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: e.to_string(),
            field,
        }
    })
}
