//! Request body extraction
//!
//! `axum::Json` answers a bad body with a plain-text 422. Routes take
//! [`ApiJson`] instead so the client gets the usual `ErrorResponse`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use tracing::debug;

use super::errors::ApiError;

/// JSON body whose rejection is a 400 [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "REQUEST_BODY_REJECTED");
                Err(ApiError::bad_request(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}
