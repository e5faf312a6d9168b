use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::query::ValidationFailure;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ServerError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
