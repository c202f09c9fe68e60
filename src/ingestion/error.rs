use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Request body must be a JSON array of stories: {0}")]
    MalformedRequest(String),

    #[error("No valid \"index\" fields found in the input array")]
    NoValidKeys,

    #[error("Storage failure: {0:#}")]
    StorageFailure(anyhow::Error),
}

impl From<anyhow::Error> for IngestError {
    fn from(err: anyhow::Error) -> Self {
        IngestError::StorageFailure(err)
    }
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::MalformedRequest(_) | IngestError::NoValidKeys => StatusCode::BAD_REQUEST,
            IngestError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            IngestError::StorageFailure(_) => {
                tracing::error!("{}", self);
                (status, "An internal error occurred").into_response()
            }
            other => {
                tracing::warn!("Rejected request: {}", other);
                (status, other.to_string()).into_response()
            }
        }
    }
}
