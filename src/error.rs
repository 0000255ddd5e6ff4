use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// Allowlist mutations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid IP address: {0:?}")]
    InvalidIp(String),
}

// Failures of an admitted request on its way to the upstream
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("invalid upstream URL: {0}")]
    UpstreamConfig(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::UpstreamConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), "Error").into_response()
    }
}

// Rejected admin form input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdminError {
    #[error("IP address required")]
    MissingIp,
    #[error("Invalid IP")]
    InvalidIp,
    #[error("Duration required")]
    MissingDuration,
    #[error("Invalid duration")]
    InvalidDuration,
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidIp(_) => AdminError::InvalidIp,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
