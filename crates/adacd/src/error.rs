//! Errors surfaced to HTTP callers

use adac_common::TopologyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Configuration error: {0}")]
    Topology(#[from] TopologyError),
}

impl ControlError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Topology(TopologyError::NodeNotFound(_))
            | Self::Topology(TopologyError::NotInTopology(_)) => StatusCode::NOT_FOUND,
            Self::Topology(TopologyError::Malformed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        warn!("Request failed: {}", self);
        (self.status(), self.to_string()).into_response()
    }
}
