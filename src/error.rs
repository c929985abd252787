use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Dumont4wpError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Search server {server} failed: {message}")]
    Backend { server: String, message: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Dumont4wpError>;

impl From<std::io::Error> for Dumont4wpError {
    fn from(e: std::io::Error) -> Self {
        Dumont4wpError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Dumont4wpError {
    fn from(e: serde_json::Error) -> Self {
        Dumont4wpError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for Dumont4wpError {
    fn from(e: reqwest::Error) -> Self {
        Dumont4wpError::Http(e.to_string())
    }
}

impl Dumont4wpError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Dumont4wpError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Dumont4wpError::Json(_) => StatusCode::BAD_REQUEST,
            Dumont4wpError::Http(_) => StatusCode::BAD_GATEWAY,
            Dumont4wpError::Backend { .. } => StatusCode::BAD_GATEWAY,
            Dumont4wpError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            Dumont4wpError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "axum-support")]
impl axum::response::IntoResponse for Dumont4wpError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
