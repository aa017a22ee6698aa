//! Error types for the LibreLinkUp client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoseError {
    #[error("Not configured - set credentials in settings")]
    NotConfigured,

    /// Network, timeout or response parsing failure below the service protocol
    #[error("Request failed: {0}")]
    Transport(String),

    /// Login rejected, redirect loop, or no token issued
    #[error("{0}")]
    Auth(String),

    /// Authenticated call rejected, or no usable reading in the response
    #[error("{0}")]
    Resolution(String),

    #[error("Config load failed: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GlucoseError {
    /// The `{"error": ...}` object handed to the widget
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

pub type Result<T> = std::result::Result<T, GlucoseError>;
