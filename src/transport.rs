//! HTTP transport for service calls
//!
//! The negotiator and resolver only see the [`Transport`] trait, so tests can
//! script responses without a network.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GlucoseError, Result};
use crate::protocol::{ApiRequest, Method};

/// Upper bound on every call to the service
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body quoted in a transport error
const ERROR_BODY_PREVIEW: usize = 200;

/// Sends one request and returns the parsed JSON body.
///
/// Implementations return the body of non-2xx responses when it is valid
/// JSON, so the caller can read the service's own status and message.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Send with a hard deadline, whatever the transport does internally
pub async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    request: ApiRequest,
    timeout: Duration,
) -> Result<Value> {
    debug!("{:?} {}", request.method, request.url);
    match tokio::time::timeout(timeout, transport.send(request)).await {
        Ok(result) => result,
        Err(_) => Err(GlucoseError::Transport("Request timed out".into())),
    }
}

/// Decode a response body, reporting shape mismatches as transport failures
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| GlucoseError::Transport(format!("Failed to parse response: {}", e)))
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GlucoseError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| request_error("Network error", e))?;

        let status = response.status();
        info!("Response status: {} for {}", status.as_u16(), request.url);

        let text = response
            .text()
            .await
            .map_err(|e| request_error("Failed to read response", e))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(body),
            Err(e) if status.is_success() => Err(GlucoseError::Transport(format!(
                "Failed to parse response: {}",
                e
            ))),
            Err(_) => {
                let detail = if text.is_empty() {
                    "No response body".to_string()
                } else {
                    text.chars().take(ERROR_BODY_PREVIEW).collect()
                };
                Err(GlucoseError::Transport(format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    detail
                )))
            }
        }
    }
}

fn request_error(context: &str, e: reqwest::Error) -> GlucoseError {
    if e.is_timeout() {
        GlucoseError::Transport("Request timed out".into())
    } else {
        GlucoseError::Transport(format!("{} - {}", context, e))
    }
}
