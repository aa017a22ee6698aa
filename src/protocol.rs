//! LibreLinkUp wire format: endpoints, headers and response bodies
//!
//! Field names follow the service exactly, including the PascalCase keys of
//! the glucose measurement.

use serde::Deserialize;
use serde_json::Value;

use crate::config::Credentials;

pub const LOGIN_ENDPOINT: &str = "/llu/auth/login";
pub const CONNECTIONS_ENDPOINT: &str = "/llu/connections";
pub const PRODUCT: &str = "llu.android";

/// Header carrying the hashed account id on authenticated calls
pub const ACCOUNT_ID_HEADER: &str = "account-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single call to the service, independent of the HTTP library
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, host: &str, endpoint: &str, client_version: &str) -> Self {
        Self {
            method,
            url: format!("{}{}", host.trim_end_matches('/'), endpoint),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("product", PRODUCT.to_string()),
                ("version", client_version.to_string()),
            ],
            body: None,
        }
    }

    /// `POST /llu/auth/login` with the credentials as body
    pub fn login(host: &str, client_version: &str, credentials: &Credentials) -> Self {
        let mut request = Self::new(Method::Post, host, LOGIN_ENDPOINT, client_version);
        request.body = Some(serde_json::json!({
            "email": credentials.username,
            "password": credentials.password,
        }));
        request
    }

    /// `GET /llu/connections` authorized with a bearer token
    pub fn connections(
        host: &str,
        client_version: &str,
        token: &str,
        account_hash: Option<&str>,
    ) -> Self {
        let mut request = Self::new(Method::Get, host, CONNECTIONS_ENDPOINT, client_version);
        request
            .headers
            .push(("Authorization", format!("Bearer {}", token)));
        if let Some(hash) = account_hash {
            request.headers.push((ACCOUNT_ID_HEADER, hash.to_string()));
        }
        request
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Envelope wrapping every service response; `status == 0` is success
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: i64,
    pub data: Option<T>,
    pub error: Option<ServiceError>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Service-provided error message, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginData {
    pub redirect: bool,
    pub region: Option<String>,
    pub auth_ticket: Option<AuthTicket>,
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct AuthTicket {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
}

/// A linked patient visible to the logged-in account
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Connection {
    pub patient_id: Option<String>,
    pub glucose_measurement: Option<RawGlucoseMeasurement>,
}

/// Latest sensor measurement embedded in a connection
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawGlucoseMeasurement {
    #[serde(rename = "ValueInMgPerDl")]
    pub value_in_mg_per_dl: Option<f64>,
    #[serde(rename = "Value")]
    pub value: Option<f64>,
    #[serde(rename = "TrendArrow")]
    pub trend_arrow: Option<i64>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
    #[serde(rename = "isHigh")]
    pub is_high: bool,
    #[serde(rename = "isLow")]
    pub is_low: bool,
}

impl RawGlucoseMeasurement {
    /// mg/dL value, preferring the explicit mg/dL field
    pub fn mg_dl(&self) -> Option<f64> {
        self.value_in_mg_per_dl.or(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "me@example.com".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn test_login_request() {
        let request = ApiRequest::login("https://api.libreview.io", "4.16.0", &credentials());

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://api.libreview.io/llu/auth/login");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("product"), Some("llu.android"));
        assert_eq!(request.header("version"), Some("4.16.0"));
        assert_eq!(request.header("Authorization"), None);
        assert_eq!(
            request.body,
            Some(serde_json::json!({ "email": "me@example.com", "password": "hunter2" }))
        );
    }

    #[test]
    fn test_connections_request() {
        let request =
            ApiRequest::connections("https://api-eu.libreview.io/", "4.16.0", "tok", Some("abc"));

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://api-eu.libreview.io/llu/connections");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header(ACCOUNT_ID_HEADER), Some("abc"));
        assert_eq!(request.body, None);

        let request = ApiRequest::connections("https://api-eu.libreview.io", "4.16.0", "tok", None);
        assert_eq!(request.header(ACCOUNT_ID_HEADER), None);
    }

    #[test]
    fn test_parse_login_redirect() {
        let envelope: Envelope<LoginData> = serde_json::from_value(serde_json::json!({
            "status": 0,
            "data": { "redirect": true, "region": "eu" }
        }))
        .unwrap();

        assert!(envelope.is_success());
        let data = envelope.data.unwrap();
        assert!(data.redirect);
        assert_eq!(data.region.as_deref(), Some("eu"));
        assert!(data.auth_ticket.is_none());
    }

    #[test]
    fn test_parse_service_error() {
        let envelope: Envelope<LoginData> = serde_json::from_value(serde_json::json!({
            "status": 2,
            "error": { "message": "notAuthenticated" }
        }))
        .unwrap();

        assert!(!envelope.is_success());
        assert_eq!(envelope.error_message(), Some("notAuthenticated"));
    }

    #[test]
    fn test_parse_measurement() {
        let connection: Connection = serde_json::from_value(serde_json::json!({
            "patientId": "p1",
            "firstName": "Ada",
            "glucoseMeasurement": {
                "ValueInMgPerDl": 104,
                "Value": 5.8,
                "TrendArrow": 3,
                "Timestamp": "1/2/2024 10:15:00 AM",
                "isHigh": false,
                "isLow": false
            }
        }))
        .unwrap();

        let measurement = connection.glucose_measurement.unwrap();
        assert_eq!(measurement.mg_dl(), Some(104.0));
        assert_eq!(measurement.trend_arrow, Some(3));

        let fallback = RawGlucoseMeasurement {
            value: Some(90.0),
            ..Default::default()
        };
        assert_eq!(fallback.mg_dl(), Some(90.0));
    }
}
