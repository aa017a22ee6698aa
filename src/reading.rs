//! Current glucose reading from the connections endpoint
//!
//! `/llu/connections` lists the patients linked to the account, each with
//! its latest measurement embedded, so one call is enough. Only the first
//! connection is used.

use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{GlucoseError, Result};
use crate::protocol::{ApiRequest, Connection, Envelope, RawGlucoseMeasurement};
use crate::session::Session;
use crate::transport::{decode, dispatch, Transport, REQUEST_TIMEOUT};
use crate::trend::arrow_for;
use crate::units::{GlucoseUnit, MgDl, Thresholds};

/// Display-ready reading, serialized with the field names the widget reads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReading {
    /// Value in the display unit
    #[serde(rename = "value")]
    pub display_value: String,
    #[serde(rename = "rawValue")]
    pub raw_mg_dl: f64,
    /// One decimal, for display only
    pub mmol_value: String,
    #[serde(rename = "trend")]
    pub trend_code: Option<i64>,
    #[serde(rename = "arrow")]
    pub trend_arrow: &'static str,
    pub level: &'static str,
    pub color: &'static str,
    pub unit: GlucoseUnit,
    pub timestamp: Option<String>,
    pub is_high: bool,
    pub is_low: bool,
}

/// Normalize a service measurement for display.
///
/// Returns `None` when the measurement carries no value at all.
pub fn normalize(
    measurement: &RawGlucoseMeasurement,
    unit: GlucoseUnit,
    thresholds: &Thresholds,
) -> Option<NormalizedReading> {
    let raw = MgDl::from(measurement.mg_dl()?);
    let mmol = raw.to_mmol();
    let level = thresholds.classify(mmol);

    Some(NormalizedReading {
        display_value: unit.format_value(raw),
        raw_mg_dl: raw.0,
        mmol_value: mmol.format_value(),
        trend_code: measurement.trend_arrow,
        trend_arrow: arrow_for(measurement.trend_arrow),
        level: level.label(),
        color: level.color(),
        unit,
        timestamp: measurement.timestamp.clone(),
        is_high: measurement.is_high,
        is_low: measurement.is_low,
    })
}

/// Fetches and normalizes the primary patient's reading
pub struct ReadingResolver<'a, T: Transport + ?Sized> {
    transport: &'a T,
    timeout: Duration,
}

impl<'a, T: Transport + ?Sized> ReadingResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, session: &Session, config: &Config) -> Result<NormalizedReading> {
        let request = ApiRequest::connections(
            &session.region_host,
            &config.client_version,
            &session.token,
            session.account_hash.as_deref(),
        );
        let body = dispatch(self.transport, request, self.timeout).await?;
        let envelope: Envelope<Value> = decode(body)?;

        if !envelope.is_success() {
            warn!("Connections rejected with status {}", envelope.status);
            let message = envelope
                .error_message()
                .unwrap_or("Failed to get connections");
            return Err(GlucoseError::Resolution(message.to_string()));
        }

        let connections: Vec<Connection> = match envelope.data {
            Some(data) => decode(data)?,
            None => Vec::new(),
        };
        info!("{} linked patient(s)", connections.len());

        let primary = connections
            .into_iter()
            .next()
            .ok_or_else(|| GlucoseError::Resolution("No linked patients found".into()))?;
        if let Some(patient_id) = &primary.patient_id {
            info!("Reading patient {}", patient_id);
        }

        primary
            .glucose_measurement
            .as_ref()
            .and_then(|m| normalize(m, config.glucose_unit, &config.thresholds()))
            .ok_or_else(|| GlucoseError::Resolution("No glucose measurement".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ACCOUNT_ID_HEADER;
    use crate::transport::testing::{HangingTransport, ScriptedTransport};
    use serde_json::json;

    fn measurement(mg_dl: f64, trend: i64) -> RawGlucoseMeasurement {
        RawGlucoseMeasurement {
            value_in_mg_per_dl: Some(mg_dl),
            trend_arrow: Some(trend),
            timestamp: Some("1/2/2024 10:15:00 AM".into()),
            ..Default::default()
        }
    }

    fn session(account_hash: Option<&str>) -> Session {
        Session {
            token: "tok".into(),
            account_hash: account_hash.map(String::from),
            region_host: "https://api-eu.libreview.io".into(),
        }
    }

    fn connections(data: Value) -> Value {
        json!({ "status": 0, "data": data })
    }

    #[test]
    fn test_normal_reading() {
        let reading = normalize(&measurement(100.0, 4), GlucoseUnit::MmolL, &Thresholds::new(4.0, 10.0))
            .unwrap();

        assert_eq!(reading.display_value, "5.5");
        assert_eq!(reading.mmol_value, "5.5");
        assert_eq!(reading.raw_mg_dl, 100.0);
        assert_eq!(reading.level, "");
        assert_eq!(reading.color, "#43A047");
        assert_eq!(reading.trend_arrow, "→");
    }

    #[test]
    fn test_low_reading() {
        let reading = normalize(&measurement(60.0, 2), GlucoseUnit::MmolL, &Thresholds::new(4.0, 10.0))
            .unwrap();

        assert_eq!(reading.mmol_value, "3.3");
        assert_eq!(reading.level, "LOW");
        assert_eq!(reading.color, "#E53935");
        assert_eq!(reading.trend_arrow, "↓");
    }

    #[test]
    fn test_high_reading_in_mgdl() {
        let reading = normalize(&measurement(250.0, 7), GlucoseUnit::MgDl, &Thresholds::new(4.0, 10.0))
            .unwrap();

        assert_eq!(reading.display_value, "250");
        assert_eq!(reading.mmol_value, "13.9");
        assert_eq!(reading.level, "HIGH");
        assert_eq!(reading.color, "#FB8C00");
        assert_eq!(reading.unit, GlucoseUnit::MgDl);
    }

    #[test]
    fn test_unknown_trend_codes_have_no_arrow() {
        let thresholds = Thresholds::default();
        for code in [0, 8] {
            let reading = normalize(&measurement(100.0, code), GlucoseUnit::MmolL, &thresholds).unwrap();
            assert_eq!(reading.trend_arrow, "");
            assert_eq!(reading.trend_code, Some(code));
        }
    }

    #[test]
    fn test_value_fallback_and_missing_value() {
        let thresholds = Thresholds::default();
        let fallback = RawGlucoseMeasurement {
            value: Some(180.0),
            ..Default::default()
        };
        let reading = normalize(&fallback, GlucoseUnit::MgDl, &thresholds).unwrap();
        assert_eq!(reading.display_value, "180");

        assert!(normalize(&RawGlucoseMeasurement::default(), GlucoseUnit::MgDl, &thresholds).is_none());
    }

    #[test]
    fn test_output_field_names() {
        let reading = normalize(&measurement(100.0, 4), GlucoseUnit::MmolL, &Thresholds::default())
            .unwrap();
        let value = serde_json::to_value(&reading).unwrap();

        assert_eq!(
            value,
            json!({
                "value": "5.5",
                "rawValue": 100.0,
                "mmolValue": "5.5",
                "trend": 4,
                "arrow": "→",
                "level": "",
                "color": "#43A047",
                "unit": "mmol/L",
                "timestamp": "1/2/2024 10:15:00 AM",
                "isHigh": false,
                "isLow": false
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_first_connection() {
        let transport = ScriptedTransport::new().respond(connections(json!([
            { "patientId": "p1", "glucoseMeasurement": { "ValueInMgPerDl": 60, "TrendArrow": 3 } },
            { "patientId": "p2", "glucoseMeasurement": { "ValueInMgPerDl": 250, "TrendArrow": 5 } }
        ])));

        let reading = ReadingResolver::new(&transport)
            .resolve(&session(Some("abc")), &Config::default())
            .await
            .unwrap();

        assert_eq!(reading.raw_mg_dl, 60.0);
        assert_eq!(reading.level, "LOW");
        assert_eq!(reading.trend_arrow, "↘");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api-eu.libreview.io/llu/connections");
        assert_eq!(requests[0].header("Authorization"), Some("Bearer tok"));
        assert_eq!(requests[0].header(ACCOUNT_ID_HEADER), Some("abc"));
    }

    #[tokio::test]
    async fn test_resolve_without_account_hash_omits_header() {
        let transport = ScriptedTransport::new().respond(connections(json!([
            { "glucoseMeasurement": { "Value": 100 } }
        ])));

        ReadingResolver::new(&transport)
            .resolve(&session(None), &Config::default())
            .await
            .unwrap();

        assert_eq!(transport.requests()[0].header(ACCOUNT_ID_HEADER), None);
    }

    #[tokio::test]
    async fn test_no_linked_patients() {
        for data in [json!([]), Value::Null] {
            let transport = ScriptedTransport::new().respond(connections(data));
            let err = ReadingResolver::new(&transport)
                .resolve(&session(None), &Config::default())
                .await
                .unwrap_err();
            assert!(matches!(err, GlucoseError::Resolution(ref m) if m == "No linked patients found"));
        }
    }

    #[tokio::test]
    async fn test_no_glucose_measurement() {
        let transport = ScriptedTransport::new().respond(connections(json!([{ "patientId": "p1" }])));
        let err = ReadingResolver::new(&transport)
            .resolve(&session(None), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlucoseError::Resolution(ref m) if m == "No glucose measurement"));
    }

    #[tokio::test]
    async fn test_service_rejection() {
        let transport = ScriptedTransport::new()
            .respond(json!({ "status": 401, "error": { "message": "Unauthorized" } }));
        let err = ReadingResolver::new(&transport)
            .resolve(&session(None), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlucoseError::Resolution(ref m) if m == "Unauthorized"));

        let transport = ScriptedTransport::new().respond(json!({ "status": 920 }));
        let err = ReadingResolver::new(&transport)
            .resolve(&session(None), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlucoseError::Resolution(ref m) if m == "Failed to get connections"));
    }

    #[tokio::test]
    async fn test_resolve_times_out() {
        let err = ReadingResolver::new(&HangingTransport)
            .timeout(Duration::from_millis(20))
            .resolve(&session(None), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlucoseError::Transport(_)));
    }
}
