//! Charger status endpoint client
//!
//! Uses ureq (sync HTTP); the monitor runs each fetch on a blocking task so
//! Ctrl+C can interrupt a slow request.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Target used when none is given on the command line
pub const DEFAULT_TARGET: &str = "10.110.73.155";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("invalid status payload: {0}")]
    Decode(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Body of `GET /api/v2/charger/status`. Only the fields the monitor reads
/// are modelled; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub batteries: Vec<BatteryStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    #[serde(default)]
    pub slot_state: String,
    #[serde(default)]
    pub battery_detected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DetectionDebug>,
}

impl BatteryStatus {
    pub fn is_occupied(&self) -> bool {
        !self.slot_state.eq_ignore_ascii_case("empty")
    }
}

/// Firmware detection internals for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionDebug {
    /// Median AAA_ON baseline
    #[serde(rename = "voltageAAA_mv", default)]
    pub on_mv: i64,
    /// AAA_OFF reading
    #[serde(rename = "voltageAA_mv", default)]
    pub off_mv: i64,
    #[serde(rename = "voltageDelta_mv", default)]
    pub delta_mv: i64,
    #[serde(rename = "lastDetection_ms", default)]
    pub last_detection_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub median_cycle_selected: u32,
}

/// Anything that can produce a status snapshot once per cycle
pub trait StatusSource: Send + Sync {
    fn fetch(&self) -> FetchResult<StatusSnapshot>;

    /// Human-readable location, for headers and logs
    fn endpoint(&self) -> &str;
}

/// Normalize a CLI target into a base URL.
///
/// A bare host or IP gets `http://` and `default_port`; a full `http(s)://`
/// URL keeps its scheme and authority and loses any path.
pub fn build_base_url(target: &str, default_port: u16) -> String {
    let target = target.trim();
    let target = if target.is_empty() { DEFAULT_TARGET } else { target };

    for scheme in ["http://", "https://"] {
        let Some(prefix) = target.get(..scheme.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(scheme) {
            let rest = &target[scheme.len()..];
            let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
            return format!("{}{}", scheme, authority);
        }
    }

    format!("http://{}:{}", target, default_port)
}

/// Status source backed by the charger's HTTP API
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    agent: ureq::Agent,
    base_url: String,
    url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>, status_path: &str, timeout: Duration) -> Self {
        let base_url = base_url.into();
        let path = if status_path.starts_with('/') {
            status_path.to_string()
        } else {
            format!("/{}", status_path)
        };
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        Self {
            agent: make_agent(timeout),
            base_url,
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl StatusSource for HttpStatusSource {
    fn fetch(&self) -> FetchResult<StatusSnapshot> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status(status));
        }

        response
            .into_body()
            .read_json()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_base_url() {
        assert_eq!(build_base_url("10.0.0.5", 8000), "http://10.0.0.5:8000");
        assert_eq!(build_base_url("my-host.local", 8000), "http://my-host.local:8000");
        assert_eq!(build_base_url("http://10.0.0.5:8000", 8000), "http://10.0.0.5:8000");
        assert_eq!(
            build_base_url("https://abcd.trycloudflare.com/some/path?x=1", 8000),
            "https://abcd.trycloudflare.com"
        );
        assert_eq!(build_base_url("", 8000), "http://10.110.73.155:8000");
        assert_eq!(build_base_url("10.0.0.5", 9000), "http://10.0.0.5:9000");
    }

    #[test]
    fn test_status_url_joins_path() {
        let source = HttpStatusSource::new("http://h:1/", "api/v2/charger/status", Duration::from_secs(1));
        assert_eq!(source.url(), "http://h:1/api/v2/charger/status");
        assert_eq!(source.endpoint(), "http://h:1/");
    }

    #[test]
    fn test_snapshot_decodes_firmware_payload() {
        let body = r#"{
            "batteries": [
                {"slotState": "empty", "batteryDetected": "none"},
                {"slotState": "charging", "batteryDetected": "KLVR-AA",
                 "debug": {"voltageAAA_mv": 952, "voltageAA_mv": 950, "voltageDelta_mv": 2,
                           "lastDetection_ms": 123456, "retryCount": 1, "medianCycleSelected": 2}},
                {"slotState": "idle", "batteryDetected": "KLVR-AAA",
                 "debug": {"voltageAAA_mv": 1250, "voltageAA_mv": 950, "voltageDelta_mv": 300,
                           "lastDetection_ms": 1}}
            ],
            "firmware": "1.8.3"
        }"#;
        let snapshot: StatusSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.batteries.len(), 3);
        assert!(!snapshot.batteries[0].is_occupied());
        let debug = snapshot.batteries[1].debug.unwrap();
        assert_eq!((debug.on_mv, debug.off_mv, debug.delta_mv), (952, 950, 2));
        assert_eq!(debug.retry_count, 1);
        assert_eq!(debug.median_cycle_selected, 2);
        assert_eq!(snapshot.batteries[2].debug.unwrap().retry_count, 0);
    }
}
