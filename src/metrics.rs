use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single health reading of the monitored link, as served by the backend.
///
/// Every field is optional. A field whose JSON value has an unexpected type
/// decodes as `None` instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rssi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub router_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub linux_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
}

impl Snapshot {
    /// Device id, skipping the empty string.
    pub fn device_id(&self) -> Option<&str> {
        self.device.as_deref().filter(|d| !d.is_empty())
    }
}

/// Body of `/api/latest`.
///
/// Before the collector has written its first reading the backend answers
/// with `{"error": "...", "path": "..."}` instead of a snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// Summary of link health at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Ok,
    Degraded,
    Down,
    Recovering,
    Unknown,
}

impl ConnectivityState {
    pub fn parse(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "OK" => ConnectivityState::Ok,
            "DEGRADED" => ConnectivityState::Degraded,
            "DOWN" => ConnectivityState::Down,
            "RECOVERING" => ConnectivityState::Recovering,
            _ => ConnectivityState::Unknown,
        }
    }

    pub fn class(self) -> Option<StateClass> {
        match self {
            ConnectivityState::Ok => Some(StateClass::Ok),
            ConnectivityState::Degraded => Some(StateClass::Degraded),
            ConnectivityState::Down => Some(StateClass::Down),
            ConnectivityState::Recovering => Some(StateClass::Recovering),
            ConnectivityState::Unknown => None,
        }
    }
}

/// Visual style attached to the state field. `None` in a view means neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Ok,
    Degraded,
    Down,
    Recovering,
}

impl StateClass {
    pub fn name(self) -> &'static str {
        match self {
            StateClass::Ok => "ok",
            StateClass::Degraded => "degraded",
            StateClass::Down => "down",
            StateClass::Recovering => "recovering",
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_fields_decode_as_none() {
        let snap: Snapshot =
            serde_json::from_str(r#"{"ts":"2026-02-03T04:12:30Z","rssi":null}"#).unwrap();
        assert_eq!(snap.ts.as_deref(), Some("2026-02-03T04:12:30Z"));
        assert_eq!(snap.rssi, None);
        assert_eq!(snap.router_ms, None);
        assert_eq!(snap.device, None);
    }

    #[test]
    fn wrong_typed_fields_are_dropped_not_fatal() {
        let snap: Snapshot =
            serde_json::from_str(r#"{"ts":5,"rssi":"strong","router_ms":12,"device":["x"]}"#)
                .unwrap();
        assert_eq!(snap.ts, None);
        assert_eq!(snap.rssi, None);
        assert_eq!(snap.router_ms, Some(12.0));
        assert_eq!(snap.device, None);
    }

    #[test]
    fn empty_device_is_not_an_id() {
        let snap = Snapshot {
            device: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(snap.device_id(), None);
    }

    #[test]
    fn latest_payload_separates_backend_error() {
        let payload: LatestPayload = serde_json::from_str(
            r#"{"error":"latest.json not found yet","path":"/var/log/netmon/latest.json"}"#,
        )
        .unwrap();
        assert_eq!(payload.error.as_deref(), Some("latest.json not found yet"));
        assert_eq!(payload.snapshot, Snapshot::default());

        let payload: LatestPayload =
            serde_json::from_str(r#"{"state":"ok","device":"esp32-a","rssi":-61}"#).unwrap();
        assert!(payload.error.is_none());
        assert_eq!(payload.snapshot.device_id(), Some("esp32-a"));
        assert_eq!(payload.snapshot.rssi, Some(-61.0));
    }

    #[test]
    fn state_parsing_is_case_insensitive() {
        assert_eq!(ConnectivityState::parse("degraded"), ConnectivityState::Degraded);
        assert_eq!(ConnectivityState::parse("Recovering"), ConnectivityState::Recovering);
        assert_eq!(ConnectivityState::parse("flapping"), ConnectivityState::Unknown);
        assert_eq!(ConnectivityState::Unknown.class(), None);
        assert_eq!(ConnectivityState::Down.class().map(StateClass::name), Some("down"));
    }
}
