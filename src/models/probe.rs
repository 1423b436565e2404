use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric recorded when a probe's output has no throughput line
pub const NO_THROUGHPUT_DATA: &str = "No throughput data";

/// One directed throughput measurement as declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub source: String,
    pub destination: String,
    /// Free-text traffic-class tag, e.g. "TCP Bulk" or "UDP Streaming"
    pub label: String,
}

impl ProbeSpec {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            label: label.into(),
        }
    }

    pub fn traffic_class(&self) -> TrafficClass {
        TrafficClass::from_label(&self.label)
    }
}

/// Transport mode a probe is driven with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficClass {
    /// Reliable stream (TCP)
    Stream,
    /// Bounded-rate datagrams (UDP)
    Datagram,
}

impl TrafficClass {
    /// Labels mentioning UDP select datagram mode, everything else is a stream
    pub fn from_label(label: &str) -> Self {
        if label.to_ascii_uppercase().contains("UDP") {
            TrafficClass::Datagram
        } else {
            TrafficClass::Stream
        }
    }
}

/// Outcome of one probe, appended once to the campaign log and never changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "type")]
    pub label: String,
    pub source: String,
    pub destination: String,
    /// First throughput line of the client output, or [`NO_THROUGHPUT_DATA`]
    pub result: String,
    #[serde(with = "epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Execution failure seen while probing; kept in memory for diagnostics only
    #[serde(skip)]
    pub failure: Option<String>,
}

impl ProbeResult {
    pub fn has_data(&self) -> bool {
        self.result != NO_THROUGHPUT_DATA
    }
}

/// Serializes timestamps as fractional UNIX seconds
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let seconds = value.timestamp() as f64 + f64::from(value.timestamp_subsec_micros()) / 1e6;
        serializer.serialize_f64(seconds)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        let micros = (seconds * 1e6).round() as i64;
        DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {seconds}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_class_from_label() {
        assert_eq!(TrafficClass::from_label("UDP Streaming"), TrafficClass::Datagram);
        assert_eq!(TrafficClass::from_label("udp voice"), TrafficClass::Datagram);
        assert_eq!(TrafficClass::from_label("TCP Bulk"), TrafficClass::Stream);
        assert_eq!(TrafficClass::from_label("HTTP-like"), TrafficClass::Stream);
        assert_eq!(TrafficClass::from_label(""), TrafficClass::Stream);
    }

    #[test]
    fn test_probe_result_field_names() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        let result = ProbeResult {
            label: "TCP Bulk".to_string(),
            source: "h1".to_string(),
            destination: "h3".to_string(),
            result: NO_THROUGHPUT_DATA.to_string(),
            timestamp,
            failure: Some("timed out".to_string()),
        };

        let value = serde_json::to_value(&result).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["destination", "result", "source", "timestamp", "type"]);
        assert_eq!(object["type"], "TCP Bulk");
        assert_eq!(object["timestamp"].as_f64().unwrap(), 1_700_000_000.5);

        let back: ProbeResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.timestamp, timestamp);
        assert_eq!(back.failure, None);
        assert!(!back.has_data());
    }
}
