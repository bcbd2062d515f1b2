//! Wire types for the attendance store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::BreakInterval;

/// Canonical attendance record as served by the store.
///
/// Field names follow the store's JSON (`clockIn`, `clockOut`, `breaks`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub clock_in: DateTime<Utc>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
}

impl AttendanceRecord {
    /// Whether the record still describes a running session.
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }
}

/// Payload of the manual clock-out correction command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualClockOut {
    pub clock_out_time: DateTime<Utc>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_decodes_store_json() {
        let json = r#"{
            "clockIn": "2025-03-10T09:00:00Z",
            "clockOut": null,
            "breaks": [
                {"start": "2025-03-10T10:00:00Z", "end": "2025-03-10T10:15:00Z"},
                {"start": "2025-03-10T12:00:00Z"}
            ]
        }"#;
        let record: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_open());
        assert_eq!(record.breaks.len(), 2);
        assert!(record.breaks[1].end.is_none());
    }

    #[test]
    fn manual_clock_out_serializes_camel_case() {
        let payload = ManualClockOut {
            clock_out_time: "2025-03-10T18:00:00Z".parse().unwrap(),
            reason: "forgot to clock out".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("clockOutTime").is_some());
        assert_eq!(json["reason"], "forgot to clock out");
    }
}
