//! Immutable value records produced by sensors and equipment.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// One timestamped, precision-rounded measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    value: f64,
    timestamp: Timestamp,
    sensor_id: DbId,
}

impl SensorReading {
    pub(crate) fn new(value: f64, timestamp: Timestamp, sensor_id: DbId) -> Self {
        Self {
            value,
            timestamp,
            sensor_id,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn sensor_id(&self) -> DbId {
        self.sensor_id
    }
}

/// Severity of a recorded alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// A recorded limit breach or fault tied to a sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    message: String,
    severity: AlarmSeverity,
    timestamp: Timestamp,
    sensor_id: DbId,
}

impl Alarm {
    pub(crate) fn new(
        message: String,
        severity: AlarmSeverity,
        timestamp: Timestamp,
        sensor_id: DbId,
    ) -> Self {
        Self {
            message,
            severity,
            timestamp,
            sensor_id,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> AlarmSeverity {
        self.severity
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn sensor_id(&self) -> DbId {
        self.sensor_id
    }
}

/// A maintenance intervention on a piece of equipment.
///
/// Only completed records count towards the maintenance schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceRecord {
    description: String,
    scheduled_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl MaintenanceRecord {
    /// A planned intervention that has not been carried out yet.
    pub fn scheduled(description: impl Into<String>, scheduled_at: Timestamp) -> Self {
        Self {
            description: description.into(),
            scheduled_at,
            completed_at: None,
        }
    }

    /// An intervention that was carried out at `completed_at`.
    pub fn completed(description: impl Into<String>, completed_at: Timestamp) -> Self {
        Self {
            description: description.into(),
            scheduled_at: completed_at,
            completed_at: Some(completed_at),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scheduled_at(&self) -> Timestamp {
        self.scheduled_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn severity_orders_by_impact() {
        assert!(AlarmSeverity::Low < AlarmSeverity::Medium);
        assert!(AlarmSeverity::High < AlarmSeverity::Critical);
    }

    #[test]
    fn alarm_serializes_lowercase_severity() {
        let alarm = Alarm::new("High alarm".into(), AlarmSeverity::High, Utc::now(), 4);
        let json = serde_json::to_value(&alarm).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["sensor_id"], 4);
    }

    #[test]
    fn scheduled_record_is_not_completed() {
        let record = MaintenanceRecord::scheduled("bearing swap", Utc::now());
        assert!(!record.is_completed());
        assert!(record.completed_at().is_none());
    }

    #[test]
    fn completed_record_carries_completion_time() {
        let at = Utc::now();
        let record = MaintenanceRecord::completed("oil change", at);
        assert_eq!(record.completed_at(), Some(at));
        assert_eq!(record.scheduled_at(), at);
    }
}
