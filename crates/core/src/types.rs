use serde::{Deserialize, Serialize};

/// Entity identity. Zero until the persistence collaborator assigns one.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Measurement kind of a sensor. Also used to classify equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,
    Pressure,
    Flow,
    Level,
    Vibration,
    Speed,
    Current,
    Voltage,
}

impl SensorType {
    /// Return the lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Flow => "flow",
            Self::Level => "level",
            Self::Vibration => "vibration",
            Self::Speed => "speed",
            Self::Current => "current",
            Self::Voltage => "voltage",
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_type_serializes_snake_case() {
        let json = serde_json::to_string(&SensorType::Vibration).unwrap();
        assert_eq!(json, "\"vibration\"");
        let parsed: SensorType = serde_json::from_str("\"pressure\"").unwrap();
        assert_eq!(parsed, SensorType::Pressure);
    }
}
