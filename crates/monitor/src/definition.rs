//! Plant definition documents.
//!
//! A definition is a JSON tree of areas, equipment and sensors. It is
//! structurally validated here; domain rules are enforced again by the
//! `plantwatch_core` constructors when the plant is built.

use std::path::Path;

use plantwatch_core::{AlarmLimits, SensorType, Timestamp};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{MonitorError, MonitorResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlantDefinition {
    #[validate(nested)]
    pub areas: Vec<AreaDefinition>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AreaDefinition {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub equipment: Vec<EquipmentDefinition>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EquipmentDefinition {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub serial_number: String,
    pub equipment_type: SensorType,
    #[validate(length(min = 1))]
    pub manufacturer: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub installation_date: Timestamp,
    #[serde(default)]
    #[validate(length(max = 10))]
    #[validate(nested)]
    pub sensors: Vec<SensorDefinition>,
    #[serde(default)]
    #[validate(nested)]
    pub maintenance: Vec<MaintenanceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorDefinition {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub sensor_type: SensorType,
    #[validate(length(min = 1, max = 16))]
    pub unit: String,
    pub min_value: f64,
    pub max_value: f64,
    #[validate(range(max = 4))]
    pub precision: u8,
    pub limits: Option<AlarmLimits>,
    /// Sensors declared inactive are created offline.
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A completed intervention carried over from the plant's history.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MaintenanceDefinition {
    #[validate(length(min = 1))]
    pub description: String,
    pub completed_at: Timestamp,
}

fn default_active() -> bool {
    true
}

impl PlantDefinition {
    /// Parse and validate a definition from JSON text.
    pub fn from_json(text: &str) -> MonitorResult<Self> {
        let definition: PlantDefinition = serde_json::from_str(text)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Read, parse and validate a definition file.
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MonitorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definition = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            areas = definition.areas.len(),
            "Plant definition loaded",
        );
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const MINIMAL: &str = r#"{
        "areas": [{
            "name": "Boiler house",
            "code": "bh",
            "equipment": [{
                "name": "Boiler 1",
                "serial_number": "b-1",
                "equipment_type": "temperature",
                "manufacturer": "Acme",
                "model": "B-9",
                "installation_date": "2024-01-10T00:00:00Z",
                "sensors": [{
                    "name": "Flue gas",
                    "description": "Stack outlet",
                    "sensor_type": "temperature",
                    "unit": "degC",
                    "min_value": 0.0,
                    "max_value": 400.0,
                    "precision": 1,
                    "limits": { "high_alarm": 350.0, "high_warning": 300.0 }
                }]
            }]
        }]
    }"#;

    #[test]
    fn parses_minimal_definition() {
        let definition = PlantDefinition::from_json(MINIMAL).unwrap();
        let sensor = &definition.areas[0].equipment[0].sensors[0];
        assert!(sensor.active);
        let limits = sensor.limits.unwrap();
        assert_eq!(limits.high_alarm, Some(350.0));
        assert_eq!(limits.low_alarm, None);
        assert!(definition.areas[0].equipment[0].maintenance.is_empty());
    }

    #[test]
    fn rejects_precision_above_four() {
        let text = MINIMAL.replace("\"precision\": 1", "\"precision\": 6");
        assert_matches!(
            PlantDefinition::from_json(&text),
            Err(MonitorError::Definition(_))
        );
    }

    #[test]
    fn rejects_empty_area_code() {
        let text = MINIMAL.replace("\"code\": \"bh\"", "\"code\": \"\"");
        assert_matches!(
            PlantDefinition::from_json(&text),
            Err(MonitorError::Definition(_))
        );
    }

    #[test]
    fn rejects_more_than_ten_sensors_per_equipment() {
        let mut value: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        let sensors = value["areas"][0]["equipment"][0]["sensors"]
            .as_array_mut()
            .unwrap();
        let template = sensors[0].clone();
        sensors.extend(std::iter::repeat(template).take(10));
        assert_eq!(sensors.len(), 11);

        assert_matches!(
            PlantDefinition::from_json(&value.to_string()),
            Err(MonitorError::Definition(_))
        );
    }

    #[test]
    fn accepts_ten_sensors_per_equipment() {
        let mut value: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        let sensors = value["areas"][0]["equipment"][0]["sensors"]
            .as_array_mut()
            .unwrap();
        let template = sensors[0].clone();
        sensors.extend(std::iter::repeat(template).take(9));

        let definition = PlantDefinition::from_json(&value.to_string()).unwrap();
        assert_eq!(definition.areas[0].equipment[0].sensors.len(), 10);
    }

    #[test]
    fn rejects_malformed_json() {
        assert_matches!(
            PlantDefinition::from_json("{ \"areas\": ["),
            Err(MonitorError::Json(_))
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PlantDefinition::load(Path::new("/nonexistent/plant.json")).unwrap_err();
        assert_matches!(err, MonitorError::Io { .. });
    }
}
