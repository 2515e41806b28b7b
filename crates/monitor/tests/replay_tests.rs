//! Integration tests for loading a plant and replaying readings from disk.

use std::io::Write;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use plantwatch_core::{CoreError, EquipmentStatus, SensorStatus};
use plantwatch_monitor::definition::PlantDefinition;
use plantwatch_monitor::error::MonitorError;
use plantwatch_monitor::replay::{replay, replay_file, ReadingRecord, ReplaySummary};
use plantwatch_monitor::repository::InMemoryPlantRepository;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn definition_json(installed_days_ago: i64) -> String {
    let installed = (Utc::now() - Duration::days(installed_days_ago)).to_rfc3339();
    format!(
        r#"{{
        "areas": [{{
            "name": "Cooling",
            "code": "cl-2",
            "description": "Cooling tower yard",
            "equipment": [{{
                "name": "Fan 1",
                "serial_number": "fan-001",
                "equipment_type": "speed",
                "manufacturer": "Breeze",
                "model": "F-12",
                "installation_date": "{installed}",
                "sensors": [{{
                    "name": "Motor temperature",
                    "description": "Winding",
                    "sensor_type": "temperature",
                    "unit": "degC",
                    "min_value": 0.0,
                    "max_value": 100.0,
                    "precision": 1,
                    "limits": {{
                        "high_alarm": 90.0,
                        "low_alarm": 5.0,
                        "high_warning": 80.0,
                        "low_warning": 10.0
                    }}
                }}]
            }}]
        }}]
    }}"#
    )
}

fn load_plant(installed_days_ago: i64) -> InMemoryPlantRepository {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(definition_json(installed_days_ago).as_bytes())
        .unwrap();
    let definition = PlantDefinition::load(file.path()).unwrap();
    InMemoryPlantRepository::from_definition(&definition).unwrap()
}

fn line(serial: &str, sensor: &str, value: f64, seconds_ago: i64) -> String {
    serde_json::to_string(&ReadingRecord {
        serial: serial.to_string(),
        sensor: sensor.to_string(),
        value,
        timestamp: Utc::now() - Duration::seconds(seconds_ago),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Every outcome category is counted and none of them aborts the replay.
#[test]
fn replay_counts_every_outcome() {
    let mut repo = load_plant(3);
    assert_eq!(repo.start_all_startable(), 1);

    let input = [
        line("FAN-001", "Motor temperature", 50.0, 60),
        line("fan-001", "Motor temperature", 85.04, 50),
        line("FAN-001", "Motor temperature", 95.27, 40),
        line("FAN-001", "Motor temperature", 40.0, 45),
        line("FAN-001", "Motor temperature", 140.0, 30),
        line("FAN-001", "Bearing", 1.0, 20),
        "not json".to_string(),
        String::new(),
    ]
    .join("\n");

    let summary = replay(&mut repo, input.as_bytes()).unwrap();
    assert_eq!(
        summary,
        ReplaySummary {
            lines: 7,
            accepted: 3,
            refused: 1,
            out_of_range: 1,
            unknown_sensor: 1,
            malformed: 1,
            alarms_raised: 1,
        }
    );

    let sensor_id = repo.find_sensor_id("FAN-001", "Motor temperature").unwrap();
    let sensor = repo.sensor(sensor_id).unwrap();
    assert_eq!(sensor.status(), SensorStatus::Alarm);
    assert_eq!(sensor.last_reading_value(), Some(95.3));
    assert_eq!(sensor.readings()[1].value(), 85.0);
}

/// Replaying from a file on disk goes through the same path.
#[test]
fn replay_file_reads_json_lines() {
    let mut repo = load_plant(3);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", line("FAN-001", "Motor temperature", 12.0, 10)).unwrap();
    writeln!(file, "{}", line("FAN-001", "Motor temperature", 8.0, 5)).unwrap();

    let summary = replay_file(&mut repo, file.path()).unwrap();
    assert_eq!(summary.accepted, 2);

    let sensor_id = repo.find_sensor_id("FAN-001", "Motor temperature").unwrap();
    assert_eq!(
        repo.sensor(sensor_id).unwrap().status(),
        SensorStatus::Warning
    );
}

/// Equipment installed long ago without maintenance history stays stopped.
#[test]
fn overdue_equipment_is_not_auto_started() {
    let mut repo = load_plant(120);
    assert_eq!(repo.start_all_startable(), 0);
    let equipment_id = repo.areas()[0].equipment_list()[0].id();
    assert!(repo.equipment(equipment_id).unwrap().needs_maintenance());
    assert_eq!(
        repo.equipment(equipment_id).unwrap().status(),
        EquipmentStatus::Stopped
    );
    assert_matches!(
        repo.start_equipment(equipment_id),
        Err(CoreError::InvalidOperation(_))
    );
}

/// Inconsistent alarm limits stop the plant from being built.
#[test]
fn inconsistent_limits_reject_definition() {
    let text = definition_json(3).replace("\"high_warning\": 80.0", "\"high_warning\": 95.0");
    let definition = PlantDefinition::from_json(&text).unwrap();
    assert_matches!(
        InMemoryPlantRepository::from_definition(&definition),
        Err(MonitorError::Rejected(_))
    );
}

/// Domain construction failures surface as core errors.
#[test]
fn inverted_sensor_range_rejects_definition() {
    let text = definition_json(3).replace("\"max_value\": 100.0", "\"max_value\": -1.0");
    let definition = PlantDefinition::from_json(&text).unwrap();
    assert_matches!(
        InMemoryPlantRepository::from_definition(&definition),
        Err(MonitorError::Core(CoreError::InvalidArgument { field: "min_value", .. }))
    );
}

#[test]
fn missing_readings_file_is_io_error() {
    let mut repo = load_plant(3);
    let err = replay_file(&mut repo, std::path::Path::new("/nonexistent/readings.jsonl"))
        .unwrap_err();
    assert_matches!(err, MonitorError::Io { .. });
}
