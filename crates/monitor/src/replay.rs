//! Replay of recorded readings through the plant.
//!
//! Input is JSON lines, one reading per line:
//!
//! ```text
//! {"serial": "PA-1", "sensor": "Flow", "value": 12.5, "timestamp": "2026-01-01T00:00:00Z"}
//! ```
//!
//! Every line is ingested independently. Malformed lines, unknown sensors,
//! refusals and out-of-range values are counted and logged; none of them
//! stops the replay.

use std::io::BufRead;
use std::path::Path;

use plantwatch_core::{CoreError, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};
use crate::repository::InMemoryPlantRepository;

/// One recorded reading addressed by equipment serial and sensor name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadingRecord {
    pub serial: String,
    pub sensor: String,
    pub value: f64,
    pub timestamp: Timestamp,
}

/// Outcome counters for a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub lines: usize,
    pub accepted: usize,
    /// Refused by the sensor: stale or future timestamp, sensor not receiving.
    pub refused: usize,
    pub out_of_range: usize,
    pub unknown_sensor: usize,
    pub malformed: usize,
    pub alarms_raised: usize,
}

/// Replay every line of `reader` into `repo`.
pub fn replay<R: BufRead>(
    repo: &mut InMemoryPlantRepository,
    reader: R,
) -> MonitorResult<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| MonitorError::Io {
            path: "<readings>".into(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        let record: ReadingRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(line_no, error = %err, "Malformed reading line");
                summary.malformed += 1;
                continue;
            }
        };

        let Some(sensor_id) = repo.find_sensor_id(&record.serial, &record.sensor) else {
            tracing::warn!(
                line_no,
                serial = %record.serial,
                sensor = %record.sensor,
                "Reading for unknown sensor",
            );
            summary.unknown_sensor += 1;
            continue;
        };

        let alarms_before = repo.sensor(sensor_id)?.alarm_count();
        match repo.ingest(sensor_id, record.value, record.timestamp) {
            Ok(true) => summary.accepted += 1,
            Ok(false) => summary.refused += 1,
            Err(CoreError::OutOfRange { .. }) => summary.out_of_range += 1,
            Err(err) => return Err(err.into()),
        }
        summary.alarms_raised += repo.sensor(sensor_id)?.alarm_count() - alarms_before;
    }

    tracing::info!(
        lines = summary.lines,
        accepted = summary.accepted,
        refused = summary.refused,
        out_of_range = summary.out_of_range,
        alarms = summary.alarms_raised,
        "Replay finished",
    );
    Ok(summary)
}

/// Open `path` and replay it into `repo`.
pub fn replay_file(
    repo: &mut InMemoryPlantRepository,
    path: &Path,
) -> MonitorResult<ReplaySummary> {
    let file = std::fs::File::open(path).map_err(|source| MonitorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    replay(repo, std::io::BufReader::new(file))
}
