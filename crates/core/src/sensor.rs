//! Sensor entity: reading ingestion, limit evaluation, calibration lifecycle.
//!
//! Pure logic, no I/O. Readings are append-only and strictly time-ordered;
//! a reading that is stale, duplicated, or from the future is refused
//! rather than reordered.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{assign_identity, require_id, require_text, CoreError};
use crate::precision::{round_to_precision, MAX_PRECISION};
use crate::reading::{Alarm, AlarmSeverity, SensorReading};
use crate::types::{DbId, SensorType, Timestamp};

/// Days after the last calibration (or creation) before a sensor is due.
pub const CALIBRATION_INTERVAL_DAYS: i64 = 180;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Operating state of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Normal,
    Warning,
    Alarm,
    Fault,
    Calibrating,
    Offline,
}

/// Band a reading falls into once compared with the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingBand {
    Normal,
    Warning,
    Alarm,
}

impl ReadingBand {
    fn status(self) -> SensorStatus {
        match self {
            Self::Normal => SensorStatus::Normal,
            Self::Warning => SensorStatus::Warning,
            Self::Alarm => SensorStatus::Alarm,
        }
    }
}

/// Inputs driving the sensor state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    Activate,
    Deactivate,
    Fail,
    StartCalibration,
    FinishCalibration,
    Evaluate(ReadingBand),
}

impl SensorStatus {
    /// Transition table. `None` means the event is illegal in this state.
    ///
    /// Guard predicates and mutating methods both consult this table.
    pub fn next(self, event: SensorEvent) -> Option<SensorStatus> {
        match (self, event) {
            (Self::Fault, SensorEvent::Activate) => None,
            (_, SensorEvent::Activate) => Some(Self::Normal),
            (_, SensorEvent::Deactivate) => Some(Self::Offline),
            (_, SensorEvent::Fail) => Some(Self::Fault),
            (
                Self::Normal | Self::Warning | Self::Alarm | Self::Calibrating,
                SensorEvent::StartCalibration,
            ) => Some(Self::Calibrating),
            (Self::Calibrating, SensorEvent::FinishCalibration) => Some(Self::Normal),
            (Self::Normal | Self::Warning | Self::Alarm, SensorEvent::Evaluate(band)) => {
                Some(band.status())
            }
            _ => None,
        }
    }

    /// Return the lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Alarm => "alarm",
            Self::Fault => "fault",
            Self::Calibrating => "calibrating",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Alarm limits
// ---------------------------------------------------------------------------

/// Optional alarm and warning thresholds. An unset limit never triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmLimits {
    pub high_alarm: Option<f64>,
    pub low_alarm: Option<f64>,
    pub high_warning: Option<f64>,
    pub low_warning: Option<f64>,
}

impl AlarmLimits {
    /// Check the limits against a sensor range `[min, max]`.
    ///
    /// When all four limits are set, a valid configuration satisfies
    /// `low_alarm < low_warning < high_warning < high_alarm`.
    pub fn validate(&self, min: f64, max: f64) -> Result<(), &'static str> {
        let in_range = |limit: Option<f64>| limit.map_or(true, |v| (min..=max).contains(&v));
        if !in_range(self.high_alarm) {
            return Err("high alarm limit outside sensor range");
        }
        if !in_range(self.low_alarm) {
            return Err("low alarm limit outside sensor range");
        }
        if !in_range(self.high_warning) {
            return Err("high warning limit outside sensor range");
        }
        if !in_range(self.low_warning) {
            return Err("low warning limit outside sensor range");
        }
        if let (Some(low), Some(high)) = (self.low_alarm, self.high_alarm) {
            if low >= high {
                return Err("low alarm limit must be below high alarm limit");
            }
        }
        if let (Some(warning), Some(alarm)) = (self.high_warning, self.high_alarm) {
            if warning >= alarm {
                return Err("high warning limit must be below high alarm limit");
            }
        }
        if let (Some(warning), Some(alarm)) = (self.low_warning, self.low_alarm) {
            if warning <= alarm {
                return Err("low warning limit must be above low alarm limit");
            }
        }
        if let (Some(low), Some(high)) = (self.low_warning, self.high_warning) {
            if low >= high {
                return Err("low warning limit must be below high warning limit");
            }
        }
        Ok(())
    }

    /// Classify a value against the limits. Alarm limits win over warnings.
    pub fn classify(&self, value: f64) -> ReadingBand {
        if breaches(value, self.low_alarm, self.high_alarm) {
            ReadingBand::Alarm
        } else if breaches(value, self.low_warning, self.high_warning) {
            ReadingBand::Warning
        } else {
            ReadingBand::Normal
        }
    }
}

/// Strictly above `high` or strictly below `low`.
fn breaches(value: f64, low: Option<f64>, high: Option<f64>) -> bool {
    high.is_some_and(|h| value > h) || low.is_some_and(|l| value < l)
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Construction input for a [`Sensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSensor {
    pub name: String,
    pub description: String,
    pub sensor_type: SensorType,
    pub unit: String,
    pub min_value: f64,
    pub max_value: f64,
    pub precision: u8,
    pub equipment_id: DbId,
}

/// A measurement source attached to one piece of equipment.
#[derive(Debug, Clone, Serialize)]
pub struct Sensor {
    id: DbId,
    name: String,
    description: String,
    sensor_type: SensorType,
    unit: String,
    min_value: f64,
    max_value: f64,
    precision: u8,
    status: SensorStatus,
    last_reading_value: Option<f64>,
    last_reading_at: Option<Timestamp>,
    limits: AlarmLimits,
    calibrated_at: Option<Timestamp>,
    equipment_id: DbId,
    created_at: Timestamp,
    updated_at: Timestamp,
    readings: Vec<SensorReading>,
    alarms: Vec<Alarm>,
}

impl Sensor {
    /// Validate the input and build an active sensor in `Normal` status.
    pub fn new(input: NewSensor) -> Result<Self, CoreError> {
        require_text(&input.name, "name")?;
        require_text(&input.description, "description")?;
        require_text(&input.unit, "unit")?;
        if !input.min_value.is_finite() || !input.max_value.is_finite() {
            return Err(CoreError::invalid_argument(
                "min_value",
                "sensor range bounds must be finite numbers",
            ));
        }
        if input.min_value > input.max_value {
            return Err(CoreError::invalid_argument(
                "min_value",
                format!(
                    "min_value {} must not exceed max_value {}",
                    input.min_value, input.max_value
                ),
            ));
        }
        if input.precision > MAX_PRECISION {
            return Err(CoreError::invalid_argument(
                "precision",
                format!(
                    "precision must be between 0 and {MAX_PRECISION}, got {}",
                    input.precision
                ),
            ));
        }
        require_id(input.equipment_id, "equipment_id")?;

        let now = Utc::now();
        Ok(Self {
            id: 0,
            name: input.name,
            description: input.description,
            sensor_type: input.sensor_type,
            unit: input.unit,
            min_value: input.min_value,
            max_value: input.max_value,
            precision: input.precision,
            status: SensorStatus::Normal,
            last_reading_value: None,
            last_reading_at: None,
            limits: AlarmLimits::default(),
            calibrated_at: None,
            equipment_id: input.equipment_id,
            created_at: now,
            updated_at: now,
            readings: Vec::new(),
            alarms: Vec::new(),
        })
    }

    /// Record the identity assigned by the persistence layer.
    pub fn assign_id(&mut self, id: DbId) -> Result<(), CoreError> {
        assign_identity(&mut self.id, id, "Sensor")
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> DbId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    /// Offline and faulted sensors are inactive; every other status is active.
    pub fn is_active(&self) -> bool {
        !matches!(self.status, SensorStatus::Offline | SensorStatus::Fault)
    }

    pub fn last_reading_value(&self) -> Option<f64> {
        self.last_reading_value
    }

    pub fn last_reading_at(&self) -> Option<Timestamp> {
        self.last_reading_at
    }

    pub fn limits(&self) -> AlarmLimits {
        self.limits
    }

    pub fn calibrated_at(&self) -> Option<Timestamp> {
        self.calibrated_at
    }

    pub fn equipment_id(&self) -> DbId {
        self.equipment_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    // -- limits -------------------------------------------------------------

    /// Replace all four limits at once.
    ///
    /// Returns `false` and leaves the previous limits untouched if the
    /// sensor is inactive or the limits are inconsistent with each other
    /// or with the sensor range.
    pub fn set_alarm_limits(&mut self, limits: AlarmLimits) -> bool {
        if !self.is_active() {
            tracing::debug!(sensor_id = self.id, "Alarm limits refused: sensor inactive");
            return false;
        }
        if let Err(reason) = limits.validate(self.min_value, self.max_value) {
            tracing::debug!(sensor_id = self.id, reason, "Alarm limits refused");
            return false;
        }
        self.limits = limits;
        self.touch();
        true
    }

    // -- ingestion ----------------------------------------------------------

    /// Whether the sensor accepts readings in its current state.
    pub fn can_receive_reading(&self) -> bool {
        self.status
            .next(SensorEvent::Evaluate(ReadingBand::Normal))
            .is_some()
    }

    /// Ingest one measurement.
    ///
    /// Returns `Ok(false)` when the reading is refused (sensor not
    /// receiving, timestamp in the future, or not strictly after the last
    /// reading). Returns [`CoreError::OutOfRange`] when the value lies
    /// outside the sensor range. On success the value is rounded to the
    /// sensor precision, stored, and evaluated against the alarm limits.
    pub fn add_reading(&mut self, value: f64, timestamp: Timestamp) -> Result<bool, CoreError> {
        if !self.can_receive_reading() {
            tracing::debug!(
                sensor_id = self.id,
                status = %self.status,
                "Reading refused: sensor not receiving",
            );
            return Ok(false);
        }
        if timestamp > Utc::now() {
            tracing::debug!(sensor_id = self.id, %timestamp, "Reading refused: future timestamp");
            return Ok(false);
        }
        if self.last_reading_at.is_some_and(|last| timestamp <= last) {
            tracing::debug!(sensor_id = self.id, %timestamp, "Reading refused: stale timestamp");
            return Ok(false);
        }
        let rounded = self.round_within_range(value)?;
        self.readings
            .push(SensorReading::new(rounded, timestamp, self.id));
        self.last_reading_value = Some(rounded);
        self.last_reading_at = Some(timestamp);

        let band = self.limits.classify(rounded);
        if band == ReadingBand::Alarm {
            self.raise_limit_alarm(rounded, timestamp);
        }
        if let Some(next) = self.status.next(SensorEvent::Evaluate(band)) {
            self.status = next;
        }

        self.touch();
        Ok(true)
    }

    /// Round `value` to the sensor precision. Both the raw and the rounded
    /// value must lie inside `[min_value, max_value]`.
    fn round_within_range(&self, value: f64) -> Result<f64, CoreError> {
        let range = self.min_value..=self.max_value;
        let rounded = round_to_precision(value, self.precision);
        if !range.contains(&value) || !range.contains(&rounded) {
            tracing::warn!(
                sensor_id = self.id,
                value,
                rounded,
                min = self.min_value,
                max = self.max_value,
                "Reading outside sensor range",
            );
            return Err(CoreError::OutOfRange {
                value,
                min: self.min_value,
                max: self.max_value,
            });
        }
        Ok(rounded)
    }

    fn raise_limit_alarm(&mut self, value: f64, timestamp: Timestamp) {
        let message = match (self.limits.high_alarm, self.limits.low_alarm) {
            (Some(high), _) if value > high => format!(
                "{}: {value} {} above high alarm limit {high}",
                self.name, self.unit
            ),
            (_, Some(low)) => format!(
                "{}: {value} {} below low alarm limit {low}",
                self.name, self.unit
            ),
            _ => format!("{}: {value} {} outside alarm limits", self.name, self.unit),
        };
        tracing::warn!(sensor_id = self.id, value, %message, "Alarm raised");
        self.alarms
            .push(Alarm::new(message, AlarmSeverity::High, timestamp, self.id));
    }

    // -- lifecycle ----------------------------------------------------------

    /// Bring the sensor back to `Normal`. Illegal while faulted.
    pub fn activate(&mut self) -> Result<(), CoreError> {
        let next = self.status.next(SensorEvent::Activate).ok_or_else(|| {
            CoreError::InvalidOperation("A faulted sensor cannot be activated".to_string())
        })?;
        self.transition(next);
        Ok(())
    }

    /// Take the sensor offline. Always succeeds.
    pub fn deactivate(&mut self) {
        if let Some(next) = self.status.next(SensorEvent::Deactivate) {
            self.transition(next);
        }
    }

    /// Mark the sensor faulted and record a high-severity alarm.
    pub fn set_fault(&mut self, reason: &str) -> Result<(), CoreError> {
        require_text(reason, "reason")?;
        let next = self.status.next(SensorEvent::Fail).ok_or_else(|| {
            CoreError::InvalidOperation(format!("A {} sensor cannot fault", self.status))
        })?;
        let now = Utc::now();
        self.transition(next);
        let message = format!("Sensor fault: {reason}");
        tracing::warn!(sensor_id = self.id, %message, "Sensor faulted");
        self.alarms
            .push(Alarm::new(message, AlarmSeverity::High, now, self.id));
        Ok(())
    }

    /// Enter calibration. The sensor must be active.
    pub fn start_calibration(&mut self) -> Result<(), CoreError> {
        let next = self
            .status
            .next(SensorEvent::StartCalibration)
            .ok_or_else(|| {
                CoreError::InvalidOperation(
                    "The sensor must be active to start calibration".to_string(),
                )
            })?;
        self.transition(next);
        Ok(())
    }

    /// Leave calibration, stamping the calibration date.
    pub fn finish_calibration(&mut self) -> Result<(), CoreError> {
        let next = self
            .status
            .next(SensorEvent::FinishCalibration)
            .ok_or_else(|| {
                CoreError::InvalidOperation(
                    "The sensor must be calibrating to finish calibration".to_string(),
                )
            })?;
        self.calibrated_at = Some(Utc::now());
        self.transition(next);
        Ok(())
    }

    fn transition(&mut self, next: SensorStatus) {
        if next != self.status {
            tracing::info!(
                sensor_id = self.id,
                from = %self.status,
                to = %next,
                "Sensor status changed",
            );
        }
        self.status = next;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // -- queries ------------------------------------------------------------

    /// Most recent reading. Readings are stored in timestamp order.
    pub fn latest_reading(&self) -> Option<&SensorReading> {
        self.readings.last()
    }

    /// Readings with `start <= timestamp <= end`, oldest first.
    pub fn readings_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<&[SensorReading], CoreError> {
        if start > end {
            return Err(CoreError::invalid_argument(
                "start",
                "start must be before or equal to end",
            ));
        }
        let lo = self.readings.partition_point(|r| r.timestamp() < start);
        let hi = self.readings.partition_point(|r| r.timestamp() <= end);
        Ok(&self.readings[lo..hi])
    }

    /// Arithmetic mean of the readings in the window, unrounded.
    pub fn average_value(&self, start: Timestamp, end: Timestamp) -> Result<Option<f64>, CoreError> {
        let window = self.readings_between(start, end)?;
        if window.is_empty() {
            return Ok(None);
        }
        let sum: f64 = window.iter().map(SensorReading::value).sum();
        Ok(Some(sum / window.len() as f64))
    }

    pub fn min_value_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<f64>, CoreError> {
        let window = self.readings_between(start, end)?;
        Ok(window.iter().map(SensorReading::value).reduce(f64::min))
    }

    pub fn max_value_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<f64>, CoreError> {
        let window = self.readings_between(start, end)?;
        Ok(window.iter().map(SensorReading::value).reduce(f64::max))
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms.len()
    }

    pub fn time_since_last_reading(&self) -> Option<chrono::Duration> {
        self.last_reading_at.map(|at| Utc::now() - at)
    }

    /// More than [`CALIBRATION_INTERVAL_DAYS`] since the last calibration,
    /// counting from creation when the sensor was never calibrated.
    pub fn is_calibration_due(&self) -> bool {
        let baseline = self.calibrated_at.unwrap_or(self.created_at);
        Utc::now() - baseline > chrono::Duration::days(CALIBRATION_INTERVAL_DAYS)
    }

    pub fn needs_calibration(&self) -> bool {
        self.status != SensorStatus::Calibrating && self.is_calibration_due()
    }

    pub fn is_in_alarm_state(&self) -> bool {
        self.status == SensorStatus::Alarm
    }

    pub fn is_in_warning_state(&self) -> bool {
        self.status == SensorStatus::Warning
    }
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last_reading_value {
            Some(value) => write!(
                f,
                "{} ({}) [{}] - last reading {value} {}",
                self.name, self.sensor_type, self.status, self.unit
            ),
            None => write!(
                f,
                "{} ({}) [{}] - no readings",
                self.name, self.sensor_type, self.status
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
