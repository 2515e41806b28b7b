//! Equipment entity: operational lifecycle, sensor ownership and
//! maintenance scheduling.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{assign_identity, require_id, require_text, CoreError};
use crate::reading::MaintenanceRecord;
use crate::sensor::Sensor;
use crate::types::{DbId, SensorType, Timestamp};

/// Maximum number of sensors attached to one piece of equipment.
pub const MAX_SENSORS_PER_EQUIPMENT: usize = 10;

/// Days between scheduled maintenance interventions.
pub const MAINTENANCE_INTERVAL_DAYS: i64 = 90;

/// Equipment cannot start when maintenance is due within this many days.
pub const MAINTENANCE_LEAD_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Stopped,
    Running,
    Maintenance,
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentEvent {
    Start,
    Stop,
    EnterMaintenance,
    Fail,
    CompleteMaintenance,
}

impl EquipmentStatus {
    /// Transition table. `None` means the event is illegal in this state.
    pub fn next(self, event: EquipmentEvent) -> Option<EquipmentStatus> {
        use EquipmentStatus::*;

        match (self, event) {
            (Stopped | Maintenance, EquipmentEvent::Start) => Some(Running),
            (Maintenance, EquipmentEvent::Stop) => None,
            (_, EquipmentEvent::Stop) => Some(Stopped),
            (Stopped, EquipmentEvent::EnterMaintenance) => Some(Maintenance),
            (_, EquipmentEvent::Fail) => Some(Fault),
            (Maintenance, EquipmentEvent::CompleteMaintenance) => Some(Stopped),
            _ => None,
        }
    }

    /// Return the lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Maintenance => "maintenance",
            Self::Fault => "fault",
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Construction input for an [`Equipment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEquipment {
    pub name: String,
    pub serial_number: String,
    pub equipment_type: SensorType,
    pub manufacturer: String,
    pub model: String,
    pub installation_date: Timestamp,
    pub area_id: DbId,
}

/// A monitored industrial asset.
#[derive(Debug, Clone, Serialize)]
pub struct Equipment {
    id: DbId,
    name: String,
    serial_number: String,
    equipment_type: SensorType,
    manufacturer: String,
    model: String,
    installation_date: Timestamp,
    area_id: DbId,
    status: EquipmentStatus,
    sensors: Vec<Sensor>,
    maintenance_records: Vec<MaintenanceRecord>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Equipment {
    /// Validate the input and build stopped equipment with no sensors.
    pub fn new(input: NewEquipment) -> Result<Self, CoreError> {
        require_text(&input.name, "name")?;
        require_text(&input.serial_number, "serial_number")?;
        require_text(&input.manufacturer, "manufacturer")?;
        require_text(&input.model, "model")?;
        let now = Utc::now();
        if input.installation_date > now {
            return Err(CoreError::invalid_argument(
                "installation_date",
                "installation date cannot be in the future",
            ));
        }
        require_id(input.area_id, "area_id")?;

        Ok(Self {
            id: 0,
            name: input.name,
            serial_number: input.serial_number.to_uppercase(),
            equipment_type: input.equipment_type,
            manufacturer: input.manufacturer,
            model: input.model,
            installation_date: input.installation_date,
            area_id: input.area_id,
            status: EquipmentStatus::Stopped,
            sensors: Vec::new(),
            maintenance_records: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Record the identity assigned by the persistence layer.
    pub fn assign_id(&mut self, id: DbId) -> Result<(), CoreError> {
        assign_identity(&mut self.id, id, "Equipment")
    }

    pub fn id(&self) -> DbId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn equipment_type(&self) -> SensorType {
        self.equipment_type
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn installation_date(&self) -> Timestamp {
        self.installation_date
    }

    pub fn area_id(&self) -> DbId {
        self.area_id
    }

    pub fn status(&self) -> EquipmentStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn maintenance_records(&self) -> &[MaintenanceRecord] {
        &self.maintenance_records
    }

    pub fn sensor(&self, sensor_id: DbId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id() == sensor_id)
    }

    pub fn sensor_mut(&mut self, sensor_id: DbId) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.id() == sensor_id)
    }

    // -- sensors ------------------------------------------------------------

    /// Attach a sensor.
    ///
    /// Refused while running, at capacity, when a sensor with the same id
    /// is already attached, or when the sensor references other equipment.
    pub fn add_sensor(&mut self, sensor: Sensor) -> bool {
        if self.status == EquipmentStatus::Running {
            tracing::debug!(equipment_id = self.id, "Sensor refused: equipment running");
            return false;
        }
        if self.sensors.iter().any(|s| s.id() == sensor.id()) {
            tracing::debug!(
                equipment_id = self.id,
                sensor_id = sensor.id(),
                "Sensor refused: already attached",
            );
            return false;
        }
        if self.sensors.len() >= MAX_SENSORS_PER_EQUIPMENT {
            tracing::debug!(equipment_id = self.id, "Sensor refused: capacity reached");
            return false;
        }
        if self.id != 0 && sensor.equipment_id() != self.id {
            tracing::debug!(
                equipment_id = self.id,
                sensor_equipment_id = sensor.equipment_id(),
                "Sensor refused: belongs to other equipment",
            );
            return false;
        }
        self.sensors.push(sensor);
        self.touch();
        true
    }

    /// Detach a sensor. Refused while running; otherwise always succeeds,
    /// even when no sensor carries `sensor_id`.
    pub fn remove_sensor(&mut self, sensor_id: DbId) -> bool {
        if self.status == EquipmentStatus::Running {
            tracing::debug!(equipment_id = self.id, "Sensor removal refused: equipment running");
            return false;
        }
        self.sensors.retain(|s| s.id() != sensor_id);
        self.touch();
        true
    }

    pub fn has_active_sensors(&self) -> bool {
        self.sensors.iter().any(Sensor::is_active)
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Whether [`Equipment::start`] would succeed.
    ///
    /// `area_active` is the owning area's active flag, or `None` when the
    /// area is not known to the caller.
    pub fn can_start(&self, area_active: Option<bool>) -> bool {
        self.start_blocker(area_active).is_none()
    }

    fn start_blocker(&self, area_active: Option<bool>) -> Option<&'static str> {
        if self.status.next(EquipmentEvent::Start).is_none() {
            return Some("equipment is running or faulted");
        }
        if !self.has_active_sensors() {
            return Some("equipment has no active sensors");
        }
        if area_active == Some(false) {
            return Some("owning area is inactive");
        }
        let lead = self.next_maintenance_date() - Duration::days(MAINTENANCE_LEAD_DAYS);
        if lead.date_naive() < today() {
            return Some("maintenance is due within the lead window");
        }
        None
    }

    pub fn start(&mut self, area_active: Option<bool>) -> Result<(), CoreError> {
        if let Some(reason) = self.start_blocker(area_active) {
            return Err(CoreError::InvalidOperation(format!(
                "Equipment cannot be started in its current state: {reason}"
            )));
        }
        let next = self.status.next(EquipmentEvent::Start).ok_or_else(|| {
            CoreError::InvalidOperation(format!("Equipment cannot be started while {}", self.status))
        })?;
        self.transition(next);
        Ok(())
    }

    /// Stop the equipment. Illegal during maintenance.
    pub fn stop(&mut self) -> Result<(), CoreError> {
        let next = self.status.next(EquipmentEvent::Stop).ok_or_else(|| {
            CoreError::InvalidOperation("Equipment under maintenance cannot be stopped".to_string())
        })?;
        self.transition(next);
        Ok(())
    }

    pub fn can_receive_maintenance(&self) -> bool {
        self.status.next(EquipmentEvent::EnterMaintenance).is_some()
    }

    /// Enter maintenance. Only stopped equipment can.
    pub fn set_maintenance(&mut self) -> Result<(), CoreError> {
        let next = self
            .status
            .next(EquipmentEvent::EnterMaintenance)
            .ok_or_else(|| {
                CoreError::InvalidOperation(
                    "Equipment must be stopped to enter maintenance".to_string(),
                )
            })?;
        self.transition(next);
        Ok(())
    }

    /// Close the current maintenance, recording it as completed now.
    pub fn complete_maintenance(&mut self, description: &str) -> Result<(), CoreError> {
        require_text(description, "description")?;
        let next = self
            .status
            .next(EquipmentEvent::CompleteMaintenance)
            .ok_or_else(|| {
                CoreError::InvalidOperation("Equipment is not under maintenance".to_string())
            })?;
        self.maintenance_records
            .push(MaintenanceRecord::completed(description, Utc::now()));
        self.transition(next);
        Ok(())
    }

    /// Hard failure interrupt. Legal from every state.
    pub fn set_fault(&mut self) {
        if let Some(next) = self.status.next(EquipmentEvent::Fail) {
            tracing::warn!(equipment_id = self.id, from = %self.status, "Equipment faulted");
            self.transition(next);
        }
    }

    fn transition(&mut self, next: EquipmentStatus) {
        if next != self.status {
            tracing::info!(
                equipment_id = self.id,
                from = %self.status,
                to = %next,
                "Equipment status changed",
            );
        }
        self.status = next;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_operational(&self) -> bool {
        self.status == EquipmentStatus::Running
    }

    // -- maintenance --------------------------------------------------------

    /// Add a historical or planned maintenance record, kept in
    /// scheduled-date order.
    pub fn add_maintenance_record(&mut self, record: MaintenanceRecord) -> Result<(), CoreError> {
        if let Some(completed) = record.completed_at() {
            if completed > Utc::now() {
                return Err(CoreError::invalid_argument(
                    "completed_at",
                    "maintenance cannot be completed in the future",
                ));
            }
            if completed < self.installation_date {
                return Err(CoreError::invalid_argument(
                    "completed_at",
                    "maintenance cannot be completed before installation",
                ));
            }
        }
        let at = self
            .maintenance_records
            .partition_point(|r| r.scheduled_at() <= record.scheduled_at());
        self.maintenance_records.insert(at, record);
        self.touch();
        Ok(())
    }

    /// Latest completion plus the maintenance interval, or installation
    /// plus the interval when no maintenance has been completed.
    pub fn next_maintenance_date(&self) -> Timestamp {
        let baseline = self
            .maintenance_records
            .iter()
            .filter_map(MaintenanceRecord::completed_at)
            .max()
            .unwrap_or(self.installation_date);
        baseline + Duration::days(MAINTENANCE_INTERVAL_DAYS)
    }

    pub fn needs_maintenance(&self) -> bool {
        self.next_maintenance_date().date_naive() < today()
    }

    pub fn maintenance_count(&self) -> usize {
        self.maintenance_records
            .iter()
            .filter(|r| r.is_completed())
            .count()
    }

    /// Whole days since installation; zero for a future installation date.
    pub fn operational_days(&self) -> i64 {
        if self.installation_date > Utc::now() {
            return 0;
        }
        (today() - self.installation_date.date_naive()).num_days()
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl std::fmt::Display for Equipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) - area {} - {} sensors",
            self.name,
            self.status,
            self.area_id,
            self.sensors.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
