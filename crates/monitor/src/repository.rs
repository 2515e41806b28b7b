//! In-memory stand-in for the persistence collaborator.
//!
//! Assigns sequential identities after construction and keeps the id index
//! that resolves the non-owning back-references (sensor -> equipment ->
//! area) of the domain model.
//!
//! Areas and equipment are only handed out by shared reference. Structural
//! changes (adding or removing equipment and sensors) go through the
//! repository so the index stays in step with the aggregates.

use std::collections::HashMap;

use plantwatch_core::{
    Area, CoreError, DbId, Equipment, MaintenanceRecord, NewEquipment, NewSensor, Sensor,
    Timestamp,
};

use crate::definition::PlantDefinition;
use crate::error::{MonitorError, MonitorResult};

/// Lookup key for a sensor: owning equipment serial number plus sensor name.
pub type SensorKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryPlantRepository {
    areas: Vec<Area>,
    last_id: DbId,
    /// equipment id -> area id
    equipment_index: HashMap<DbId, DbId>,
    /// sensor id -> equipment id
    sensor_index: HashMap<DbId, DbId>,
    sensor_keys: HashMap<SensorKey, DbId>,
}

impl InMemoryPlantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding every entity of `definition`.
    pub fn from_definition(definition: &PlantDefinition) -> MonitorResult<Self> {
        let mut repo = Self::new();
        for area_def in &definition.areas {
            let area = Area::new(
                &area_def.name,
                &area_def.code,
                area_def.description.as_deref(),
            )?;
            let area_id = repo.insert_area(area)?;

            for eq_def in &area_def.equipment {
                let mut equipment = Equipment::new(NewEquipment {
                    name: eq_def.name.clone(),
                    serial_number: eq_def.serial_number.clone(),
                    equipment_type: eq_def.equipment_type,
                    manufacturer: eq_def.manufacturer.clone(),
                    model: eq_def.model.clone(),
                    installation_date: eq_def.installation_date,
                    area_id,
                })?;
                for record in &eq_def.maintenance {
                    equipment.add_maintenance_record(MaintenanceRecord::completed(
                        record.description.clone(),
                        record.completed_at,
                    ))?;
                }
                let equipment_id = repo.insert_equipment(equipment)?;

                for sensor_def in &eq_def.sensors {
                    let sensor = Sensor::new(NewSensor {
                        name: sensor_def.name.clone(),
                        description: sensor_def.description.clone(),
                        sensor_type: sensor_def.sensor_type,
                        unit: sensor_def.unit.clone(),
                        min_value: sensor_def.min_value,
                        max_value: sensor_def.max_value,
                        precision: sensor_def.precision,
                        equipment_id,
                    })?;
                    let sensor_id = repo.insert_sensor(sensor)?;
                    let sensor = repo.sensor_mut(sensor_id)?;
                    if let Some(limits) = sensor_def.limits {
                        if !sensor.set_alarm_limits(limits) {
                            return Err(MonitorError::Rejected(format!(
                                "alarm limits for sensor '{}' are inconsistent",
                                sensor_def.name
                            )));
                        }
                    }
                    if !sensor_def.active {
                        sensor.deactivate();
                    }
                }
            }
        }
        tracing::info!(
            areas = repo.areas.len(),
            equipment = repo.equipment_index.len(),
            sensors = repo.sensor_index.len(),
            "Plant built",
        );
        Ok(repo)
    }

    fn allocate_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    // -- inserts ------------------------------------------------------------

    /// Persist a new area and return its assigned id.
    pub fn insert_area(&mut self, mut area: Area) -> MonitorResult<DbId> {
        if self.areas.iter().any(|a| a.code() == area.code()) {
            return Err(MonitorError::Rejected(format!(
                "area code '{}' is already in use",
                area.code()
            )));
        }
        let id = self.allocate_id();
        area.assign_id(id)?;
        self.areas.push(area);
        Ok(id)
    }

    /// Persist new equipment into the area it references.
    pub fn insert_equipment(&mut self, mut equipment: Equipment) -> MonitorResult<DbId> {
        let serial_taken = self
            .areas
            .iter()
            .flat_map(Area::equipment_list)
            .any(|e| e.serial_number() == equipment.serial_number());
        if serial_taken {
            return Err(MonitorError::Rejected(format!(
                "serial number '{}' is already in use",
                equipment.serial_number()
            )));
        }
        let area_id = equipment.area_id();
        self.area(area_id)?;
        let id = self.allocate_id();
        equipment.assign_id(id)?;
        let area = self.area_mut(area_id)?;
        if !area.add_equipment(equipment) {
            return Err(MonitorError::Rejected(format!(
                "area {area_id} refused equipment {id}"
            )));
        }
        self.equipment_index.insert(id, area_id);
        Ok(id)
    }

    /// Persist a new sensor onto the equipment it references.
    pub fn insert_sensor(&mut self, mut sensor: Sensor) -> MonitorResult<DbId> {
        let equipment_id = sensor.equipment_id();
        let serial = self.equipment(equipment_id)?.serial_number().to_string();
        let key = (serial, sensor.name().to_string());
        if self.sensor_keys.contains_key(&key) {
            return Err(MonitorError::Rejected(format!(
                "sensor '{}' already exists on equipment {}",
                key.1, key.0
            )));
        }
        let id = self.allocate_id();
        sensor.assign_id(id)?;
        let equipment = self.equipment_mut(equipment_id)?;
        if !equipment.add_sensor(sensor) {
            return Err(MonitorError::Rejected(format!(
                "equipment {equipment_id} refused sensor {id}"
            )));
        }
        self.sensor_index.insert(id, equipment_id);
        self.sensor_keys.insert(key, id);
        Ok(id)
    }

    // -- lookups ------------------------------------------------------------

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area(&self, area_id: DbId) -> Result<&Area, CoreError> {
        self.areas
            .iter()
            .find(|a| a.id() == area_id)
            .ok_or(CoreError::NotFound {
                entity: "Area",
                id: area_id,
            })
    }

    fn area_mut(&mut self, area_id: DbId) -> Result<&mut Area, CoreError> {
        self.areas
            .iter_mut()
            .find(|a| a.id() == area_id)
            .ok_or(CoreError::NotFound {
                entity: "Area",
                id: area_id,
            })
    }

    fn area_id_of(&self, equipment_id: DbId) -> Result<DbId, CoreError> {
        self.equipment_index
            .get(&equipment_id)
            .copied()
            .ok_or(CoreError::NotFound {
                entity: "Equipment",
                id: equipment_id,
            })
    }

    fn equipment_id_of(&self, sensor_id: DbId) -> Result<DbId, CoreError> {
        self.sensor_index
            .get(&sensor_id)
            .copied()
            .ok_or(CoreError::NotFound {
                entity: "Sensor",
                id: sensor_id,
            })
    }

    pub fn equipment(&self, equipment_id: DbId) -> Result<&Equipment, CoreError> {
        let area_id = self.area_id_of(equipment_id)?;
        self.area(area_id)?
            .equipment(equipment_id)
            .ok_or(CoreError::NotFound {
                entity: "Equipment",
                id: equipment_id,
            })
    }

    fn equipment_mut(&mut self, equipment_id: DbId) -> Result<&mut Equipment, CoreError> {
        let area_id = self.area_id_of(equipment_id)?;
        self.area_mut(area_id)?
            .equipment_mut(equipment_id)
            .ok_or(CoreError::NotFound {
                entity: "Equipment",
                id: equipment_id,
            })
    }

    pub fn sensor(&self, sensor_id: DbId) -> Result<&Sensor, CoreError> {
        let equipment_id = self.equipment_id_of(sensor_id)?;
        self.equipment(equipment_id)?
            .sensor(sensor_id)
            .ok_or(CoreError::NotFound {
                entity: "Sensor",
                id: sensor_id,
            })
    }

    pub fn sensor_mut(&mut self, sensor_id: DbId) -> Result<&mut Sensor, CoreError> {
        let equipment_id = self.equipment_id_of(sensor_id)?;
        self.equipment_mut(equipment_id)?
            .sensor_mut(sensor_id)
            .ok_or(CoreError::NotFound {
                entity: "Sensor",
                id: sensor_id,
            })
    }

    /// Resolve a sensor by equipment serial number and sensor name.
    /// The serial number is matched case-insensitively.
    pub fn find_sensor_id(&self, serial_number: &str, sensor_name: &str) -> Option<DbId> {
        let key = (serial_number.to_uppercase(), sensor_name.to_string());
        self.sensor_keys.get(&key).copied()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_index.len()
    }

    // -- operations ---------------------------------------------------------

    /// Deactivate an area. Fails while the area still owns equipment.
    pub fn deactivate_area(&mut self, area_id: DbId) -> Result<(), CoreError> {
        self.area_mut(area_id)?.deactivate()
    }

    pub fn activate_area(&mut self, area_id: DbId) -> Result<(), CoreError> {
        self.area_mut(area_id)?.activate();
        Ok(())
    }

    /// Start equipment through its owning area.
    pub fn start_equipment(&mut self, equipment_id: DbId) -> Result<(), CoreError> {
        let area_id = self.area_id_of(equipment_id)?;
        self.area_mut(area_id)?.start_equipment(equipment_id)
    }

    /// Start every equipment whose start guard currently holds. Returns the
    /// number of equipment started.
    pub fn start_all_startable(&mut self) -> usize {
        let mut started = 0;
        for area in &mut self.areas {
            let active = area.is_active();
            let ids: Vec<DbId> = area
                .equipment_list()
                .iter()
                .filter(|e| e.can_start(Some(active)))
                .map(Equipment::id)
                .collect();
            for id in ids {
                match area.start_equipment(id) {
                    Ok(()) => started += 1,
                    Err(err) => tracing::warn!(equipment_id = id, error = %err, "Start failed"),
                }
            }
        }
        tracing::info!(started, "Startable equipment started");
        started
    }

    /// Route a reading to its sensor.
    pub fn ingest(
        &mut self,
        sensor_id: DbId,
        value: f64,
        timestamp: Timestamp,
    ) -> Result<bool, CoreError> {
        self.sensor_mut(sensor_id)?.add_reading(value, timestamp)
    }

    /// Detach equipment from the plant, dropping its index entries.
    pub fn remove_equipment(&mut self, equipment_id: DbId) -> Result<Equipment, CoreError> {
        let area_id = self.area_id_of(equipment_id)?;
        let equipment = self
            .area_mut(area_id)?
            .remove_equipment(equipment_id)
            .ok_or(CoreError::NotFound {
                entity: "Equipment",
                id: equipment_id,
            })?;
        self.equipment_index.remove(&equipment_id);
        for sensor in equipment.sensors() {
            self.sensor_index.remove(&sensor.id());
        }
        self.sensor_keys.retain(|(serial, _), _| serial != equipment.serial_number());
        Ok(equipment)
    }
}
