//! Area entity: a plant zone owning a set of equipment.

use chrono::Utc;
use serde::Serialize;

use crate::equipment::{Equipment, EquipmentStatus};
use crate::error::{assign_identity, require_text, CoreError};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Serialize)]
pub struct Area {
    id: DbId,
    name: String,
    code: String,
    description: String,
    active: bool,
    equipment: Vec<Equipment>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Area {
    /// Build an active area. The code is normalized to uppercase.
    pub fn new(name: &str, code: &str, description: Option<&str>) -> Result<Self, CoreError> {
        require_text(name, "name")?;
        require_text(code, "code")?;
        let now = Utc::now();
        Ok(Self {
            id: 0,
            name: name.to_string(),
            code: code.to_uppercase(),
            description: description.unwrap_or_default().to_string(),
            active: true,
            equipment: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Record the identity assigned by the persistence layer.
    pub fn assign_id(&mut self, id: DbId) -> Result<(), CoreError> {
        assign_identity(&mut self.id, id, "Area")
    }

    pub fn id(&self) -> DbId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn equipment_list(&self) -> &[Equipment] {
        &self.equipment
    }

    pub fn equipment(&self, equipment_id: DbId) -> Option<&Equipment> {
        self.equipment.iter().find(|e| e.id() == equipment_id)
    }

    pub fn equipment_mut(&mut self, equipment_id: DbId) -> Option<&mut Equipment> {
        self.equipment.iter_mut().find(|e| e.id() == equipment_id)
    }

    /// Take ownership of `equipment`. Refused when the area is inactive,
    /// already holds equipment with the same id, or the equipment names a
    /// different owning area.
    pub fn add_equipment(&mut self, equipment: Equipment) -> bool {
        if self.equipment.iter().any(|e| e.id() == equipment.id()) {
            tracing::debug!(
                area_id = self.id,
                equipment_id = equipment.id(),
                "Equipment refused: already in area",
            );
            return false;
        }
        if self.id != 0 && equipment.area_id() != self.id {
            tracing::debug!(
                area_id = self.id,
                equipment_area_id = equipment.area_id(),
                "Equipment refused: belongs to another area",
            );
            return false;
        }
        if !self.active {
            tracing::debug!(area_id = self.id, "Equipment refused: area inactive");
            return false;
        }
        self.equipment.push(equipment);
        self.touch();
        true
    }

    /// Release ownership of the equipment with `equipment_id`, if present.
    pub fn remove_equipment(&mut self, equipment_id: DbId) -> Option<Equipment> {
        let index = self.equipment.iter().position(|e| e.id() == equipment_id)?;
        let removed = self.equipment.remove(index);
        self.touch();
        Some(removed)
    }

    /// Start owned equipment, feeding this area's active flag into the
    /// start guard.
    pub fn start_equipment(&mut self, equipment_id: DbId) -> Result<(), CoreError> {
        let active = self.active;
        let equipment = self
            .equipment_mut(equipment_id)
            .ok_or(CoreError::NotFound {
                entity: "Equipment",
                id: equipment_id,
            })?;
        equipment.start(Some(active))
    }

    pub fn update_description(&mut self, description: Option<&str>) {
        self.description = description.unwrap_or_default().to_string();
        self.touch();
    }

    pub fn activate(&mut self) {
        if !self.active {
            tracing::info!(area_id = self.id, "Area activated");
        }
        self.active = true;
        self.touch();
    }

    /// Deactivate the area. Refused while it owns any equipment, whatever
    /// that equipment's status.
    pub fn deactivate(&mut self) -> Result<(), CoreError> {
        if !self.equipment.is_empty() {
            return Err(CoreError::InvalidOperation(format!(
                "Area {} cannot be deactivated while it owns {} equipment",
                self.code,
                self.equipment.len()
            )));
        }
        self.active = false;
        tracing::info!(area_id = self.id, "Area deactivated");
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn total_equipment(&self) -> usize {
        self.equipment.len()
    }

    pub fn operational_equipment(&self) -> usize {
        self.equipment
            .iter()
            .filter(|e| e.status() == EquipmentStatus::Running)
            .count()
    }

    pub fn can_receive_equipment(&self) -> bool {
        self.active
    }

    pub fn has_operational_equipment(&self) -> bool {
        self.operational_equipment() > 0
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} ({} equipment)",
            self.code,
            self.name,
            self.equipment.len()
        )
    }
}
