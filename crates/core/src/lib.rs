//! `plantwatch-core` -- plant asset domain model.
//!
//! Areas own equipment, equipment owns sensors, sensors own their readings
//! and alarms. Back-references are plain ids. Everything here is pure,
//! synchronous logic; persistence and identity assignment belong to the
//! caller.

pub mod area;
pub mod equipment;
pub mod error;
pub mod precision;
pub mod reading;
pub mod sensor;
pub mod types;

pub use area::Area;
pub use equipment::{Equipment, EquipmentEvent, EquipmentStatus, NewEquipment};
pub use error::CoreError;
pub use reading::{Alarm, AlarmSeverity, MaintenanceRecord, SensorReading};
pub use sensor::{AlarmLimits, NewSensor, ReadingBand, Sensor, SensorEvent, SensorStatus};
pub use types::{DbId, SensorType, Timestamp};
