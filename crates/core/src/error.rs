use crate::types::DbId;

/// Domain failure raised when a call violates a precondition.
///
/// Routine business refusals (duplicate child, stale timestamp, inactive
/// target) are reported through `bool`/`Option` return values instead and
/// never surface as a `CoreError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid argument `{field}`: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Value {value} is outside the valid range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidArgument`] on `field`.
    pub fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }
}

/// Reject a blank (empty or whitespace-only) required text field.
pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_argument(field, format!("{field} is required")));
    }
    Ok(())
}

/// Reject a non-positive reference id.
pub(crate) fn require_id(value: DbId, field: &'static str) -> Result<(), CoreError> {
    if value <= 0 {
        return Err(CoreError::invalid_argument(
            field,
            format!("{field} must be greater than zero, got {value}"),
        ));
    }
    Ok(())
}

/// Store a persistence-assigned identity. Identities are write-once.
pub(crate) fn assign_identity(
    slot: &mut DbId,
    id: DbId,
    entity: &'static str,
) -> Result<(), CoreError> {
    require_id(id, "id")?;
    if *slot != 0 {
        return Err(CoreError::InvalidOperation(format!(
            "{entity} already has id {slot}, cannot reassign to {id}"
        )));
    }
    *slot = id;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_write_once() {
        let mut slot = 0;
        assert!(assign_identity(&mut slot, 7, "Sensor").is_ok());
        assert_eq!(slot, 7);
        assert!(assign_identity(&mut slot, 8, "Sensor").is_err());
        assert_eq!(slot, 7);
    }

    #[test]
    fn invalid_argument_display_names_field() {
        let err = CoreError::invalid_argument("name", "name is required");
        assert_eq!(err.to_string(), "Invalid argument `name`: name is required");
    }

    #[test]
    fn out_of_range_display() {
        let err = CoreError::OutOfRange {
            value: 120.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "Value 120 is outside the valid range [0, 100]"
        );
    }

    #[test]
    fn require_text_rejects_whitespace() {
        assert!(require_text("   ", "unit").is_err());
        assert!(require_text("bar", "unit").is_ok());
    }

    #[test]
    fn require_id_rejects_zero_and_negative() {
        assert!(require_id(0, "area_id").is_err());
        assert!(require_id(-3, "area_id").is_err());
        assert!(require_id(1, "area_id").is_ok());
    }
}
