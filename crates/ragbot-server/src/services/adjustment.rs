use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::{AdjustmentPayload, ConfigField, ConfigValue};

use super::catalog::ActionCatalog;
use super::generation_settings::GenerationSettings;

#[derive(Error, Debug, PartialEq)]
pub enum AdjustmentError {
    #[error("Unknown action id {0}")]
    UnknownAction(i64),

    #[error("Action '{0}' does not name an adjustable generation field")]
    NotAdjustable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOutcome {
    pub field: ConfigField,
    pub old: ConfigValue,
    pub new: ConfigValue,
    pub version: u64,
    /// Text shown in place of the control once a button was pressed.
    pub acknowledgement: String,
}

/// Applies `-`/`+` button presses to the shared generation config.
pub struct AdjustmentService {
    catalog: Arc<ActionCatalog>,
    settings: Arc<GenerationSettings>,
}

impl AdjustmentService {
    pub fn new(catalog: Arc<ActionCatalog>, settings: Arc<GenerationSettings>) -> Self {
        Self { catalog, settings }
    }

    pub fn apply(&self, payload: &AdjustmentPayload) -> Result<AdjustmentOutcome, AdjustmentError> {
        let action = self
            .catalog
            .find_by_id(payload.action_id)
            .ok_or(AdjustmentError::UnknownAction(payload.action_id))?;

        let field: ConfigField = action
            .name
            .parse()
            .map_err(|_| AdjustmentError::NotAdjustable(action.name.clone()))?;

        // Read-modify-write under one write lock
        let (version, (old, new)) = self.settings.update(|config| {
            let old = config.get(field);
            let new = old.scaled(payload.action.factor());
            config.set(field, new);
            (old, new)
        });

        info!(
            "Adjusted {} {}: {} -> {} (config v{})",
            field.name(),
            payload.action.as_str(),
            old,
            new,
            version
        );

        Ok(AdjustmentOutcome {
            field,
            old,
            new,
            version,
            acknowledgement: format!("Selected option: {}", payload.action.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, GenerationConfig};
    use crate::services::catalog::Action;

    fn service() -> (AdjustmentService, Arc<GenerationSettings>) {
        let catalog = Arc::new(ActionCatalog::new(vec![
            Action { id: 1, name: "top_k".into(), reference_vector: vec![1.0] },
            Action { id: 2, name: "top_p".into(), reference_vector: vec![1.0] },
            Action { id: 3, name: "tell_a_joke".into(), reference_vector: vec![1.0] },
        ]));
        let settings = Arc::new(GenerationSettings::new(GenerationConfig::default()));
        (AdjustmentService::new(catalog, settings.clone()), settings)
    }

    fn press(action_id: i64, action: Direction) -> AdjustmentPayload {
        AdjustmentPayload { action_id, action }
    }

    #[test]
    fn test_integer_field_round_trip() {
        let (service, settings) = service();

        let up = service.apply(&press(1, Direction::Increase)).unwrap();
        assert_eq!(up.old, ConfigValue::Integer(50));
        assert_eq!(up.new, ConfigValue::Integer(63));
        assert_eq!(up.acknowledgement, "Selected option: increase");

        let down = service.apply(&press(1, Direction::Decrease)).unwrap();
        assert_eq!(down.new, ConfigValue::Integer(47));
        assert_eq!(down.acknowledgement, "Selected option: decrease");

        let snapshot = settings.snapshot();
        assert_eq!(snapshot.value.top_k, 47);
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn test_float_field_decrease() {
        let (service, settings) = service();

        let outcome = service.apply(&press(2, Direction::Decrease)).unwrap();
        assert_eq!(outcome.field, ConfigField::TopP);
        assert_eq!(outcome.new, ConfigValue::Float(0.71));
        assert_eq!(settings.snapshot().value.top_p, 0.71);
    }

    #[test]
    fn test_unknown_or_unadjustable_actions() {
        let (service, settings) = service();

        assert_eq!(
            service.apply(&press(99, Direction::Increase)),
            Err(AdjustmentError::UnknownAction(99))
        );
        assert_eq!(
            service.apply(&press(3, Direction::Increase)),
            Err(AdjustmentError::NotAdjustable("tell_a_joke".into()))
        );
        assert_eq!(settings.snapshot().version, 0);
    }
}
