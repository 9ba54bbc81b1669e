//! Configuration validation

use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Operator '{operator_id}': {message}")]
    OperatorError {
        operator_id: String,
        message: String,
    },

    #[error("Duplicate operator id: {0}")]
    DuplicateOperatorId(String),

    #[error("Whitelist entry {index}: {message}")]
    WhitelistError { index: usize, message: String },

    #[error("Motion config error: {0}")]
    MotionError(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.operators.is_empty() {
        errors.push(ValidationError::GlobalError(
            "at least one operator must be configured".into(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for operator in &config.operators {
        if operator.id.trim().is_empty() {
            errors.push(ValidationError::OperatorError {
                operator_id: operator.id.clone(),
                message: "id cannot be empty".into(),
            });
        }
        if !seen_ids.insert(&operator.id) {
            errors.push(ValidationError::DuplicateOperatorId(operator.id.clone()));
        }
    }

    for (index, prefix) in config.command_whitelist.iter().enumerate() {
        if prefix.trim().is_empty() {
            errors.push(ValidationError::WhitelistError {
                index,
                message: "prefix cannot be empty".into(),
            });
        } else if prefix.starts_with(char::is_whitespace) {
            // A leading-space prefix would never match a trimmed command.
            errors.push(ValidationError::WhitelistError {
                index,
                message: "prefix cannot start with whitespace".into(),
            });
        }
    }

    if config.motion.area_threshold == Some(0) {
        errors.push(ValidationError::MotionError(
            "area_threshold must be greater than zero".into(),
        ));
    }

    if let (Some(w), Some(h)) = (config.motion.frame_width, config.motion.frame_height)
        && (w == 0 || h == 0)
    {
        errors.push(ValidationError::MotionError(
            "frame dimensions must be greater than zero".into(),
        ));
    }

    if config.command.timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "command timeout must be greater than zero".into(),
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawCommandConfig, RawDaemonConfig, RawMotionConfig, RawOperator};

    fn base_config() -> RawConfig {
        RawConfig {
            config_version: 1,
            daemon: RawDaemonConfig::default(),
            operators: vec![RawOperator {
                id: "1001".into(),
                name: Some("alice".into()),
            }],
            command_whitelist: vec!["uptime".into()],
            motion: RawMotionConfig::default(),
            command: RawCommandConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&base_config()).is_empty());
    }

    #[test]
    fn empty_operators_rejected() {
        let mut config = base_config();
        config.operators.clear();

        let errors = validate_config(&config);
        assert!(matches!(errors[0], ValidationError::GlobalError(_)));
    }

    #[test]
    fn duplicate_operator_rejected() {
        let mut config = base_config();
        config.operators.push(RawOperator {
            id: "1001".into(),
            name: None,
        });

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateOperatorId(_))));
    }

    #[test]
    fn empty_whitelist_prefix_rejected() {
        let mut config = base_config();
        config.command_whitelist.push("  ".into());

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::WhitelistError { .. })));
    }

    #[test]
    fn zero_area_threshold_rejected() {
        let mut config = base_config();
        config.motion.area_threshold = Some(0);

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MotionError(_))));
    }
}
