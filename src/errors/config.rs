// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric setting that must be positive was zero
    ZeroValue {
        /// Dotted path of the offending setting
        field: String,
    },
    /// A numeric setting exceeded the platform limit
    LimitExceeded {
        field: String,
        value: u64,
        max: u64,
    },
    /// A string setting required by the selected strategy was empty
    MissingSetting {
        field: String,
        /// What needs the setting
        required_by: String,
    },
    /// The same queue name was listed more than once
    DuplicateQueue {
        name: String,
    },
    /// The job section does not describe a usable partition
    InvalidJob {
        reason: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroValue { field } => {
                write!(f, "Setting '{}' must be greater than zero", field)
            }
            ValidationError::LimitExceeded { field, value, max } => {
                write!(
                    f,
                    "Setting '{}' is {} but the platform allows at most {}",
                    field, value, max
                )
            }
            ValidationError::MissingSetting { field, required_by } => {
                write!(f, "Setting '{}' is required by {}", field, required_by)
            }
            ValidationError::DuplicateQueue { name } => {
                write!(f, "Queue '{}' is listed more than once", name)
            }
            ValidationError::InvalidJob { reason } => {
                write!(f, "Job settings do not describe a partition: {}", reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a configuration file.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration failed validation: {}", render(.0))]
    Invalid(Vec<ValidationError>),
}

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_lists_every_error() {
        let err = ConfigError::Invalid(vec![
            ValidationError::ZeroValue {
                field: "tracker.poll_interval_ms".into(),
            },
            ValidationError::DuplicateQueue {
                name: "robots-work".into(),
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains("tracker.poll_interval_ms"));
        assert!(rendered.contains("'robots-work' is listed more than once"));
    }
}
