use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning values the simulation reads every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Mobs younger than this (seconds) push with reduced strength.
    pub push_throttle_timeout: f32,
    pub push_throttle_factor: f32,
    /// Rate cap (units per second) for types that push softly.
    pub push_softly_amount: f32,
    /// Added to the push speed when the physics step consumes it.
    pub push_extra_amount: f32,
    pub idle_push_amount: f32,
    pub idle_push_jitter: f32,
    pub task_range: f32,
    pub gravity: f32,
    pub max_event_depth: u32,
    pub opponent_hit_timeout: f32,
    pub leader_active_state: String,
    pub max_health_floor: f32,
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            push_throttle_timeout: 1.0,
            push_throttle_factor: 0.1,
            push_softly_amount: 60.0,
            push_extra_amount: 50.0,
            idle_push_amount: 0.1,
            idle_push_jitter: 0.1,
            task_range: 20.0,
            gravity: -2600.0,
            max_event_depth: 16,
            opponent_hit_timeout: 0.5,
            leader_active_state: "active".to_string(),
            max_health_floor: 0.0,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimConfigError {
    #[error("parse sim config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid sim config value {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl SimConfig {
    /// Parses JSON, reporting the path of the first offending field.
    pub fn from_json_str(raw: &str) -> Result<Self, SimConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = serde_path_to_error::deserialize::<_, SimConfig>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                SimConfigError::Parse {
                    path,
                    source: error.into_inner(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        let positive = [
            ("push_throttle_timeout", self.push_throttle_timeout),
            ("push_softly_amount", self.push_softly_amount),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimConfigError::Invalid {
                    field,
                    message: format!("must be finite and > 0, got {value}"),
                });
            }
        }
        let non_negative = [
            ("push_throttle_factor", self.push_throttle_factor),
            ("push_extra_amount", self.push_extra_amount),
            ("idle_push_amount", self.idle_push_amount),
            ("task_range", self.task_range),
            ("opponent_hit_timeout", self.opponent_hit_timeout),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimConfigError::Invalid {
                    field,
                    message: format!("must be finite and >= 0, got {value}"),
                });
            }
        }
        if self.max_event_depth == 0 {
            return Err(SimConfigError::Invalid {
                field: "max_event_depth",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = SimConfig::from_json_str("{}").expect("defaults");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn unknown_field_reports_path() {
        let err = SimConfig::from_json_str(r#"{"push_softly": 3}"#).expect_err("unknown field");
        assert!(matches!(err, SimConfigError::Parse { .. }));
    }

    #[test]
    fn wrong_type_reports_field_path() {
        let err =
            SimConfig::from_json_str(r#"{"task_range": "far"}"#).expect_err("wrong type");
        match err {
            SimConfigError::Parse { path, .. } => assert_eq!(path, "task_range"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_positive_throttle_timeout_is_rejected() {
        let err = SimConfig::from_json_str(r#"{"push_throttle_timeout": 0}"#)
            .expect_err("zero timeout");
        assert!(matches!(
            err,
            SimConfigError::Invalid {
                field: "push_throttle_timeout",
                ..
            }
        ));
    }
}
