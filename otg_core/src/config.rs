//! TOML machine-profile loading.
//!
//! A machine profile describes the generator geometry and one `[[axis]]`
//! table per axis. Loading is a two-step contract: deserialize, then
//! semantic `validate()`. The profile converts directly into a generator
//! and a pre-filled [`InputParameter`] (limits set, states zeroed).
//!
//! ```toml
//! [generator]
//! degrees_of_freedom = 3
//! control_cycle = 0.01
//! waypoint_capacity = 10
//!
//! [[axis]]
//! name = "x"
//! max_velocity = 3.0
//! max_acceleration = 3.0
//! max_jerk = 4.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::TrajectoryGenerator;
use crate::input::InputParameter;
use crate::limits::Limits;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Generator geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of axes.
    pub degrees_of_freedom: usize,
    /// Control cycle length [s]; omit for offline-only use.
    pub control_cycle: Option<f64>,
    /// Waypoint buffer capacity.
    #[serde(default)]
    pub waypoint_capacity: usize,
}

/// Limits of one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Optional display name.
    pub name: Option<String>,
    /// Velocity cap [user units/s].
    pub max_velocity: f64,
    /// Acceleration cap [user units/s²].
    pub max_acceleration: f64,
    /// Jerk cap [user units/s³]; omit to disable jerk limiting.
    pub max_jerk: Option<f64>,
    /// Asymmetric velocity floor; defaults to `-max_velocity`.
    pub min_velocity: Option<f64>,
    /// Asymmetric acceleration floor; defaults to `-max_acceleration`.
    pub min_acceleration: Option<f64>,
    /// Lower position bound.
    pub min_position: Option<f64>,
    /// Upper position bound.
    pub max_position: Option<f64>,
}

impl AxisConfig {
    /// Convert to runtime [`Limits`].
    pub fn to_limits(&self) -> Limits {
        Limits {
            max_velocity: self.max_velocity,
            min_velocity: self.min_velocity.unwrap_or(-self.max_velocity),
            max_acceleration: self.max_acceleration,
            min_acceleration: self.min_acceleration.unwrap_or(-self.max_acceleration),
            max_jerk: self.max_jerk.unwrap_or(f64::INFINITY),
            min_position: self.min_position,
            max_position: self.max_position,
        }
    }
}

/// A complete machine profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtgConfig {
    /// Generator geometry.
    pub generator: GeneratorConfig,
    /// One entry per axis, in order.
    #[serde(default, rename = "axis")]
    pub axes: Vec<AxisConfig>,
}

impl OtgConfig {
    /// Semantic validation after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator.degrees_of_freedom == 0 {
            return Err(ConfigError::ValidationError(
                "degrees_of_freedom must be positive".to_string(),
            ));
        }
        if let Some(cycle) = self.generator.control_cycle {
            if !(cycle.is_finite() && cycle > 0.0) {
                return Err(ConfigError::ValidationError(
                    "control_cycle must be finite and positive".to_string(),
                ));
            }
        }
        if self.axes.len() != self.generator.degrees_of_freedom {
            return Err(ConfigError::ValidationError(format!(
                "expected {} [[axis]] entries, found {}",
                self.generator.degrees_of_freedom,
                self.axes.len()
            )));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            axis.to_limits().validate(i).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "axis {} ({}): {e}",
                    i,
                    axis.name.as_deref().unwrap_or("unnamed")
                ))
            })?;
        }
        Ok(())
    }

    /// Build the generator this profile describes.
    pub fn to_generator(&self) -> TrajectoryGenerator {
        match self.generator.control_cycle {
            Some(cycle) => TrajectoryGenerator::with_waypoint_capacity(
                self.generator.degrees_of_freedom,
                cycle,
                self.generator.waypoint_capacity,
            ),
            None => TrajectoryGenerator::new_offline(self.generator.degrees_of_freedom),
        }
    }

    /// Build an input with this profile's limits and zeroed states.
    pub fn to_input(&self) -> InputParameter {
        let dof = self.generator.degrees_of_freedom;
        let mut input = InputParameter::new(dof);
        for (i, axis) in self.axes.iter().enumerate() {
            input.max_velocity[i] = axis.max_velocity;
            input.max_acceleration[i] = axis.max_acceleration;
            input.max_jerk[i] = axis.max_jerk.unwrap_or(f64::INFINITY);
        }
        if self.axes.iter().any(|a| a.min_velocity.is_some()) {
            input.min_velocity = Some(
                self.axes
                    .iter()
                    .map(|a| a.min_velocity.unwrap_or(-a.max_velocity))
                    .collect(),
            );
        }
        if self.axes.iter().any(|a| a.min_acceleration.is_some()) {
            input.min_acceleration = Some(
                self.axes
                    .iter()
                    .map(|a| a.min_acceleration.unwrap_or(-a.max_acceleration))
                    .collect(),
            );
        }
        if self.axes.iter().any(|a| a.min_position.is_some()) {
            input.min_position = Some(
                self.axes
                    .iter()
                    .map(|a| a.min_position.unwrap_or(f64::NEG_INFINITY))
                    .collect(),
            );
        }
        if self.axes.iter().any(|a| a.max_position.is_some()) {
            input.max_position = Some(
                self.axes
                    .iter()
                    .map(|a| a.max_position.unwrap_or(f64::INFINITY))
                    .collect(),
            );
        }
        input
    }
}

/// Trait for loading configuration from TOML files.
///
/// Default implementation for any `DeserializeOwned` type.
///
/// # Contract
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ParseError` if the TOML syntax or shape is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load and parse a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl ConfigLoader for OtgConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROFILE: &str = r#"
        [generator]
        degrees_of_freedom = 2
        control_cycle = 0.01
        waypoint_capacity = 4

        [[axis]]
        name = "x"
        max_velocity = 3.0
        max_acceleration = 3.0
        max_jerk = 4.0

        [[axis]]
        name = "z"
        max_velocity = 1.0
        max_acceleration = 2.0
        max_jerk = 3.0
        min_velocity = -0.5
        min_position = -1.0
        max_position = 1.0
    "#;

    #[test]
    fn parses_and_validates() {
        let cfg: OtgConfig = toml::from_str(PROFILE).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.generator.degrees_of_freedom, 2);
        assert_eq!(cfg.axes[1].name.as_deref(), Some("z"));
    }

    #[test]
    fn load_from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROFILE.as_bytes()).unwrap();

        let cfg = OtgConfig::load(file.path()).unwrap();
        cfg.validate().unwrap();

        let input = cfg.to_input();
        assert_eq!(input.max_velocity, vec![3.0, 1.0]);
        assert_eq!(input.min_velocity.as_ref().unwrap()[1], -0.5);
        assert_eq!(input.min_position.as_ref().unwrap()[1], -1.0);
        assert!(input.validate(2, 4).is_ok());

        let otg = cfg.to_generator();
        assert_eq!(otg.degrees_of_freedom(), 2);
        assert_eq!(otg.cycle_time(), Some(0.01));
        assert_eq!(otg.waypoint_capacity(), 4);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = OtgConfig::load(Path::new("/nonexistent/profile.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound));
    }

    #[test]
    fn axis_count_mismatch_fails_validation() {
        let cfg: OtgConfig = toml::from_str(
            r#"
            [generator]
            degrees_of_freedom = 3

            [[axis]]
            max_velocity = 1.0
            max_acceleration = 1.0
            max_jerk = 1.0
        "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_limit_is_reported_with_axis_name() {
        let cfg: OtgConfig = toml::from_str(
            r#"
            [generator]
            degrees_of_freedom = 1

            [[axis]]
            name = "spindle"
            max_velocity = -1.0
            max_acceleration = 1.0
            max_jerk = 1.0
        "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err}").contains("spindle"));
    }

    #[test]
    fn omitted_jerk_disables_jerk_limiting() {
        let cfg: OtgConfig = toml::from_str(
            r#"
            [generator]
            degrees_of_freedom = 1

            [[axis]]
            max_velocity = 1.0
            max_acceleration = 1.0
        "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert!(!cfg.axes[0].to_limits().has_finite_jerk());
    }

    #[test]
    fn offline_profile_has_no_cycle() {
        let cfg: OtgConfig = toml::from_str(
            r#"
            [generator]
            degrees_of_freedom = 1

            [[axis]]
            max_velocity = 1.0
            max_acceleration = 1.0
            max_jerk = 2.0
        "#,
        )
        .unwrap();
        let otg = cfg.to_generator();
        assert_eq!(otg.cycle_time(), None);
    }
}
