//! Kinematic value types and the control/synchronization mode enums.
//!
//! [`KinematicState`] is the per-axis position/velocity/acceleration triple
//! used throughout the solvers and the trajectory query API. All types here
//! are plain `Copy` values; ownership of vectors of them stays with the
//! caller-facing parameter objects.

use serde::{Deserialize, Serialize};

/// Position, velocity, and acceleration of one axis at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicState {
    /// Position [user units].
    pub position: f64,
    /// Velocity [user units/s].
    pub velocity: f64,
    /// Acceleration [user units/s²].
    pub acceleration: f64,
}

impl KinematicState {
    /// Create a state from its three components.
    pub const fn new(position: f64, velocity: f64, acceleration: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration,
        }
    }

    /// All three components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

/// The moving target supplied to the tracker each cycle.
///
/// Ephemeral by contract: the tracker copies what it needs and never keeps
/// a reference across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetState {
    /// Target position per axis.
    pub position: Vec<f64>,
    /// Target velocity per axis.
    pub velocity: Vec<f64>,
    /// Target acceleration per axis.
    pub acceleration: Vec<f64>,
}

impl TargetState {
    /// Create a zeroed target for `dof` axes.
    pub fn new(dof: usize) -> Self {
        Self {
            position: vec![0.0; dof],
            velocity: vec![0.0; dof],
            acceleration: vec![0.0; dof],
        }
    }
}

/// Whether the terminal target binds position or only velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlInterface {
    /// Target position, velocity, and acceleration are all binding.
    #[default]
    Position,
    /// Only target velocity and acceleration bind; position runs free.
    Velocity,
}

/// Cross-axis duration synchronization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Synchronization {
    /// All axes finish together at the common duration.
    #[default]
    Time,
    /// Synchronize only when more than one axis moves non-trivially.
    TimeIfNecessary,
    /// Additionally align phase boundaries across axes (co-linear motion
    /// only; falls back to `Time` otherwise).
    Phase,
    /// No synchronization — every axis runs its own minimum-time profile.
    /// Used for independent-axis stops.
    No,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_finiteness() {
        assert!(KinematicState::new(1.0, -2.0, 0.5).is_finite());
        assert!(!KinematicState::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!KinematicState::new(0.0, f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn target_state_shape() {
        let t = TargetState::new(3);
        assert_eq!(t.position.len(), 3);
        assert_eq!(t.velocity.len(), 3);
        assert_eq!(t.acceleration.len(), 3);
    }

    #[test]
    fn defaults() {
        assert_eq!(ControlInterface::default(), ControlInterface::Position);
        assert_eq!(Synchronization::default(), Synchronization::Time);
    }
}
