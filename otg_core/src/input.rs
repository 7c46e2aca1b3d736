//! Caller-owned input parameters for one calculation.
//!
//! The generator reads, never writes: feedback flows back explicitly via
//! [`crate::output::OutputParameter::pass_to_input`] or sensor data the
//! caller fills in itself. All vector fields must have length equal to the
//! degrees of freedom; shapes are checked before any computation.

use crate::error::OtgError;
use crate::kinematics::{ControlInterface, KinematicState, Synchronization};
use crate::limits::Limits;
use crate::solver::roots;

/// Input state, target, limits, and options for one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParameter {
    /// Number of axes; fixed at construction.
    pub degrees_of_freedom: usize,

    /// Whether the target binds position or only velocity.
    pub control_interface: ControlInterface,
    /// Cross-axis duration synchronization policy.
    pub synchronization: Synchronization,

    /// Current position per axis.
    pub current_position: Vec<f64>,
    /// Current velocity per axis.
    pub current_velocity: Vec<f64>,
    /// Current acceleration per axis.
    pub current_acceleration: Vec<f64>,

    /// Target position per axis (ignored under the velocity interface).
    pub target_position: Vec<f64>,
    /// Target velocity per axis.
    pub target_velocity: Vec<f64>,
    /// Target acceleration per axis.
    pub target_acceleration: Vec<f64>,

    /// Velocity cap per axis, > 0.
    pub max_velocity: Vec<f64>,
    /// Acceleration cap per axis, > 0.
    pub max_acceleration: Vec<f64>,
    /// Jerk cap per axis, > 0 (infinity disables jerk limiting).
    pub max_jerk: Vec<f64>,

    /// Asymmetric velocity floor per axis (< 0); `-max_velocity` if unset.
    pub min_velocity: Option<Vec<f64>>,
    /// Asymmetric acceleration floor per axis (< 0); `-max_acceleration`
    /// if unset.
    pub min_acceleration: Option<Vec<f64>>,

    /// Lower position bound per axis, optional.
    pub min_position: Option<Vec<f64>>,
    /// Upper position bound per axis, optional.
    pub max_position: Option<Vec<f64>>,

    /// Positions the trajectory must pass through, in order. Each row has
    /// one entry per axis. Requires the position interface.
    pub intermediate_positions: Vec<Vec<f64>>,

    /// Minimum overall trajectory duration [s].
    pub minimum_duration: Option<f64>,
    /// Minimum duration per section [s]; length = waypoints + 1.
    pub per_section_minimum_duration: Option<Vec<f64>>,

    /// Cooperative wall-clock budget for one calculation [µs].
    pub interrupt_calculation_duration: Option<u64>,
}

impl InputParameter {
    /// Zero-initialized input for `dof` axes. Limits start at zero and
    /// must be set before the first calculation.
    pub fn new(dof: usize) -> Self {
        Self {
            degrees_of_freedom: dof,
            control_interface: ControlInterface::default(),
            synchronization: Synchronization::default(),
            current_position: vec![0.0; dof],
            current_velocity: vec![0.0; dof],
            current_acceleration: vec![0.0; dof],
            target_position: vec![0.0; dof],
            target_velocity: vec![0.0; dof],
            target_acceleration: vec![0.0; dof],
            max_velocity: vec![0.0; dof],
            max_acceleration: vec![0.0; dof],
            max_jerk: vec![0.0; dof],
            min_velocity: None,
            min_acceleration: None,
            min_position: None,
            max_position: None,
            intermediate_positions: Vec::new(),
            minimum_duration: None,
            per_section_minimum_duration: None,
            interrupt_calculation_duration: None,
        }
    }

    /// Assemble the [`Limits`] of one axis.
    pub fn limits_for_axis(&self, axis: usize) -> Limits {
        Limits {
            max_velocity: self.max_velocity[axis],
            min_velocity: self
                .min_velocity
                .as_ref()
                .map_or(-self.max_velocity[axis], |v| v[axis]),
            max_acceleration: self.max_acceleration[axis],
            min_acceleration: self
                .min_acceleration
                .as_ref()
                .map_or(-self.max_acceleration[axis], |v| v[axis]),
            max_jerk: self.max_jerk[axis],
            min_position: self.min_position.as_ref().map(|v| v[axis]),
            max_position: self.max_position.as_ref().map(|v| v[axis]),
        }
    }

    /// Current kinematic state of one axis.
    #[inline]
    pub fn current_state(&self, axis: usize) -> KinematicState {
        KinematicState::new(
            self.current_position[axis],
            self.current_velocity[axis],
            self.current_acceleration[axis],
        )
    }

    /// Target kinematic state of one axis.
    #[inline]
    pub fn target_state(&self, axis: usize) -> KinematicState {
        KinematicState::new(
            self.target_position[axis],
            self.target_velocity[axis],
            self.target_acceleration[axis],
        )
    }

    /// Number of axes with a non-trivial motion demand.
    pub(crate) fn active_axes(&self) -> usize {
        (0..self.degrees_of_freedom)
            .filter(|&i| {
                let tol_v = roots::tol(self.max_velocity[i]);
                match self.control_interface {
                    ControlInterface::Position => {
                        (self.target_position[i] - self.current_position[i]).abs()
                            > roots::tol(self.target_position[i])
                            || self.current_velocity[i].abs() > tol_v
                            || self.target_velocity[i].abs() > tol_v
                    }
                    ControlInterface::Velocity => {
                        (self.target_velocity[i] - self.current_velocity[i]).abs() > tol_v
                            || (self.target_acceleration[i] - self.current_acceleration[i]).abs()
                                > roots::tol(self.max_acceleration[i])
                    }
                }
            })
            .count()
    }

    /// Validate shapes and values against the generator's geometry.
    ///
    /// Everything here is cheap; the call runs before each calculation.
    pub fn validate(&self, dof: usize, waypoint_capacity: usize) -> Result<(), OtgError> {
        if self.degrees_of_freedom != dof {
            return Err(OtgError::InvalidInput(format!(
                "input has {} degrees of freedom, generator expects {dof}",
                self.degrees_of_freedom
            )));
        }

        let check_len = |name: &str, len: usize| -> Result<(), OtgError> {
            if len != dof {
                return Err(OtgError::InvalidInput(format!(
                    "{name} has length {len}, expected {dof}"
                )));
            }
            Ok(())
        };
        check_len("current_position", self.current_position.len())?;
        check_len("current_velocity", self.current_velocity.len())?;
        check_len("current_acceleration", self.current_acceleration.len())?;
        check_len("target_position", self.target_position.len())?;
        check_len("target_velocity", self.target_velocity.len())?;
        check_len("target_acceleration", self.target_acceleration.len())?;
        check_len("max_velocity", self.max_velocity.len())?;
        check_len("max_acceleration", self.max_acceleration.len())?;
        check_len("max_jerk", self.max_jerk.len())?;
        for (name, opt) in [
            ("min_velocity", &self.min_velocity),
            ("min_acceleration", &self.min_acceleration),
            ("min_position", &self.min_position),
            ("max_position", &self.max_position),
        ] {
            if let Some(v) = opt {
                check_len(name, v.len())?;
            }
        }

        for i in 0..dof {
            if !self.current_state(i).is_finite() {
                return Err(OtgError::InvalidInput(format!(
                    "axis {i}: current state is not finite"
                )));
            }
            if !(self.target_velocity[i].is_finite() && self.target_acceleration[i].is_finite()) {
                return Err(OtgError::InvalidInput(format!(
                    "axis {i}: target velocity/acceleration is not finite"
                )));
            }
            if self.control_interface == ControlInterface::Position
                && !self.target_position[i].is_finite()
            {
                return Err(OtgError::InvalidInput(format!(
                    "axis {i}: target_position is not finite"
                )));
            }

            let lim = self.limits_for_axis(i);
            lim.validate(i)?;

            let v_tol = roots::tol(lim.max_velocity);
            let a_tol = roots::tol(lim.max_acceleration);
            if self.control_interface == ControlInterface::Position {
                if self.target_velocity[i] > lim.max_velocity + v_tol
                    || self.target_velocity[i] < lim.min_velocity - v_tol
                {
                    return Err(OtgError::InvalidInput(format!(
                        "axis {i}: target_velocity {} outside [{}, {}]",
                        self.target_velocity[i], lim.min_velocity, lim.max_velocity
                    )));
                }
                if !lim.position_in_bounds(self.target_position[i], roots::tol(self.target_position[i]))
                {
                    return Err(OtgError::InvalidInput(format!(
                        "axis {i}: target_position {} outside position bounds",
                        self.target_position[i]
                    )));
                }
            }
            if self.target_acceleration[i] > lim.max_acceleration + a_tol
                || self.target_acceleration[i] < lim.min_acceleration - a_tol
            {
                return Err(OtgError::InvalidInput(format!(
                    "axis {i}: target_acceleration {} outside [{}, {}]",
                    self.target_acceleration[i], lim.min_acceleration, lim.max_acceleration
                )));
            }
        }

        // Waypoints.
        if !self.intermediate_positions.is_empty() {
            if self.control_interface != ControlInterface::Position {
                return Err(OtgError::InvalidInput(
                    "intermediate_positions require the position control interface".into(),
                ));
            }
            if self.intermediate_positions.len() > waypoint_capacity {
                return Err(OtgError::InvalidInput(format!(
                    "{} intermediate positions exceed the waypoint capacity {waypoint_capacity}",
                    self.intermediate_positions.len()
                )));
            }
            for (k, row) in self.intermediate_positions.iter().enumerate() {
                if row.len() != dof {
                    return Err(OtgError::InvalidInput(format!(
                        "intermediate position {k} has length {}, expected {dof}",
                        row.len()
                    )));
                }
                for (i, &p) in row.iter().enumerate() {
                    if !p.is_finite() {
                        return Err(OtgError::InvalidInput(format!(
                            "intermediate position {k}, axis {i} is not finite"
                        )));
                    }
                    let lim = self.limits_for_axis(i);
                    if !lim.position_in_bounds(p, roots::tol(p)) {
                        return Err(OtgError::InvalidInput(format!(
                            "intermediate position {k}, axis {i} outside position bounds"
                        )));
                    }
                }
            }
        }

        if let Some(d) = self.minimum_duration {
            if !(d.is_finite() && d >= 0.0) {
                return Err(OtgError::InvalidInput(
                    "minimum_duration must be finite and non-negative".into(),
                ));
            }
        }
        if let Some(floors) = &self.per_section_minimum_duration {
            let expected = self.intermediate_positions.len() + 1;
            if floors.len() != expected {
                return Err(OtgError::InvalidInput(format!(
                    "per_section_minimum_duration has length {}, expected {expected}",
                    floors.len()
                )));
            }
            for (k, &d) in floors.iter().enumerate() {
                if !(d.is_finite() && d >= 0.0) {
                    return Err(OtgError::InvalidInput(format!(
                        "per_section_minimum_duration[{k}] must be finite and non-negative"
                    )));
                }
            }
        }
        if let Some(budget) = self.interrupt_calculation_duration {
            if budget == 0 {
                return Err(OtgError::InvalidInput(
                    "interrupt_calculation_duration must be positive".into(),
                ));
            }
        }

        Ok(())
    }
}
