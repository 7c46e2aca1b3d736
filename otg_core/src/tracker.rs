//! Target tracking: follow an externally supplied moving target state.
//!
//! A thin variant of the per-cycle generator. Instead of one fixed target,
//! the caller supplies the target's position/velocity/acceleration every
//! cycle; the tracker filters it with a `reactiveness` knob in [0, 1]
//! (1.0 follows the raw signal, values toward 0.0 smooth harder at the
//! cost of lag), clamps it into the configured bounds, and re-runs a
//! single-section position solve with a one-cycle horizon — no cross-axis
//! synchronization search is needed since only the next sample matters.

use tracing::trace;

use crate::error::{OtgError, UpdateStatus};
use crate::generator::TrajectoryGenerator;
use crate::input::InputParameter;
use crate::kinematics::{ControlInterface, Synchronization, TargetState};
use crate::output::OutputParameter;

/// Per-cycle tracker of a moving target state.
#[derive(Debug)]
pub struct TargetTracker {
    generator: TrajectoryGenerator,
    /// Responsiveness in [0, 1]: 1.0 tracks the raw target state, values
    /// toward 0.0 trade lag for smoothness. Clamped at use.
    pub reactiveness: f64,
    filtered: Option<TargetState>,
}

impl TargetTracker {
    /// Tracker for `dof` axes with a fixed control cycle [s].
    pub fn new(dof: usize, cycle_time: f64) -> Self {
        Self {
            generator: TrajectoryGenerator::new(dof, cycle_time),
            reactiveness: 1.0,
            filtered: None,
        }
    }

    /// Number of axes.
    #[inline]
    pub fn degrees_of_freedom(&self) -> usize {
        self.generator.degrees_of_freedom()
    }

    /// The control cycle length [s].
    #[inline]
    pub fn delta_time(&self) -> f64 {
        self.generator.cycle_time().unwrap_or(0.0)
    }

    /// One tracking cycle: re-target to `target` and sample the next step.
    ///
    /// The caller's input supplies the current state and limits; its
    /// target fields are ignored. The caller feeds the output back (or
    /// substitutes sensor data) exactly as with the plain generator.
    pub fn update(
        &mut self,
        target: &TargetState,
        input: &InputParameter,
        output: &mut OutputParameter,
    ) -> Result<UpdateStatus, OtgError> {
        let dof = self.generator.degrees_of_freedom();
        if target.position.len() != dof
            || target.velocity.len() != dof
            || target.acceleration.len() != dof
        {
            return Err(OtgError::InvalidInput(format!(
                "target state shape does not match {dof} degrees of freedom"
            )));
        }

        let alpha = self.reactiveness.clamp(0.0, 1.0);
        let filtered = match self.filtered.take() {
            Some(mut f) if alpha < 1.0 => {
                for i in 0..dof {
                    f.position[i] += alpha * (target.position[i] - f.position[i]);
                    f.velocity[i] += alpha * (target.velocity[i] - f.velocity[i]);
                    f.acceleration[i] += alpha * (target.acceleration[i] - f.acceleration[i]);
                }
                f
            }
            _ => target.clone(),
        };

        // Internal one-step input: the filtered target, clamped into the
        // caller's limits and bounds, with synchronization disabled.
        let mut internal = input.clone();
        internal.control_interface = ControlInterface::Position;
        internal.synchronization = Synchronization::No;
        internal.intermediate_positions.clear();
        internal.minimum_duration = None;
        internal.per_section_minimum_duration = None;
        for i in 0..dof {
            let lim = internal.limits_for_axis(i);
            let mut p = filtered.position[i];
            if let Some(lo) = lim.min_position {
                p = p.max(lo);
            }
            if let Some(hi) = lim.max_position {
                p = p.min(hi);
            }
            internal.target_position[i] = p;
            internal.target_velocity[i] =
                filtered.velocity[i].clamp(lim.min_velocity, lim.max_velocity);
            internal.target_acceleration[i] =
                filtered.acceleration[i].clamp(lim.min_acceleration, lim.max_acceleration);
        }

        trace!(alpha, "tracking cycle");
        self.filtered = Some(filtered);
        self.generator.update(&internal, output)
    }
}
