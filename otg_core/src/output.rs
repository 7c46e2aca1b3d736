//! Caller-owned output of one control cycle.
//!
//! Created once per generator instance and overwritten every cycle. The
//! caller copies it out (or feeds it back with [`OutputParameter::pass_to_input`])
//! before the next update.

use bitflags::bitflags;

use crate::input::InputParameter;
use crate::trajectory::Trajectory;

bitflags! {
    /// Why the current cycle triggered a fresh calculation.
    ///
    /// Empty on cycles that only advanced along the cached trajectory.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecomputeFlags: u8 {
        /// First update of this generator instance.
        const FIRST_CYCLE       = 0x01;
        /// Target state changed.
        const TARGET_CHANGED    = 0x02;
        /// A kinematic or positional limit changed.
        const LIMITS_CHANGED    = 0x04;
        /// Intermediate positions changed.
        const WAYPOINTS_CHANGED = 0x08;
        /// Control interface or synchronization mode changed.
        const MODE_CHANGED      = 0x10;
        /// A duration constraint changed.
        const DURATION_CHANGED  = 0x20;
        /// The supplied current state deviates from the expected sample
        /// (external feedback or interruption).
        const CURRENT_DEVIATED  = 0x40;
    }
}

/// Sampled state and bookkeeping of the most recent update.
#[derive(Debug, Clone)]
pub struct OutputParameter {
    /// Number of axes.
    pub degrees_of_freedom: usize,

    /// Sampled position per axis.
    pub new_position: Vec<f64>,
    /// Sampled velocity per axis.
    pub new_velocity: Vec<f64>,
    /// Sampled acceleration per axis.
    pub new_acceleration: Vec<f64>,

    /// Time since the current trajectory's start [s].
    pub time: f64,
    /// True only on cycles that ran a fresh calculation.
    pub new_calculation: bool,
    /// Why the calculation ran (empty otherwise).
    pub recompute_flags: RecomputeFlags,
    /// Wall-clock time of the most recent calculation [µs].
    pub calculation_duration: f64,

    /// Index of the active waypoint section.
    pub current_section: usize,
    /// True on the cycle the active section changed.
    pub did_section_change: bool,

    /// The trajectory the sample was taken from.
    pub trajectory: Option<Trajectory>,
}

impl OutputParameter {
    /// Zero-initialized output for `dof` axes.
    pub fn new(dof: usize) -> Self {
        Self {
            degrees_of_freedom: dof,
            new_position: vec![0.0; dof],
            new_velocity: vec![0.0; dof],
            new_acceleration: vec![0.0; dof],
            time: 0.0,
            new_calculation: false,
            recompute_flags: RecomputeFlags::empty(),
            calculation_duration: 0.0,
            current_section: 0,
            did_section_change: false,
            trajectory: None,
        }
    }

    /// Copy the sampled state into the input's current state.
    ///
    /// The manual feedback loop of a setpoint-driven control cycle; swap
    /// in real sensor data instead by writing `input.current_*` yourself.
    pub fn pass_to_input(&self, input: &mut InputParameter) {
        input.current_position.copy_from_slice(&self.new_position);
        input.current_velocity.copy_from_slice(&self.new_velocity);
        input
            .current_acceleration
            .copy_from_slice(&self.new_acceleration);
    }
}
