//! The online trajectory generator: per-cycle update and offline solve.
//!
//! One instance owns one working trajectory and the bookkeeping to decide,
//! every control cycle, whether that trajectory is still valid for the
//! cycle's input. A fresh calculation runs only when something changed —
//! the first cycle, a new target, new limits or waypoints, or a current
//! state that deviates from the expected sample (sensor feedback or an
//! interruption). All other cycles just advance along the cached
//! trajectory, which keeps the steady-state cost of `update` to a few
//! polynomial evaluations.
//!
//! Instances hold private mutable state and are not safe for concurrent
//! calls from multiple threads; distinct instances are fully independent.

use tracing::debug;

use crate::error::{OtgError, UpdateStatus};
use crate::input::InputParameter;
use crate::kinematics::KinematicState;
use crate::limits::Limits;
use crate::output::{OutputParameter, RecomputeFlags};
use crate::profile::T_EPS;
use crate::sync::{CalcBudget, SectionRequest, synchronize_section};
use crate::trajectory::Trajectory;
use crate::waypoints;

/// Relative deviation above which a supplied current state no longer
/// counts as "our own previous output".
const FEEDBACK_TOLERANCE: f64 = 1e-8;

/// On-the-fly trajectory generator for a fixed number of axes.
#[derive(Debug)]
pub struct TrajectoryGenerator {
    dof: usize,
    cycle_time: Option<f64>,
    waypoint_capacity: usize,

    /// The working trajectory; `None` until the first calculation.
    trajectory: Option<Trajectory>,
    /// Time already sampled on the working trajectory [s].
    elapsed: f64,
    /// Input snapshot the working trajectory was calculated from.
    cached: Option<InputParameter>,
    /// Sample the caller is expected to feed back as the next current
    /// state.
    expected: Vec<KinematicState>,
    have_expected: bool,
    last_section: usize,
    sample_buf: Vec<KinematicState>,
}

impl TrajectoryGenerator {
    /// Online generator with a fixed control cycle [s].
    pub fn new(dof: usize, cycle_time: f64) -> Self {
        Self::with_waypoint_capacity(dof, cycle_time, 0)
    }

    /// Online generator with room for intermediate waypoints.
    pub fn with_waypoint_capacity(dof: usize, cycle_time: f64, waypoint_capacity: usize) -> Self {
        Self {
            dof,
            cycle_time: Some(cycle_time),
            waypoint_capacity,
            trajectory: None,
            elapsed: 0.0,
            cached: None,
            expected: vec![KinematicState::default(); dof],
            have_expected: false,
            last_section: 0,
            sample_buf: vec![KinematicState::default(); dof],
        }
    }

    /// Offline-only generator: `calculate` works, `update` does not.
    pub fn new_offline(dof: usize) -> Self {
        let mut g = Self::with_waypoint_capacity(dof, 0.0, usize::MAX);
        g.cycle_time = None;
        g
    }

    /// Number of axes.
    #[inline]
    pub fn degrees_of_freedom(&self) -> usize {
        self.dof
    }

    /// Configured control cycle [s], if any.
    #[inline]
    pub fn cycle_time(&self) -> Option<f64> {
        self.cycle_time
    }

    /// Waypoint capacity.
    #[inline]
    pub fn waypoint_capacity(&self) -> usize {
        self.waypoint_capacity
    }

    /// Drop the cached trajectory; the next update recalculates.
    pub fn reset(&mut self) {
        self.trajectory = None;
        self.cached = None;
        self.have_expected = false;
        self.elapsed = 0.0;
        self.last_section = 0;
    }

    /// Per-cycle update with the configured control cycle.
    pub fn update(
        &mut self,
        input: &InputParameter,
        output: &mut OutputParameter,
    ) -> Result<UpdateStatus, OtgError> {
        let dt = self.cycle_time.ok_or_else(|| {
            OtgError::InvalidInput("online update requires a control cycle length".into())
        })?;
        self.update_with_dt(input, output, dt)
    }

    /// Per-cycle update with an explicit time step (non-fixed-cycle use).
    pub fn update_with_dt(
        &mut self,
        input: &InputParameter,
        output: &mut OutputParameter,
        dt: f64,
    ) -> Result<UpdateStatus, OtgError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(OtgError::InvalidInput(
                "control cycle length must be finite and positive".into(),
            ));
        }
        self.validate_geometry()?;
        input.validate(self.dof, self.waypoint_capacity)?;
        if output.degrees_of_freedom != self.dof || output.new_position.len() != self.dof {
            return Err(OtgError::InvalidInput(format!(
                "output has {} degrees of freedom, generator expects {}",
                output.degrees_of_freedom, self.dof
            )));
        }

        let flags = self.recompute_flags(input);
        if !flags.is_empty() {
            let budget = CalcBudget::new(input.interrupt_calculation_duration);
            match self.calculate_with_budget(input, &budget) {
                Ok(trajectory) => {
                    debug!(
                        duration = trajectory.duration(),
                        ?flags,
                        "new trajectory calculated"
                    );
                    self.trajectory = Some(trajectory);
                    self.elapsed = 0.0;
                    self.last_section = 0;
                    self.cached = Some(input.clone());
                    output.new_calculation = true;
                    output.recompute_flags = flags;
                    output.calculation_duration = budget.elapsed_us() as f64;
                    output.trajectory = self.trajectory.clone();
                }
                Err(err @ OtgError::CalculationTimeout { .. }) if self.trajectory.is_some() => {
                    // Keep the previous trajectory installed and sample it,
                    // so the caller still commands a valid (stale)
                    // setpoint; the error tells it to retry.
                    output.new_calculation = false;
                    output.recompute_flags = flags;
                    output.calculation_duration = budget.elapsed_us() as f64;
                    self.advance_and_sample(output, dt);
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        } else {
            output.new_calculation = false;
            output.recompute_flags = RecomputeFlags::empty();
        }

        Ok(self.advance_and_sample(output, dt))
    }

    /// One-shot offline solve: no cycle stepping, full trajectory out.
    pub fn calculate(&self, input: &InputParameter) -> Result<Trajectory, OtgError> {
        self.validate_geometry()?;
        input.validate(self.dof, self.waypoint_capacity)?;
        let budget = CalcBudget::new(input.interrupt_calculation_duration);
        self.calculate_with_budget(input, &budget)
    }

    fn validate_geometry(&self) -> Result<(), OtgError> {
        if self.dof == 0 {
            return Err(OtgError::InvalidInput(
                "degrees_of_freedom must be positive".into(),
            ));
        }
        Ok(())
    }

    fn calculate_with_budget(
        &self,
        input: &InputParameter,
        budget: &CalcBudget,
    ) -> Result<Trajectory, OtgError> {
        let limits: Vec<Limits> = (0..self.dof).map(|i| input.limits_for_axis(i)).collect();

        let sections = if input.intermediate_positions.is_empty() {
            let current: Vec<KinematicState> =
                (0..self.dof).map(|i| input.current_state(i)).collect();
            let target: Vec<KinematicState> =
                (0..self.dof).map(|i| input.target_state(i)).collect();
            let req = SectionRequest {
                current: &current,
                target: &target,
                limits: &limits,
                interface: input.control_interface,
                mode: input.synchronization,
                minimum_duration: input.minimum_duration,
                active_axes: input.active_axes(),
            };
            vec![synchronize_section(&req, budget)?]
        } else {
            waypoints::chain(input, budget)?
        };

        Trajectory::assemble(sections, &limits)
    }

    /// Advance the trajectory clock and fill the output sample.
    fn advance_and_sample(&mut self, output: &mut OutputParameter, dt: f64) -> UpdateStatus {
        let trajectory = self
            .trajectory
            .as_ref()
            .expect("advance_and_sample requires a trajectory");

        self.elapsed += dt;
        trajectory.state_at_into(self.elapsed, &mut self.sample_buf);

        for (i, s) in self.sample_buf.iter().enumerate() {
            output.new_position[i] = s.position;
            output.new_velocity[i] = s.velocity;
            output.new_acceleration[i] = s.acceleration;
        }
        output.time = self.elapsed;

        let section = trajectory.section_index_at(self.elapsed);
        output.did_section_change = section != self.last_section;
        output.current_section = section;
        self.last_section = section;

        self.expected.copy_from_slice(&self.sample_buf);
        self.have_expected = true;

        if self.elapsed >= trajectory.duration() - T_EPS {
            UpdateStatus::Finished
        } else {
            UpdateStatus::Working
        }
    }

    /// Decide whether this cycle needs a fresh calculation, and why.
    fn recompute_flags(&self, input: &InputParameter) -> RecomputeFlags {
        let mut flags = RecomputeFlags::empty();
        let cached = match (&self.cached, &self.trajectory) {
            (Some(c), Some(_)) => c,
            _ => return RecomputeFlags::FIRST_CYCLE,
        };

        if cached.target_position != input.target_position
            || cached.target_velocity != input.target_velocity
            || cached.target_acceleration != input.target_acceleration
        {
            flags |= RecomputeFlags::TARGET_CHANGED;
        }
        if cached.max_velocity != input.max_velocity
            || cached.max_acceleration != input.max_acceleration
            || cached.max_jerk != input.max_jerk
            || cached.min_velocity != input.min_velocity
            || cached.min_acceleration != input.min_acceleration
            || cached.min_position != input.min_position
            || cached.max_position != input.max_position
        {
            flags |= RecomputeFlags::LIMITS_CHANGED;
        }
        if cached.intermediate_positions != input.intermediate_positions {
            flags |= RecomputeFlags::WAYPOINTS_CHANGED;
        }
        if cached.control_interface != input.control_interface
            || cached.synchronization != input.synchronization
        {
            flags |= RecomputeFlags::MODE_CHANGED;
        }
        if cached.minimum_duration != input.minimum_duration
            || cached.per_section_minimum_duration != input.per_section_minimum_duration
        {
            flags |= RecomputeFlags::DURATION_CHANGED;
        }

        if self.have_expected {
            for i in 0..self.dof {
                let e = &self.expected[i];
                let scale = input.max_velocity[i].max(1.0);
                let t = FEEDBACK_TOLERANCE * scale;
                if (input.current_position[i] - e.position).abs() > t
                    || (input.current_velocity[i] - e.velocity).abs() > t
                    || (input.current_acceleration[i] - e.acceleration).abs() > t
                {
                    flags |= RecomputeFlags::CURRENT_DEVIATED;
                    break;
                }
            }
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_input() -> InputParameter {
        let mut inp = InputParameter::new(1);
        inp.target_position = vec![1.0];
        inp.max_velocity = vec![1.0];
        inp.max_acceleration = vec![2.0];
        inp.max_jerk = vec![8.0];
        inp
    }

    #[test]
    fn offline_calculate_reaches_target() {
        let otg = TrajectoryGenerator::new_offline(1);
        let traj = otg.calculate(&simple_input()).unwrap();
        assert!(traj.duration() > 0.0);
        let end = traj.state_at(traj.duration());
        assert!((end[0].position - 1.0).abs() < 1e-9);
    }

    #[test]
    fn online_loop_runs_to_finished() {
        let mut otg = TrajectoryGenerator::new(1, 0.01);
        let mut inp = simple_input();
        let mut out = OutputParameter::new(1);

        let mut cycles = 0;
        loop {
            let status = otg.update(&inp, &mut out).unwrap();
            if cycles == 0 {
                assert!(out.new_calculation);
                assert!(out.recompute_flags.contains(RecomputeFlags::FIRST_CYCLE));
            } else {
                assert!(!out.new_calculation, "unexpected recalculation at cycle {cycles}");
            }
            out.pass_to_input(&mut inp);
            cycles += 1;
            if status == UpdateStatus::Finished {
                break;
            }
            assert!(cycles < 10_000, "did not finish");
        }
        assert!((out.new_position[0] - 1.0).abs() < 1e-6);
        assert!(out.new_velocity[0].abs() < 1e-6);
    }

    #[test]
    fn finished_is_idempotent() {
        let mut otg = TrajectoryGenerator::new(1, 0.01);
        let mut inp = simple_input();
        let mut out = OutputParameter::new(1);
        while otg.update(&inp, &mut out).unwrap() == UpdateStatus::Working {
            out.pass_to_input(&mut inp);
        }
        out.pass_to_input(&mut inp);
        for _ in 0..5 {
            let status = otg.update(&inp, &mut out).unwrap();
            assert_eq!(status, UpdateStatus::Finished);
            assert!(!out.new_calculation);
            assert!((out.new_position[0] - 1.0).abs() < 1e-9);
            out.pass_to_input(&mut inp);
        }
    }

    #[test]
    fn target_change_triggers_recalculation() {
        let mut otg = TrajectoryGenerator::new(1, 0.01);
        let mut inp = simple_input();
        let mut out = OutputParameter::new(1);

        otg.update(&inp, &mut out).unwrap();
        out.pass_to_input(&mut inp);
        otg.update(&inp, &mut out).unwrap();
        assert!(!out.new_calculation);
        out.pass_to_input(&mut inp);

        inp.target_position = vec![-1.0];
        otg.update(&inp, &mut out).unwrap();
        assert!(out.new_calculation);
        assert!(out.recompute_flags.contains(RecomputeFlags::TARGET_CHANGED));
    }

    #[test]
    fn sensor_deviation_triggers_recalculation() {
        let mut otg = TrajectoryGenerator::new(1, 0.01);
        let mut inp = simple_input();
        let mut out = OutputParameter::new(1);

        otg.update(&inp, &mut out).unwrap();
        out.pass_to_input(&mut inp);
        // Simulated sensor feedback differing from the expected sample.
        inp.current_position[0] += 0.05;
        otg.update(&inp, &mut out).unwrap();
        assert!(out.new_calculation);
        assert!(out.recompute_flags.contains(RecomputeFlags::CURRENT_DEVIATED));
    }

    #[test]
    fn update_without_cycle_time_fails() {
        let mut otg = TrajectoryGenerator::new_offline(1);
        let mut out = OutputParameter::new(1);
        let err = otg.update(&simple_input(), &mut out).unwrap_err();
        assert!(matches!(err, OtgError::InvalidInput(_)));
    }

    #[test]
    fn calculation_duration_is_reported() {
        let mut otg = TrajectoryGenerator::new(1, 0.01);
        let inp = simple_input();
        let mut out = OutputParameter::new(1);
        otg.update(&inp, &mut out).unwrap();
        assert!(out.new_calculation);
        // Microsecond clock; zero is possible on a fast machine but the
        // field must be finite and non-negative.
        assert!(out.calculation_duration >= 0.0);
        assert!(out.calculation_duration.is_finite());
    }

    #[test]
    fn zero_dof_is_invalid() {
        let otg = TrajectoryGenerator::new_offline(0);
        let err = otg.calculate(&InputParameter::new(0)).unwrap_err();
        assert!(matches!(err, OtgError::InvalidInput(_)));
    }
}
