//! Cross-axis duration synchronization.
//!
//! Every axis first gets its minimum-time solve; the synchronizer then
//! picks the common section duration (the maximum over the axis minima
//! and any explicit floor) and re-solves the non-critical axes to take
//! exactly that long. An axis that cannot realize the requested duration
//! answers with its next feasible boundary, which raises the common
//! duration and restarts the pass — a fixed point reached in a bounded
//! number of passes since candidates only grow and are finitely many.

use std::time::Instant;

use tracing::debug;

use crate::error::OtgError;
use crate::kinematics::{ControlInterface, KinematicState, Synchronization};
use crate::limits::Limits;
use crate::profile::{Profile, ProfileBuilder};
use crate::solver::{self, MinSolve, SolveOutcome, roots};
use crate::trajectory::Section;

/// Bound on bump-and-retry passes (in addition to one pass per axis).
pub const MAX_SYNC_PASSES: usize = 8;

/// Cooperative wall-clock budget for one calculation.
///
/// Polled between synchronization passes and per-axis solves — not a hard
/// preemption. Callers needing hard real-time bounds pair this with an
/// external watchdog.
#[derive(Debug, Clone, Copy)]
pub struct CalcBudget {
    started: Instant,
    budget_us: Option<u64>,
}

impl CalcBudget {
    /// Start the clock; `budget_us = None` disables the deadline.
    pub fn new(budget_us: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            budget_us,
        }
    }

    /// Wall-clock time since the calculation started [µs].
    #[inline]
    pub fn elapsed_us(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }

    /// Abort with `CalculationTimeout` once the budget is exhausted.
    pub fn check(&self) -> Result<(), OtgError> {
        if let Some(budget_us) = self.budget_us {
            let elapsed_us = self.elapsed_us();
            if elapsed_us > budget_us {
                return Err(OtgError::CalculationTimeout {
                    elapsed_us,
                    budget_us,
                });
            }
        }
        Ok(())
    }
}

/// Per-axis boundary states and limits for one section solve.
pub struct SectionRequest<'a> {
    /// Current state per axis.
    pub current: &'a [KinematicState],
    /// Target state per axis.
    pub target: &'a [KinematicState],
    /// Limits per axis.
    pub limits: &'a [Limits],
    /// Control interface for the whole section.
    pub interface: ControlInterface,
    /// Synchronization mode.
    pub mode: Synchronization,
    /// Explicit duration floor for this section, if any.
    pub minimum_duration: Option<f64>,
    /// Number of non-trivially moving axes (drives `TimeIfNecessary`).
    pub active_axes: usize,
}

/// Solve one synchronized section across all axes.
pub fn synchronize_section(
    req: &SectionRequest<'_>,
    budget: &CalcBudget,
) -> Result<Section, OtgError> {
    let dof = req.current.len();
    debug_assert_eq!(req.target.len(), dof);
    debug_assert_eq!(req.limits.len(), dof);

    let mode = match req.mode {
        Synchronization::TimeIfNecessary
            if req.active_axes <= 1 && req.minimum_duration.is_none() =>
        {
            Synchronization::No
        }
        Synchronization::TimeIfNecessary => Synchronization::Time,
        other => other,
    };

    if mode == Synchronization::Phase {
        if let Some(section) = try_phase_sync(req, budget)? {
            return Ok(section);
        }
        debug!("phase synchronization not applicable, falling back to time");
    }

    // Per-axis minimum-time solves.
    let mut solves: Vec<MinSolve> = Vec::with_capacity(dof);
    for axis in 0..dof {
        budget.check()?;
        let min = solver::solve_min_time(
            req.current[axis],
            req.target[axis],
            &req.limits[axis],
            req.interface,
        )?;
        solves.push(min);
    }

    if mode == Synchronization::No {
        let mut duration = solves
            .iter()
            .map(|s| s.profile.duration())
            .fold(0.0, f64::max);
        if let Some(floor) = req.minimum_duration {
            duration = duration.max(floor);
        }
        let profiles: Vec<Profile> = solves.into_iter().map(|s| s.profile).collect();
        return Ok(Section {
            duration,
            profiles,
        });
    }

    // Time synchronization: fixed point over the common duration.
    let mut t_common = solves
        .iter()
        .map(|s| s.profile.duration())
        .fold(0.0, f64::max);
    if let Some(floor) = req.minimum_duration {
        t_common = t_common.max(floor);
    }
    for s in &solves {
        t_common = t_common.max(s.block.next_feasible(t_common));
    }

    let max_passes = MAX_SYNC_PASSES.max(dof + 2);
    'passes: for pass in 0..max_passes {
        budget.check()?;
        let mut profiles: Vec<Profile> = Vec::with_capacity(dof);
        for (axis, min) in solves.iter().enumerate() {
            budget.check()?;
            let t_min = min.profile.duration();
            if (t_common - t_min).abs() <= roots::tol(t_common) {
                profiles.push(min.profile.clone());
                continue;
            }
            match solver::solve_with_duration(
                req.current[axis],
                req.target[axis],
                &req.limits[axis],
                req.interface,
                t_common,
            )? {
                SolveOutcome::Solved(p) => profiles.push(p),
                SolveOutcome::BlockedUntil(t_next) => {
                    debug!(axis, pass, t_common, t_next, "axis blocked, raising common duration");
                    t_common = t_common.max(t_next);
                    continue 'passes;
                }
            }
        }
        return Ok(Section {
            duration: t_common,
            profiles,
        });
    }

    Err(OtgError::Infeasible(format!(
        "duration synchronization did not converge within {max_passes} passes"
    )))
}

/// Phase-synchronous solve: all axes share phase boundary times by
/// scaling one normalized profile.
///
/// Applicable only for co-linear motion under the position interface:
/// every axis's boundary states must be a common multiple of the
/// reference axis's. Returns `None` when the geometry does not permit it.
fn try_phase_sync(
    req: &SectionRequest<'_>,
    budget: &CalcBudget,
) -> Result<Option<Section>, OtgError> {
    if req.interface != ControlInterface::Position {
        return Ok(None);
    }
    // Trapezoidal profiles carry acceleration jumps that do not survive
    // per-axis jerk scaling; time synchronization handles them instead.
    if req.limits.iter().any(|l| !l.has_finite_jerk()) {
        return Ok(None);
    }
    let dof = req.current.len();

    // Reference axis: largest displacement.
    let dp: Vec<f64> = (0..dof)
        .map(|i| req.target[i].position - req.current[i].position)
        .collect();
    let (ref_axis, dp_ref) = match dp
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    {
        Some((i, &d)) if d.abs() > roots::EPS_ABS => (i, d),
        _ => return Ok(None),
    };

    // Ratios and co-linearity.
    let mut ratios = vec![0.0; dof];
    for i in 0..dof {
        ratios[i] = dp[i] / dp_ref;
        let k = ratios[i];
        let scale = req.limits[i].max_velocity;
        let near = |a: f64, b: f64| (a - b).abs() <= 1e-8 * scale.max(1.0);
        let cur_ok = near(req.current[i].velocity, k * req.current[ref_axis].velocity)
            && near(req.current[i].acceleration, k * req.current[ref_axis].acceleration);
        let tgt_ok = near(req.target[i].velocity, k * req.target[ref_axis].velocity)
            && near(req.target[i].acceleration, k * req.target[ref_axis].acceleration);
        if !cur_ok || !tgt_ok {
            return Ok(None);
        }
    }

    // Normalized limits: the tightest per-axis bound scaled by its ratio.
    let mut eff = Limits::symmetric(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    for i in 0..dof {
        let k = ratios[i].abs();
        if k <= roots::EPS_ABS {
            continue;
        }
        let l = &req.limits[i];
        eff.max_velocity = eff.max_velocity.min(l.max_velocity.min(-l.min_velocity) / k);
        eff.max_acceleration = eff
            .max_acceleration
            .min(l.max_acceleration.min(-l.min_acceleration) / k);
        eff.max_jerk = eff.max_jerk.min(l.max_jerk / k);
    }
    eff.min_velocity = -eff.max_velocity;
    eff.min_acceleration = -eff.max_acceleration;
    if !eff.max_velocity.is_finite() || !eff.max_acceleration.is_finite() {
        return Ok(None);
    }

    budget.check()?;
    let reference = if let Some(floor) = req.minimum_duration {
        let min = solver::solve_min_time(
            req.current[ref_axis],
            req.target[ref_axis],
            &eff,
            ControlInterface::Position,
        )?;
        if floor > min.profile.duration() {
            match solver::solve_with_duration(
                req.current[ref_axis],
                req.target[ref_axis],
                &eff,
                ControlInterface::Position,
                floor,
            )? {
                SolveOutcome::Solved(p) => p,
                SolveOutcome::BlockedUntil(_) => return Ok(None),
            }
        } else {
            min.profile
        }
    } else {
        solver::solve_min_time(
            req.current[ref_axis],
            req.target[ref_axis],
            &eff,
            ControlInterface::Position,
        )?
        .profile
    };

    // Scale the reference phases onto every axis.
    let mut profiles = Vec::with_capacity(dof);
    for i in 0..dof {
        let k = ratios[i];
        if k.abs() <= roots::EPS_ABS {
            profiles.push(Profile::hold(req.target[i]));
            continue;
        }
        let mut b = ProfileBuilder::new(req.current[i]);
        for ph in reference.phases() {
            b.push(ph.duration, ph.jerk * k);
        }
        profiles.push(b.finish(Some(req.target[i])));
    }

    debug!(ref_axis, duration = reference.duration(), "phase-synchronized section");
    Ok(Some(Section {
        duration: reference.duration(),
        profiles,
    }))
}
