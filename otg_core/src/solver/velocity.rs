//! Velocity-interface profile synthesis.
//!
//! The target binds velocity and acceleration only; position runs free, so
//! a profile is exactly one acceleration transfer (plus the brake prelude
//! when the entry acceleration is out of bounds).
//!
//! Fixed-duration solves pick the held acceleration from one of three
//! closed-form families — peak trapezoid above both boundary
//! accelerations, dip trapezoid below both, monotone staircase between
//! them — and fall back to a ramp-to-rest plus hold insertion. Together
//! the families cover every duration above the minimum for in-bounds
//! boundary accelerations; a `BlockedUntil` answer remains as the numeric
//! backstop and feeds the synchronizer's bump-and-retry loop.

use tracing::trace;

use crate::block::Block;
use crate::error::OtgError;
use crate::kinematics::{ControlInterface, KinematicState};
use crate::limits::Limits;
use crate::profile::{Profile, ProfileBuilder, T_EPS};
use crate::solver::transfer::{self, AccelTransfer};
use crate::solver::{MinSolve, SolveOutcome, brake, roots};

struct Context<'a> {
    lim: &'a Limits,
    target: KinematicState,
    prelude: ProfileBuilder,
    start: KinematicState,
}

impl<'a> Context<'a> {
    fn new(current: KinematicState, target: KinematicState, lim: &'a Limits) -> Self {
        let mut prelude = ProfileBuilder::new(current);
        brake::apply(&mut prelude, lim, ControlInterface::Velocity);
        let start = prelude.state();
        Self {
            lim,
            target,
            prelude,
            start,
        }
    }

    /// Final-state snap: position comes from the integration, velocity and
    /// acceleration from the target.
    fn finish(&self, builder: ProfileBuilder) -> Profile {
        let end = builder.state();
        builder.finish(Some(KinematicState::new(
            end.position,
            self.target.velocity,
            self.target.acceleration,
        )))
    }

    fn min_transfer(&self) -> AccelTransfer {
        transfer::time_optimal(
            self.start.velocity,
            self.start.acceleration,
            self.target.velocity,
            self.target.acceleration,
            self.lim,
        )
    }

    /// Ramp the entry acceleration to zero and solve the remaining
    /// transfer; returns the builder up to the hold slot and the family's
    /// base duration (prelude excluded).
    fn hold_family_base(&self) -> (ProfileBuilder, AccelTransfer, f64) {
        let mut b = self.prelude.clone();
        if self.lim.has_finite_jerk() {
            let a = self.start.acceleration;
            if a.abs() > 0.0 {
                b.push(a.abs() / self.lim.max_jerk, -a.signum() * self.lim.max_jerk);
            }
        } else {
            b.jump_acceleration(0.0);
        }
        let mid = b.state();
        let tail = transfer::time_optimal(
            mid.velocity,
            0.0,
            self.target.velocity,
            self.target.acceleration,
            self.lim,
        );
        let t_base = (b.elapsed() - self.prelude.elapsed()) + tail.duration();
        (b, tail, t_base)
    }
}

/// Minimum-time velocity solve for one axis.
pub fn solve_min_time(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
) -> Result<MinSolve, OtgError> {
    let ctx = Context::new(current, target, lim);
    let xfer = ctx.min_transfer();

    let mut b = ctx.prelude.clone();
    xfer.push_phases(&mut b, target.acceleration);
    let profile = ctx.finish(b);
    let t_min = profile.duration();

    Ok(MinSolve {
        profile,
        block: Block::unblocked(t_min),
    })
}

/// Solve one axis's velocity profile to take exactly `t_total` seconds.
pub fn solve_with_duration(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
    t_total: f64,
) -> Result<SolveOutcome, OtgError> {
    let ctx = Context::new(current, target, lim);
    let xfer = ctx.min_transfer();
    let t_prelude = ctx.prelude.elapsed();
    let t_min = t_prelude + xfer.duration();
    let ttol = roots::tol(t_total.max(t_min));

    if t_total <= t_min + ttol {
        let mut b = ctx.prelude.clone();
        xfer.push_phases(&mut b, target.acceleration);
        return Ok(SolveOutcome::Solved(ctx.finish(b)));
    }

    let t_main = t_total - t_prelude;
    let dv = ctx.target.velocity - ctx.start.velocity;

    if !lim.has_finite_jerk() {
        // Trapezoidal: spread Δv uniformly over the requested time.
        let mut b = ctx.prelude.clone();
        b.jump_acceleration(dv / t_main);
        b.push(t_main, 0.0);
        b.jump_acceleration(target.acceleration);
        return Ok(SolveOutcome::Solved(ctx.finish(b)));
    }

    if let Some(profile) = stretch_families(&ctx, t_main, dv) {
        return Ok(SolveOutcome::Solved(profile));
    }

    // Ramp-to-rest with an inserted hold.
    let (mut b, tail, t_base) = ctx.hold_family_base();
    let wait = t_main - t_base;
    if wait >= -T_EPS {
        b.push(wait.max(0.0), 0.0);
        tail.push_phases(&mut b, ctx.target.acceleration);
        return Ok(SolveOutcome::Solved(ctx.finish(b)));
    }

    // Numeric backstop: no family matched; let the synchronizer retry at
    // the hold-family threshold.
    let next = t_prelude + t_base;
    trace!(t_total, next, "velocity stretch blocked");
    Ok(SolveOutcome::BlockedUntil(next))
}

/// The three held-acceleration families, each closed-form.
///
/// Peak: `ap² − (a0 + af + j·T)·ap + (a0² + af²)/2 + j·Δv = 0`,
///   valid for `max(a0, af) ≤ ap ≤ max_acceleration`.
/// Dip: `ap² − (a0 + af − j·T)·ap + (a0² + af²)/2 − j·Δv = 0`,
///   valid for `min_acceleration ≤ ap ≤ min(a0, af)`.
/// Staircase (monotone, `a0 ≠ af`): ramp times are fixed, the hold
///   acceleration follows linearly from the residual Δv.
fn stretch_families(ctx: &Context<'_>, t_main: f64, dv: f64) -> Option<Profile> {
    let j = ctx.lim.max_jerk;
    let a0 = ctx.start.acceleration;
    let af = ctx.target.acceleration;
    let a_tol = roots::tol(ctx.lim.max_acceleration);

    let build = |t_rise: f64, rise_jerk: f64, t_hold: f64, t_fall: f64, fall_jerk: f64| {
        let mut b = ctx.prelude.clone();
        b.push(t_rise, rise_jerk);
        b.push(t_hold, 0.0);
        b.push(t_fall, fall_jerk);
        ctx.finish(b)
    };

    // Peak family.
    let b_coef = a0 + af + j * t_main;
    let c_coef = 0.5 * (a0 * a0 + af * af) + j * dv;
    let disc = b_coef * b_coef - 4.0 * c_coef;
    if disc >= 0.0 {
        let sq = disc.sqrt();
        for ap in [0.5 * (b_coef - sq), 0.5 * (b_coef + sq)] {
            if ap < a0.max(af) - a_tol || ap > ctx.lim.max_acceleration + a_tol || ap <= T_EPS {
                continue;
            }
            let t_rise = (ap - a0) / j;
            let t_fall = (ap - af) / j;
            let t_hold = t_main - t_rise - t_fall;
            if t_hold < -T_EPS {
                continue;
            }
            return Some(build(t_rise, j, t_hold.max(0.0), t_fall, -j));
        }
    }

    // Dip family.
    let b_coef = a0 + af - j * t_main;
    let c_coef = 0.5 * (a0 * a0 + af * af) - j * dv;
    let disc = b_coef * b_coef - 4.0 * c_coef;
    if disc >= 0.0 {
        let sq = disc.sqrt();
        for ap in [0.5 * (b_coef + sq), 0.5 * (b_coef - sq)] {
            // The dip may sit above zero: any held value below both
            // boundary accelerations works if the hold time is consistent.
            if ap.abs() <= T_EPS || ap > a0.min(af) + a_tol || ap < ctx.lim.min_acceleration - a_tol
            {
                continue;
            }
            let t_rise = (a0 - ap) / j;
            let t_fall = (af - ap) / j;
            if t_rise < -T_EPS || t_fall < -T_EPS {
                continue;
            }
            let t_hold = t_main - t_rise - t_fall;
            let dv_residual = dv - (a0 * a0 + af * af - 2.0 * ap * ap) / (2.0 * j);
            if t_hold < -T_EPS || dv_residual / ap < -1e-9 {
                continue;
            }
            return Some(build(t_rise, -j, t_hold.max(0.0), t_fall, j));
        }
    }

    // Staircase family.
    if (a0 - af).abs() > a_tol {
        let t_ramps = (a0 - af).abs() / j;
        let t_hold = t_main - t_ramps;
        if t_hold > T_EPS {
            let a_hi = a0.max(af);
            let a_lo = a0.min(af);
            let base_dv = (a_hi * a_hi - a_lo * a_lo) / (2.0 * j);
            let ap = (dv - base_dv) / t_hold;
            if ap >= a_lo - a_tol && ap <= a_hi + a_tol {
                let s = (af - a0).signum() * j;
                let t_rise = (ap - a0) / s;
                let t_fall = (af - ap) / s;
                if t_rise >= -T_EPS && t_fall >= -T_EPS {
                    return Some(build(t_rise.max(0.0), s, t_hold, t_fall.max(0.0), s));
                }
            }
        }
    }

    None
}
