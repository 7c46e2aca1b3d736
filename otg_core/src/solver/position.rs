//! Position-interface profile synthesis.
//!
//! The minimum-time profile is parametrized by its cruise velocity: an
//! acceleration transfer from the (braked) current state to `(v_c, 0)`, an
//! optional cruise at `v_c`, and a transfer to the target state. The signed
//! distance realized by the two transfers is continuous and non-decreasing
//! in `v_c`, so the profile is resolved with three cases:
//!
//! - the distance at `v_c = max_velocity` fits under the demand → cruise at
//!   the velocity cap (the classic seven-phase profile),
//! - the distance at `v_c = min_velocity` exceeds the demand → cruise at
//!   the negative cap,
//! - otherwise a bracketed bisection over `v_c` pins the unique no-cruise
//!   profile (this branch also covers overshoot-and-return motion, where
//!   the cruise velocity has opposite sign to the net displacement).
//!
//! Fixed-duration solves re-use the same parametrization: shrinking the
//! cruise velocity magnitude lengthens the profile continuously up to the
//! standstill profile, which absorbs any remaining duration as a hold at
//! zero velocity — the position interface therefore has no blocked
//! duration intervals.

use tracing::trace;

use crate::block::Block;
use crate::error::OtgError;
use crate::kinematics::{ControlInterface, KinematicState};
use crate::limits::Limits;
use crate::profile::{Profile, ProfileBuilder, T_EPS};
use crate::solver::transfer::{self, AccelTransfer};
use crate::solver::{MinSolve, SolveOutcome, brake, roots};

/// Cruise velocities below this fraction of the cap are treated as
/// standstill when deciding between the cruise and hold families.
const HOLD_VELOCITY_FRACTION: f64 = 1e-8;

struct Segments {
    accel: AccelTransfer,
    decel: AccelTransfer,
}

impl Segments {
    fn distance(&self) -> f64 {
        self.accel.distance() + self.decel.distance()
    }

    fn duration(&self) -> f64 {
        self.accel.duration() + self.decel.duration()
    }
}

/// One axis's solve context after the brake prelude.
struct Context<'a> {
    lim: &'a Limits,
    target: KinematicState,
    /// Builder holding the brake prelude (possibly empty).
    prelude: ProfileBuilder,
    /// State the main solve starts from.
    start: KinematicState,
    /// Net displacement demanded from the main solve.
    dp: f64,
}

impl<'a> Context<'a> {
    fn new(current: KinematicState, target: KinematicState, lim: &'a Limits) -> Self {
        let mut prelude = ProfileBuilder::new(current);
        brake::apply(&mut prelude, lim, ControlInterface::Position);
        let start = prelude.state();
        let dp = target.position - start.position;
        Self {
            lim,
            target,
            prelude,
            start,
            dp,
        }
    }

    fn segments(&self, vc: f64) -> Segments {
        Segments {
            accel: transfer::time_optimal(
                self.start.velocity,
                self.start.acceleration,
                vc,
                0.0,
                self.lim,
            ),
            decel: transfer::time_optimal(
                vc,
                0.0,
                self.target.velocity,
                self.target.acceleration,
                self.lim,
            ),
        }
    }

    /// Assemble the complete profile: brake prelude, acceleration transfer,
    /// cruise, deceleration transfer.
    fn build(&self, segments: &Segments, vc: f64, t_cruise: f64) -> Profile {
        let mut b = self.prelude.clone();
        segments.accel.push_phases(&mut b, 0.0);
        if t_cruise > T_EPS {
            debug_assert!(b.state().acceleration.abs() < 1e-6 || !self.lim.has_finite_jerk());
            b.push(t_cruise, 0.0);
        }
        segments.decel.push_phases(&mut b, self.target.acceleration);
        trace!(
            vc,
            t_cruise,
            duration = b.elapsed(),
            "position profile assembled"
        );
        b.finish(Some(self.target))
    }

    fn pos_tol(&self) -> f64 {
        roots::tol(
            self.dp
                .abs()
                .max(self.start.position.abs())
                .max(self.target.position.abs()),
        )
    }
}

/// Minimum-time position solve for one axis.
pub fn solve_min_time(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
) -> Result<MinSolve, OtgError> {
    let ctx = Context::new(current, target, lim);
    let (profile, _vc) = min_time_profile(&ctx)?;
    let t_min = profile.duration();
    Ok(MinSolve {
        profile,
        block: Block::unblocked(t_min),
    })
}

fn min_time_profile(ctx: &Context<'_>) -> Result<(Profile, f64), OtgError> {
    let lim = ctx.lim;
    let ptol = ctx.pos_tol();

    // Zero-length motion: the brake prelude (if any) already is the profile.
    let vtol = roots::tol(lim.max_velocity);
    if ctx.dp.abs() <= ptol
        && (ctx.start.velocity - ctx.target.velocity).abs() <= vtol
        && (ctx.start.acceleration - ctx.target.acceleration).abs() <= roots::tol(lim.max_acceleration)
    {
        let profile = ctx.prelude.clone().finish(Some(ctx.target));
        return Ok((profile, 0.0));
    }

    let hi = ctx.segments(lim.max_velocity);
    let d_hi = hi.distance();
    if ctx.dp >= d_hi - ptol {
        let t_cruise = ((ctx.dp - d_hi) / lim.max_velocity).max(0.0);
        return Ok((ctx.build(&hi, lim.max_velocity, t_cruise), lim.max_velocity));
    }

    let lo = ctx.segments(lim.min_velocity);
    let d_lo = lo.distance();
    if ctx.dp <= d_lo + ptol {
        let t_cruise = ((ctx.dp - d_lo) / lim.min_velocity).max(0.0);
        return Ok((ctx.build(&lo, lim.min_velocity, t_cruise), lim.min_velocity));
    }

    // No cruise plateau: bisect the cruise velocity over the full range.
    let vc = roots::bisect_increasing(lim.min_velocity, lim.max_velocity, ctx.dp, |v| {
        ctx.segments(v).distance()
    })
    .ok_or_else(|| OtgError::Infeasible("cruise velocity search failed to bracket".into()))?;

    let segments = ctx.segments(vc);
    let residual = ctx.dp - segments.distance();
    // Absorb the bisection residual in a micro-cruise when signs allow.
    let t_cruise = if vc.abs() > T_EPS && residual / vc > 0.0 {
        residual / vc
    } else {
        0.0
    };
    Ok((ctx.build(&segments, vc, t_cruise), vc))
}

/// Solve one axis to take exactly `t_total` seconds.
pub fn solve_with_duration(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
    t_total: f64,
) -> Result<SolveOutcome, OtgError> {
    let ctx = Context::new(current, target, lim);
    let (min_profile, vc_star) = min_time_profile(&ctx)?;
    let t_min = min_profile.duration();
    let ttol = roots::tol(t_total.max(t_min));
    if t_total <= t_min + ttol {
        return Ok(SolveOutcome::Solved(min_profile));
    }

    // The prelude length is fixed; the main solve absorbs the rest.
    let t_main = t_total - ctx.prelude.elapsed();

    // Standstill family: when the no-cruise profile through v = 0 already
    // meets the position demand, any extra duration is a hold at rest.
    let zero = ctx.segments(0.0);
    let d_zero = zero.distance();
    if (ctx.dp - d_zero).abs() <= 100.0 * ctx.pos_tol() {
        let t_hold = t_main - zero.duration();
        if t_hold >= -T_EPS {
            let profile = ctx.build(&zero, 0.0, t_hold.max(0.0));
            return Ok(SolveOutcome::Solved(exact_duration(profile, &ctx, t_total)));
        }
    }

    if vc_star.abs() <= HOLD_VELOCITY_FRACTION * lim.max_velocity {
        // Degenerate cruise with a real position residual cannot be
        // stretched; this is unreachable for validated inputs.
        return Err(OtgError::Infeasible(
            "cannot stretch a standstill profile with a position residual".into(),
        ));
    }

    // Shrink the cruise velocity magnitude until the profile takes t_main.
    // Total time decreases monotonically in the scale u, from +inf toward
    // the minimum at u = 1.
    let total_time = |u: f64| -> f64 {
        let vc = vc_star * u;
        let segments = ctx.segments(vc);
        let residual = ctx.dp - segments.distance();
        let t_cruise = (residual / vc).max(0.0);
        segments.duration() + t_cruise
    };

    let mut lo = 1e-12;
    let mut hi = 1.0;
    if total_time(lo) < t_main {
        // The slow end cannot reach the requested duration; covered by the
        // standstill family above for all validated inputs.
        return Err(OtgError::Infeasible(
            "duration stretch failed to bracket".into(),
        ));
    }
    for _ in 0..roots::MAX_BISECT_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if total_time(mid) > t_main {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-16 {
            break;
        }
    }
    let vc = vc_star * 0.5 * (lo + hi);
    let segments = ctx.segments(vc);
    let residual = ctx.dp - segments.distance();
    let t_cruise = (residual / vc).max(0.0);
    let profile = ctx.build(&segments, vc, t_cruise);
    Ok(SolveOutcome::Solved(exact_duration(profile, &ctx, t_total)))
}

/// Force the profile duration to exactly `t_total` by padding the cruise.
///
/// The sub-tolerance position shift this introduces is hidden by the final
/// state snap.
fn exact_duration(profile: Profile, ctx: &Context<'_>, t_total: f64) -> Profile {
    let delta = t_total - profile.duration();
    if delta.abs() <= T_EPS {
        return profile;
    }
    if delta < 0.0 {
        // Never shorten below the solved phases; the mismatch is within
        // bisection tolerance and acceptable.
        return profile;
    }
    // Rebuild with the hold/cruise phase widened. Locate the widest
    // zero-jerk, near-zero-acceleration phase and extend it.
    let mut b = ProfileBuilder::new(profile.initial_state());
    let mut padded = false;
    let mut widest = -1.0;
    let mut widest_idx = usize::MAX;
    for (i, ph) in profile.phases().iter().enumerate() {
        if ph.jerk == 0.0 && ph.a0.abs() < 1e-9 && ph.duration > widest {
            widest = ph.duration;
            widest_idx = i;
        }
    }
    for (i, ph) in profile.phases().iter().enumerate() {
        if i == widest_idx {
            b.push(ph.duration + delta, ph.jerk);
            padded = true;
        } else {
            b.push(ph.duration, ph.jerk);
        }
        if ph.jerk == 0.0 {
            // Preserve intentional acceleration jumps of trapezoidal
            // profiles.
            b.jump_acceleration(profile.phases().get(i + 1).map_or(ph.a0, |n| n.a0));
        }
    }
    if !padded {
        // No cruise phase to widen: append a terminal hold (target
        // velocity is zero in every path that reaches here).
        b.push(delta, 0.0);
    }
    b.finish(Some(ctx.target))
}
