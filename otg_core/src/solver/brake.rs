//! Brake prelude: steer an out-of-limit entry state back inside bounds.
//!
//! Online replanning regularly starts from states the limits do not
//! contain — sensor feedback, a mid-flight limit reduction, or an
//! interrupted motion. Before the main solve, a short prelude of at most
//! three constant-jerk phases brings acceleration inside
//! `[min_acceleration, max_acceleration]` and velocity inside
//! `[min_velocity, max_velocity]`. The prelude is part of the emitted
//! profile and counts toward the axis minimum duration.

use crate::kinematics::{ControlInterface, KinematicState};
use crate::limits::Limits;
use crate::profile::{ProfileBuilder, T_EPS};
use crate::solver::roots;

/// Append brake phases to `builder` until its state is inside the limits.
///
/// Velocity braking applies to the position interface only; the velocity
/// interface clamps acceleration and lets the main transfer handle the
/// rest (its target velocity is reachable from any finite velocity).
pub fn apply(builder: &mut ProfileBuilder, lim: &Limits, interface: ControlInterface) {
    clamp_acceleration(builder, lim);
    if interface == ControlInterface::Position {
        brake_velocity(builder, lim);
    }
}

/// Whether `state` needs a brake prelude under `lim`.
pub fn is_needed(state: &KinematicState, lim: &Limits, interface: ControlInterface) -> bool {
    let a_tol = roots::tol(lim.max_acceleration);
    if state.acceleration > lim.max_acceleration + a_tol
        || state.acceleration < lim.min_acceleration - a_tol
    {
        return true;
    }
    if interface == ControlInterface::Position {
        let v_tol = roots::tol(lim.max_velocity);
        if state.velocity > lim.max_velocity + v_tol || state.velocity < lim.min_velocity - v_tol {
            return true;
        }
    }
    false
}

fn clamp_acceleration(builder: &mut ProfileBuilder, lim: &Limits) {
    let a = builder.state().acceleration;
    let a_tol = roots::tol(lim.max_acceleration);

    if !lim.has_finite_jerk() {
        if a > lim.max_acceleration + a_tol {
            builder.jump_acceleration(lim.max_acceleration);
        } else if a < lim.min_acceleration - a_tol {
            builder.jump_acceleration(lim.min_acceleration);
        }
        return;
    }

    let j = lim.max_jerk;
    if a > lim.max_acceleration + a_tol {
        builder.push((a - lim.max_acceleration) / j, -j);
    } else if a < lim.min_acceleration - a_tol {
        builder.push((lim.min_acceleration - a) / j, j);
    }
}

fn brake_velocity(builder: &mut ProfileBuilder, lim: &Limits) {
    let state = builder.state();
    let v_tol = roots::tol(lim.max_velocity);

    if state.velocity > lim.max_velocity + v_tol {
        brake_down(builder, lim, lim.max_velocity);
    } else if state.velocity < lim.min_velocity - v_tol {
        brake_up(builder, lim, lim.min_velocity);
    }
}

/// Reduce velocity to `v_edge` (above the current bound) by jerking the
/// acceleration toward `min_acceleration`, holding it there if the ramp
/// alone is not enough.
fn brake_down(builder: &mut ProfileBuilder, lim: &Limits, v_edge: f64) {
    let s = builder.state();
    if !lim.has_finite_jerk() {
        builder.jump_acceleration(lim.min_acceleration);
        builder.push((v_edge - s.velocity) / lim.min_acceleration, 0.0);
        builder.jump_acceleration(0.0);
        return;
    }

    let j = lim.max_jerk;
    // v(t) = v + a·t − j·t²/2 crosses v_edge at the unique positive root.
    let c = s.velocity - v_edge;
    let disc = s.acceleration * s.acceleration + 2.0 * j * c;
    let t_cross = (s.acceleration + disc.max(0.0).sqrt()) / j;
    let t_to_floor = (s.acceleration - lim.min_acceleration) / j;

    if t_cross <= t_to_floor {
        builder.push(t_cross, -j);
        return;
    }
    builder.push(t_to_floor, -j);
    let v1 = builder.state().velocity;
    if v1 > v_edge + T_EPS {
        builder.push((v_edge - v1) / lim.min_acceleration, 0.0);
    }
}

/// Mirror of [`brake_down`] for velocities below the lower bound.
fn brake_up(builder: &mut ProfileBuilder, lim: &Limits, v_edge: f64) {
    let s = builder.state();
    if !lim.has_finite_jerk() {
        builder.jump_acceleration(lim.max_acceleration);
        builder.push((v_edge - s.velocity) / lim.max_acceleration, 0.0);
        builder.jump_acceleration(0.0);
        return;
    }

    let j = lim.max_jerk;
    let c = v_edge - s.velocity;
    let disc = s.acceleration * s.acceleration + 2.0 * j * c;
    let t_cross = (-s.acceleration + disc.max(0.0).sqrt()) / j;
    let t_to_ceil = (lim.max_acceleration - s.acceleration) / j;

    if t_cross <= t_to_ceil {
        builder.push(t_cross, j);
        return;
    }
    builder.push(t_to_ceil, j);
    let v1 = builder.state().velocity;
    if v1 < v_edge - T_EPS {
        builder.push((v_edge - v1) / lim.max_acceleration, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_from(p: f64, v: f64, a: f64) -> ProfileBuilder {
        ProfileBuilder::new(KinematicState::new(p, v, a))
    }

    #[test]
    fn in_limit_state_needs_no_brake() {
        let lim = Limits::symmetric(1.0, 1.0, 1.0);
        let s = KinematicState::new(0.0, 0.5, -0.5);
        assert!(!is_needed(&s, &lim, ControlInterface::Position));
    }

    #[test]
    fn acceleration_above_cap_is_ramped_down() {
        let lim = Limits::symmetric(10.0, 2.0, 4.0);
        let mut b = build_from(0.0, 0.0, 3.0);
        apply(&mut b, &lim, ControlInterface::Position);
        assert!((b.state().acceleration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_above_cap_ends_at_cap() {
        let lim = Limits::symmetric(1.0, 2.0, 3.0);
        let mut b = build_from(0.0, 2.2, 0.0);
        apply(&mut b, &lim, ControlInterface::Position);
        let s = b.state();
        assert!((s.velocity - 1.0).abs() < 1e-9);
        assert!(s.acceleration >= lim.min_acceleration - 1e-9);
        assert!(s.acceleration <= 0.0 + 1e-9);
    }

    #[test]
    fn velocity_below_floor_with_hot_acceleration() {
        // The scenario from a mid-flight replan: velocity far below the
        // floor while acceleration sits above its cap.
        let lim = Limits::symmetric(1.0, 2.0, 3.0);
        let mut b = build_from(0.0, -2.2, 2.5);
        apply(&mut b, &lim, ControlInterface::Position);
        let s = b.state();
        assert!(s.acceleration <= lim.max_acceleration + 1e-9);
        assert!(s.velocity >= lim.min_velocity - 1e-6);
        assert!(b.elapsed() > 0.0);
    }

    #[test]
    fn velocity_interface_only_clamps_acceleration() {
        let lim = Limits::symmetric(1.0, 2.0, 3.0);
        let s = KinematicState::new(0.0, 5.0, 0.0);
        // Velocity out of range alone does not require braking here.
        assert!(!is_needed(&s, &lim, ControlInterface::Velocity));

        let mut b = build_from(0.0, 5.0, 4.0);
        apply(&mut b, &lim, ControlInterface::Velocity);
        assert!((b.state().acceleration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn infinite_jerk_brakes_with_hold_only() {
        let lim = Limits::symmetric(1.0, 2.0, f64::INFINITY);
        let mut b = build_from(0.0, 3.0, 0.0);
        apply(&mut b, &lim, ControlInterface::Position);
        let s = b.state();
        assert!((s.velocity - 1.0).abs() < 1e-9);
        assert_eq!(s.acceleration, 0.0);
    }
}
