//! Closed-form time-optimal acceleration transfer.
//!
//! The primitive of every profile in this crate: move one axis from
//! `(v0, a0)` to `(vf, af)` in minimum time under a jerk magnitude cap and
//! asymmetric acceleration bounds. The solution is a three-piece
//! acceleration trapezoid — jerk toward a peak acceleration, an optional
//! hold at that peak, jerk toward the exit acceleration — with the peak
//! either solved in closed form or clamped at the relevant bound.
//!
//! With an infinite jerk limit the trapezoid degenerates to a single
//! constant-acceleration hold with discontinuous entry/exit acceleration.

use crate::limits::Limits;
use crate::profile::ProfileBuilder;
use crate::solver::roots;

/// A resolved acceleration transfer: phase durations plus the peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelTransfer {
    /// First jerk phase [s].
    pub t_rise: f64,
    /// Constant-acceleration hold [s].
    pub t_hold: f64,
    /// Second jerk phase [s].
    pub t_fall: f64,
    /// Acceleration held between the jerk phases.
    pub a_peak: f64,
    /// Signed jerk of the first phase (0 when jerk limiting is disabled).
    pub rise_jerk: f64,
    /// Entry velocity the transfer was solved for.
    pub v0: f64,
    /// Entry acceleration the transfer was solved for.
    pub a0: f64,
}

impl AccelTransfer {
    /// Total transfer time [s].
    #[inline]
    pub fn duration(&self) -> f64 {
        self.t_rise + self.t_hold + self.t_fall
    }

    /// Signed distance covered by the transfer, given its entry velocity.
    pub fn distance(&self) -> f64 {
        if self.rise_jerk == 0.0 {
            // Trapezoidal hold only; acceleration jumps to the peak.
            let (p, _, _) = crate::profile::integrate(0.0, self.v0, self.a_peak, 0.0, self.t_hold);
            return p;
        }
        let (p, v, a) = crate::profile::integrate(0.0, self.v0, self.a0, self.rise_jerk, self.t_rise);
        let (p, v, _a) = crate::profile::integrate(p, v, a, 0.0, self.t_hold);
        let (p, _, _) = crate::profile::integrate(p, v, self.a_peak, -self.rise_jerk, self.t_fall);
        p
    }

    /// Append the transfer's phases to a profile under construction.
    ///
    /// The builder's current state must match `(v0, a0)`; with infinite
    /// jerk the acceleration is jumped to the peak for the hold and to
    /// `exit_acceleration` afterwards.
    pub fn push_phases(&self, builder: &mut ProfileBuilder, exit_acceleration: f64) {
        if self.rise_jerk == 0.0 {
            builder.jump_acceleration(self.a_peak);
            builder.push(self.t_hold, 0.0);
            builder.jump_acceleration(exit_acceleration);
            return;
        }
        builder.push(self.t_rise, self.rise_jerk);
        builder.push(self.t_hold, 0.0);
        builder.push(self.t_fall, -self.rise_jerk);
    }
}

/// Solve the minimum-time transfer `(v0, a0) → (vf, af)`.
///
/// Both boundary accelerations must lie inside
/// `[min_acceleration, max_acceleration]` (the brake prelude guarantees
/// this for solver-internal calls).
pub fn time_optimal(v0: f64, a0: f64, vf: f64, af: f64, lim: &Limits) -> AccelTransfer {
    let dv = vf - v0;

    if !lim.has_finite_jerk() {
        // Trapezoidal: acceleration jumps, a single hold covers Δv.
        let t = roots::tol(v0.abs().max(vf.abs()));
        let (a_peak, t_hold) = if dv > t {
            (lim.max_acceleration, dv / lim.max_acceleration)
        } else if dv < -t {
            (lim.min_acceleration, dv / lim.min_acceleration)
        } else {
            (af, 0.0)
        };
        return AccelTransfer {
            t_rise: 0.0,
            t_hold,
            t_fall: 0.0,
            a_peak,
            rise_jerk: 0.0,
            v0,
            a0,
        };
    }

    let j = lim.max_jerk;
    let a_top = a0.max(af);
    // Smallest Δv an "up" trapezoid (peak above both boundary
    // accelerations) can realize: the direct ramp through a_top.
    let up_min_dv = (2.0 * a_top * a_top - a0 * a0 - af * af) / (2.0 * j);

    if dv >= up_min_dv {
        // Peak above: jerk +j, hold, jerk −j.
        let mut a_peak = (j * dv + 0.5 * (a0 * a0 + af * af)).max(0.0).sqrt();
        a_peak = a_peak.max(a_top);
        let t_hold = if a_peak > lim.max_acceleration {
            a_peak = lim.max_acceleration;
            (dv - (2.0 * a_peak * a_peak - a0 * a0 - af * af) / (2.0 * j)) / a_peak
        } else {
            0.0
        };
        AccelTransfer {
            t_rise: (a_peak - a0) / j,
            t_hold: t_hold.max(0.0),
            t_fall: (a_peak - af) / j,
            a_peak,
            rise_jerk: j,
            v0,
            a0,
        }
    } else {
        // Peak below: jerk −j, hold, jerk +j.
        let a_bot = a0.min(af);
        let mut a_peak = -(0.5 * (a0 * a0 + af * af) - j * dv).max(0.0).sqrt();
        a_peak = a_peak.min(a_bot);
        let t_hold = if a_peak < lim.min_acceleration {
            a_peak = lim.min_acceleration;
            (dv - (a0 * a0 + af * af - 2.0 * a_peak * a_peak) / (2.0 * j)) / a_peak
        } else {
            0.0
        };
        AccelTransfer {
            t_rise: (a0 - a_peak) / j,
            t_hold: t_hold.max(0.0),
            t_fall: (af - a_peak) / j,
            a_peak,
            rise_jerk: -j,
            v0,
            a0,
        }
    }
}
