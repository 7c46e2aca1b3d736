//! Piecewise constant-jerk motion profiles for a single axis.
//!
//! A [`Profile`] is an ordered run of [`Phase`]s. Each phase carries its own
//! entry state, so sampling is a single cubic evaluation after locating the
//! phase — no prefix re-integration per query. The core synthesis produces
//! at most seven phases (jerk/hold/jerk, cruise, jerk/hold/jerk); an
//! optional brake prelude of up to three phases precedes them when the
//! entry state starts outside the configured bounds.

use heapless::Vec as InlineVec;
use static_assertions::const_assert;

use crate::kinematics::KinematicState;

/// Phase capacity of one profile: 7 core phases + ≤3 brake prelude phases,
/// with headroom for degenerate splits.
pub const MAX_PROFILE_PHASES: usize = 12;

// The seven-phase core plus the three-phase brake prelude must always fit.
const_assert!(MAX_PROFILE_PHASES >= 7 + 3);

/// Durations below this are treated as degenerate and dropped.
pub const T_EPS: f64 = 1e-12;

/// One constant-jerk piece of a profile.
///
/// Entry state is stored explicitly; with infinite-jerk (trapezoidal)
/// profiles the entry acceleration may jump relative to the previous
/// phase's exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    /// Phase length [s], ≥ 0.
    pub duration: f64,
    /// Constant jerk over the phase [user units/s³].
    pub jerk: f64,
    /// Entry position.
    pub p0: f64,
    /// Entry velocity.
    pub v0: f64,
    /// Entry acceleration.
    pub a0: f64,
}

impl Phase {
    /// State after `tau` seconds into the phase (cubic in position).
    #[inline]
    pub fn state_at(&self, tau: f64) -> KinematicState {
        let t2 = tau * tau;
        KinematicState {
            position: self.p0 + self.v0 * tau + 0.5 * self.a0 * t2 + self.jerk * t2 * tau / 6.0,
            velocity: self.v0 + self.a0 * tau + 0.5 * self.jerk * t2,
            acceleration: self.a0 + self.jerk * tau,
        }
    }

    /// Exit state of the phase.
    #[inline]
    pub fn exit_state(&self) -> KinematicState {
        self.state_at(self.duration)
    }
}

/// Propagate `(p, v, a)` through `t` seconds of constant jerk `j`.
#[inline]
pub fn integrate(p: f64, v: f64, a: f64, j: f64, t: f64) -> (f64, f64, f64) {
    let t2 = t * t;
    (
        p + v * t + 0.5 * a * t2 + j * t2 * t / 6.0,
        v + a * t + 0.5 * j * t2,
        a + j * t,
    )
}

/// Position extrema of one axis over the trajectory, with occurrence times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionExtrema {
    /// Smallest position reached.
    pub min: f64,
    /// Time of the minimum [s].
    pub t_min: f64,
    /// Largest position reached.
    pub max: f64,
    /// Time of the maximum [s].
    pub t_max: f64,
}

impl PositionExtrema {
    fn from_point(p: f64, t: f64) -> Self {
        Self {
            min: p,
            t_min: t,
            max: p,
            t_max: t,
        }
    }

    fn absorb(&mut self, p: f64, t: f64) {
        if p < self.min {
            self.min = p;
            self.t_min = t;
        }
        if p > self.max {
            self.max = p;
            self.t_max = t;
        }
    }

    /// Merge another extrema record (e.g. from a later section).
    pub fn merge(&mut self, other: &PositionExtrema) {
        self.absorb(other.min, other.t_min);
        self.absorb(other.max, other.t_max);
    }
}

/// The complete motion of one axis over one section.
///
/// Invariants: phases are contiguous in position and velocity (and in
/// acceleration when jerk is finite); the phase durations sum to
/// `duration` within [`T_EPS`].
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    phases: InlineVec<Phase, MAX_PROFILE_PHASES>,
    duration: f64,
    initial: KinematicState,
    /// Exact final state; sampling snaps to it at and beyond `duration`.
    final_state: KinematicState,
}

impl Profile {
    /// A zero-duration profile holding `state`.
    pub fn hold(state: KinematicState) -> Self {
        Self {
            phases: InlineVec::new(),
            duration: 0.0,
            initial: state,
            final_state: state,
        }
    }

    /// Total duration [s].
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Exact final state (the solve target).
    #[inline]
    pub fn final_state(&self) -> KinematicState {
        self.final_state
    }

    /// Entry state.
    #[inline]
    pub fn initial_state(&self) -> KinematicState {
        self.initial
    }

    /// The phases, for inspection and tests.
    #[inline]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Sample the profile at `t` seconds from its start.
    ///
    /// `t` is clamped: negative times return the initial state, times at or
    /// beyond the duration return the exact final state.
    pub fn state_at(&self, t: f64) -> KinematicState {
        if t <= 0.0 || self.phases.is_empty() {
            return if t >= self.duration {
                self.final_state
            } else {
                self.initial
            };
        }
        if t >= self.duration - T_EPS {
            return self.final_state;
        }
        let mut offset = 0.0;
        for phase in &self.phases {
            if t < offset + phase.duration {
                return phase.state_at(t - offset);
            }
            offset += phase.duration;
        }
        self.final_state
    }

    /// Largest absolute jerk used by any phase.
    pub fn peak_jerk(&self) -> f64 {
        self.phases
            .iter()
            .map(|ph| ph.jerk.abs())
            .fold(0.0, f64::max)
    }

    /// Position extrema over `[0, duration]`.
    ///
    /// Within one phase, position is cubic and its interior extrema lie at
    /// the roots of the (quadratic) velocity; phase boundaries and the two
    /// endpoints cover the rest.
    pub fn position_extrema(&self) -> PositionExtrema {
        let mut ext = PositionExtrema::from_point(self.initial.position, 0.0);
        ext.absorb(self.final_state.position, self.duration);

        let mut offset = 0.0;
        for phase in &self.phases {
            ext.absorb(phase.exit_state().position, offset + phase.duration);
            for tau in velocity_roots(phase) {
                if tau > 0.0 && tau < phase.duration {
                    ext.absorb(phase.state_at(tau).position, offset + tau);
                }
            }
            offset += phase.duration;
        }
        ext
    }
}

/// Roots of the phase's velocity polynomial `v0 + a0·τ + j·τ²/2`.
fn velocity_roots(phase: &Phase) -> InlineVec<f64, 2> {
    let mut roots = InlineVec::new();
    let half_j = 0.5 * phase.jerk;
    if half_j.abs() < 1e-300 {
        // Linear: v0 + a0·τ = 0.
        if phase.a0.abs() > 1e-300 {
            let _ = roots.push(-phase.v0 / phase.a0);
        }
        return roots;
    }
    let disc = phase.a0 * phase.a0 - 4.0 * half_j * phase.v0;
    if disc < 0.0 {
        return roots;
    }
    let sq = disc.sqrt();
    // Numerically stable quadratic roots.
    let q = -0.5 * (phase.a0 + if phase.a0 >= 0.0 { sq } else { -sq });
    if q.abs() > 1e-300 {
        let _ = roots.push(q / half_j);
        let _ = roots.push(phase.v0 / q);
    } else {
        // a0 ≈ 0 and v0 ≈ 0: the root is at τ = 0.
        let _ = roots.push(0.0);
    }
    roots
}

/// Incremental profile construction with exact state propagation.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    phases: InlineVec<Phase, MAX_PROFILE_PHASES>,
    p: f64,
    v: f64,
    a: f64,
    duration: f64,
    initial: KinematicState,
}

impl ProfileBuilder {
    /// Start building from `state`.
    pub fn new(state: KinematicState) -> Self {
        Self {
            phases: InlineVec::new(),
            p: state.position,
            v: state.velocity,
            a: state.acceleration,
            duration: 0.0,
            initial: state,
        }
    }

    /// Current propagated state.
    #[inline]
    pub fn state(&self) -> KinematicState {
        KinematicState::new(self.p, self.v, self.a)
    }

    /// Accumulated duration so far.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.duration
    }

    /// Append a constant-jerk phase. Degenerate durations are dropped
    /// without state drift.
    pub fn push(&mut self, duration: f64, jerk: f64) {
        if duration < T_EPS {
            return;
        }
        let phase = Phase {
            duration,
            jerk,
            p0: self.p,
            v0: self.v,
            a0: self.a,
        };
        let (p, v, a) = integrate(self.p, self.v, self.a, jerk, duration);
        self.p = p;
        self.v = v;
        self.a = a;
        self.duration += duration;
        // Capacity is pinned by const_assert; a push beyond it indicates a
        // solver bug, surfaced in debug builds.
        debug_assert!(self.phases.len() < MAX_PROFILE_PHASES);
        let _ = self.phases.push(phase);
    }

    /// Set the acceleration discontinuously (infinite-jerk profiles only).
    pub fn jump_acceleration(&mut self, a: f64) {
        self.a = a;
    }

    /// Finish, snapping the final state to `target` when provided.
    ///
    /// The snap hides sub-tolerance residuals of the numeric solve; the
    /// sampled state at `duration` then matches the target exactly.
    pub fn finish(self, target: Option<KinematicState>) -> Profile {
        let final_state = target.unwrap_or_else(|| KinematicState::new(self.p, self.v, self.a));
        Profile {
            phases: self.phases,
            duration: self.duration,
            initial: self.initial,
            final_state,
        }
    }
}
