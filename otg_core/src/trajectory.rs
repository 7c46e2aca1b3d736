//! The immutable, queryable trajectory.
//!
//! A trajectory owns one [`Section`] per waypoint segment (exactly one
//! when no waypoints are present), each holding one [`Profile`] per axis.
//! Queries never mutate: sampling, section lookup, and the precomputed
//! position extrema are all read-only, so a generator can hand out copies
//! freely.

use crate::error::OtgError;
use crate::kinematics::KinematicState;
use crate::limits::Limits;
use crate::profile::{PositionExtrema, Profile, T_EPS};
use crate::solver::roots;

/// One synchronized segment: per-axis profiles plus the segment duration.
///
/// Under `Synchronization::No` the per-axis profile durations may differ;
/// axes that finish early hold their final state for the remainder of the
/// section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section duration [s] — the maximum over the axis profiles.
    pub duration: f64,
    /// One profile per axis.
    pub profiles: Vec<Profile>,
}

impl Section {
    /// Build a section from per-axis profiles; the duration is the
    /// maximum over them.
    pub fn new(profiles: Vec<Profile>) -> Self {
        let duration = profiles
            .iter()
            .map(Profile::duration)
            .fold(0.0, f64::max);
        Self { duration, profiles }
    }

    /// Sample one axis at a section-local time.
    #[inline]
    pub fn state_at(&self, axis: usize, t: f64) -> KinematicState {
        self.profiles[axis].state_at(t)
    }
}

/// The complete, immutable result of one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    dof: usize,
    sections: Vec<Section>,
    /// End time of each section on the trajectory clock.
    boundaries: Vec<f64>,
    duration: f64,
    extrema: Vec<PositionExtrema>,
    target: Vec<KinematicState>,
}

impl Trajectory {
    /// Assemble sections into a trajectory, computing extrema and
    /// enforcing positional bounds.
    pub(crate) fn assemble(sections: Vec<Section>, limits: &[Limits]) -> Result<Self, OtgError> {
        debug_assert!(!sections.is_empty());
        let dof = sections[0].profiles.len();

        let mut boundaries = Vec::with_capacity(sections.len());
        let mut offset = 0.0;
        for s in &sections {
            offset += s.duration;
            boundaries.push(offset);
        }
        let duration = offset;

        // Per-axis extrema merged over sections, on the trajectory clock.
        let mut extrema = Vec::with_capacity(dof);
        for axis in 0..dof {
            let mut merged: Option<PositionExtrema> = None;
            let mut start = 0.0;
            for s in &sections {
                let mut e = s.profiles[axis].position_extrema();
                e.t_min += start;
                e.t_max += start;
                match merged.as_mut() {
                    Some(m) => m.merge(&e),
                    None => merged = Some(e),
                }
                start += s.duration;
            }
            let e = merged.expect("at least one section");
            let lim = &limits[axis];
            let tol = roots::tol(e.min.abs().max(e.max.abs()));
            if !lim.position_in_bounds(e.min, tol) || !lim.position_in_bounds(e.max, tol) {
                return Err(OtgError::Infeasible(format!(
                    "axis {axis}: profile reaches [{:.6}, {:.6}], outside position bounds",
                    e.min, e.max
                )));
            }
            extrema.push(e);
        }

        let target = (0..dof)
            .map(|axis| {
                sections
                    .last()
                    .expect("at least one section")
                    .profiles[axis]
                    .final_state()
            })
            .collect();

        Ok(Self {
            dof,
            sections,
            boundaries,
            duration,
            extrema,
            target,
        })
    }

    /// Number of axes.
    #[inline]
    pub fn degrees_of_freedom(&self) -> usize {
        self.dof
    }

    /// Total planned motion time [s].
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The sections, in order. One per waypoint segment.
    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Per-axis position extrema over the whole trajectory.
    #[inline]
    pub fn position_extrema(&self) -> &[PositionExtrema] {
        &self.extrema
    }

    /// The exact final state per axis.
    #[inline]
    pub fn target_states(&self) -> &[KinematicState] {
        &self.target
    }

    /// Index of the section active at time `t` (clamped to the last).
    pub fn section_index_at(&self, t: f64) -> usize {
        for (i, &end) in self.boundaries.iter().enumerate() {
            if t < end - T_EPS {
                return i;
            }
        }
        self.sections.len() - 1
    }

    /// Sample every axis at time `t` into `out`.
    ///
    /// `t` is clamped to `[0, duration]`: negative times return the start,
    /// times beyond the duration the exact target state.
    pub fn state_at_into(&self, t: f64, out: &mut [KinematicState]) {
        debug_assert_eq!(out.len(), self.dof);
        if t >= self.duration - T_EPS {
            out.copy_from_slice(&self.target);
            return;
        }
        let idx = self.section_index_at(t);
        let start = if idx == 0 { 0.0 } else { self.boundaries[idx - 1] };
        let local = (t - start).max(0.0);
        for (axis, slot) in out.iter_mut().enumerate() {
            *slot = self.sections[idx].state_at(axis, local);
        }
    }

    /// Allocating convenience wrapper around [`Self::state_at_into`].
    pub fn state_at(&self, t: f64) -> Vec<KinematicState> {
        let mut out = vec![KinematicState::default(); self.dof];
        self.state_at_into(t, &mut out);
        out
    }
}

/// Sample the trajectory at `elapsed` and return the state the caller
/// should feed back as the next cycle's current state.
///
/// The explicit form of the manual feedback loop: no aliasing between
/// output and input objects, and trivially replaced by real sensor data.
pub fn advance(trajectory: &Trajectory, elapsed: f64) -> Vec<KinematicState> {
    trajectory.state_at(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileBuilder;

    fn ramp_profile(distance_sign: f64) -> Profile {
        // 1 s at j = ±2, 1 s hold, 1 s back: net Δv = ±4.
        let mut b = ProfileBuilder::new(KinematicState::default());
        b.push(1.0, 2.0 * distance_sign);
        b.push(1.0, 0.0);
        b.push(1.0, -2.0 * distance_sign);
        b.finish(None)
    }

    fn free_limits() -> Vec<Limits> {
        vec![Limits::symmetric(100.0, 100.0, 100.0)]
    }

    #[test]
    fn single_section_duration_and_sampling() {
        let sec = Section::new(vec![ramp_profile(1.0)]);
        let traj = Trajectory::assemble(vec![sec], &free_limits()).unwrap();
        assert!((traj.duration() - 3.0).abs() < 1e-12);
        assert_eq!(traj.degrees_of_freedom(), 1);

        let mid = traj.state_at(1.5);
        assert!(mid[0].velocity > 0.0);
        let end = traj.state_at(10.0);
        assert_eq!(end[0], traj.target_states()[0]);
    }

    #[test]
    fn multi_section_lookup() {
        let first = Section::new(vec![ramp_profile(1.0)]);
        // Second section continues from the first one's final state.
        let start = first.profiles[0].final_state();
        let mut b = ProfileBuilder::new(start);
        b.push(2.0, -2.0);
        let second = Section::new(vec![b.finish(None)]);

        let traj = Trajectory::assemble(vec![first, second], &free_limits()).unwrap();
        assert!((traj.duration() - 5.0).abs() < 1e-12);
        assert_eq!(traj.section_index_at(1.0), 0);
        assert_eq!(traj.section_index_at(4.0), 1);
        assert_eq!(traj.section_index_at(99.0), 1);

        // Continuity across the section boundary.
        let before = traj.state_at(3.0 - 1e-9);
        let after = traj.state_at(3.0 + 1e-9);
        assert!((before[0].position - after[0].position).abs() < 1e-6);
        assert!((before[0].velocity - after[0].velocity).abs() < 1e-6);
    }

    #[test]
    fn extrema_respect_section_offsets() {
        let first = Section::new(vec![ramp_profile(1.0)]);
        let start = first.profiles[0].final_state();
        let mut b = ProfileBuilder::new(start);
        b.push(1.0, -8.0);
        b.push(1.0, 8.0);
        let second = Section::new(vec![b.finish(None)]);

        let traj = Trajectory::assemble(vec![first, second], &free_limits()).unwrap();
        let ext = &traj.position_extrema()[0];
        // The maximum position lies in the second section, so its time
        // must be beyond the first section's end.
        assert!(ext.t_max > 3.0);
    }

    #[test]
    fn position_bounds_violation_is_infeasible() {
        let mut lim = Limits::symmetric(100.0, 100.0, 100.0);
        lim.max_position = Some(1.0);
        let sec = Section::new(vec![ramp_profile(1.0)]);
        let err = Trajectory::assemble(vec![sec], &[lim]).unwrap_err();
        assert!(matches!(err, OtgError::Infeasible(_)));
    }

    #[test]
    fn advance_matches_sampling() {
        let sec = Section::new(vec![ramp_profile(1.0)]);
        let traj = Trajectory::assemble(vec![sec], &free_limits()).unwrap();
        assert_eq!(advance(&traj, 1.2), traj.state_at(1.2));
    }
}
