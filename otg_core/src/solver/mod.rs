//! Per-axis profile solvers.
//!
//! One axis, one solve: either minimum time ([`solve_min_time`]) or an
//! exact requested duration ([`solve_with_duration`]). The control
//! interface selects between the position solver (all three target
//! components binding) and the velocity solver (position free).

pub mod brake;
pub mod position;
pub mod roots;
pub mod transfer;
pub mod velocity;

use crate::block::Block;
use crate::error::OtgError;
use crate::kinematics::{ControlInterface, KinematicState};
use crate::limits::Limits;
use crate::profile::Profile;

/// Result of a minimum-time solve: the profile plus the axis's
/// feasible-duration structure.
#[derive(Debug, Clone)]
pub struct MinSolve {
    /// The minimum-time profile.
    pub profile: Profile,
    /// Feasible durations for this axis.
    pub block: Block,
}

/// Result of a fixed-duration solve.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// A profile taking exactly the requested duration.
    Solved(Profile),
    /// The requested duration is unreachable; the next feasible duration
    /// is reported so the synchronizer can raise the common duration.
    BlockedUntil(f64),
}

/// Minimum-time solve for one axis.
pub fn solve_min_time(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
    interface: ControlInterface,
) -> Result<MinSolve, OtgError> {
    match interface {
        ControlInterface::Position => position::solve_min_time(current, target, lim),
        ControlInterface::Velocity => velocity::solve_min_time(current, target, lim),
    }
}

/// Solve one axis to take exactly `t_total` seconds.
pub fn solve_with_duration(
    current: KinematicState,
    target: KinematicState,
    lim: &Limits,
    interface: ControlInterface,
    t_total: f64,
) -> Result<SolveOutcome, OtgError> {
    match interface {
        ControlInterface::Position => position::solve_with_duration(current, target, lim, t_total),
        ControlInterface::Velocity => velocity::solve_with_duration(current, target, lim, t_total),
    }
}
