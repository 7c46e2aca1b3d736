//! Waypoint chaining: decompose a trajectory through N intermediate
//! positions into N+1 synchronized sections.
//!
//! Only the waypoint positions are fixed; their velocities and
//! accelerations are free. The chainer picks a pass-through velocity per
//! waypoint with a closed-form heuristic (zero on direction reversal,
//! otherwise directed along the segment pair and capped by the velocity
//! limit and by the acceleration- and jerk-reachable bounds over the
//! shorter adjacent segment) and zero acceleration, then solves the
//! sections left to right — each section's exit state is the next one's
//! entry. When a section cannot be realized, an outer relaxation halves
//! every waypoint velocity and retries, bounded by
//! [`MAX_WAYPOINT_PASSES`] to keep worst-case latency analyzable.

use tracing::debug;

use crate::error::OtgError;
use crate::input::InputParameter;
use crate::kinematics::{ControlInterface, KinematicState, Synchronization};
use crate::limits::Limits;
use crate::sync::{CalcBudget, SectionRequest, synchronize_section};
use crate::trajectory::Section;

/// Bound on outer exit-velocity relaxation passes.
pub const MAX_WAYPOINT_PASSES: usize = 8;

/// Build the section chain for an input with intermediate positions.
pub fn chain(input: &InputParameter, budget: &CalcBudget) -> Result<Vec<Section>, OtgError> {
    let dof = input.degrees_of_freedom;
    let waypoints = &input.intermediate_positions;
    let n_sections = waypoints.len() + 1;

    let limits: Vec<Limits> = (0..dof).map(|i| input.limits_for_axis(i)).collect();
    let floors: Vec<Option<f64>> = match &input.per_section_minimum_duration {
        Some(f) => f
            .iter()
            .map(|&d| if d > 0.0 { Some(d) } else { None })
            .collect(),
        None => vec![None; n_sections],
    };

    // Position knots: current, waypoints, target.
    let mut knots: Vec<Vec<f64>> = Vec::with_capacity(n_sections + 1);
    knots.push(input.current_position.clone());
    for row in waypoints {
        knots.push(row.clone());
    }
    knots.push(input.target_position.clone());

    // Initial pass-through velocities per waypoint.
    let mut exit_velocity: Vec<Vec<f64>> = (0..waypoints.len())
        .map(|k| {
            (0..dof)
                .map(|i| pass_through_velocity(&knots, k + 1, i, &limits[i]))
                .collect()
        })
        .collect();

    for pass in 0..MAX_WAYPOINT_PASSES {
        budget.check()?;
        match try_chain(input, &knots, &exit_velocity, &floors, &limits, budget) {
            Ok(sections) => {
                if pass > 0 {
                    debug!(pass, "waypoint chain solved after relaxation");
                }
                return Ok(sections);
            }
            Err(OtgError::Infeasible(reason)) => {
                debug!(pass, %reason, "waypoint section infeasible, relaxing exit velocities");
                for row in exit_velocity.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= 0.5;
                    }
                }
            }
            Err(other) => return Err(other),
        }
    }

    Err(OtgError::Infeasible(format!(
        "waypoint chain did not converge within {MAX_WAYPOINT_PASSES} relaxation passes"
    )))
}

fn try_chain(
    input: &InputParameter,
    knots: &[Vec<f64>],
    exit_velocity: &[Vec<f64>],
    floors: &[Option<f64>],
    limits: &[Limits],
    budget: &CalcBudget,
) -> Result<Vec<Section>, OtgError> {
    let dof = input.degrees_of_freedom;
    let n_sections = knots.len() - 1;
    let mut sections = Vec::with_capacity(n_sections);

    let mut entry: Vec<KinematicState> = (0..dof).map(|i| input.current_state(i)).collect();
    let mut entry_of_last = entry.clone();

    for s in 0..n_sections {
        budget.check()?;
        let exit: Vec<KinematicState> = (0..dof)
            .map(|i| {
                if s + 1 == n_sections {
                    input.target_state(i)
                } else {
                    KinematicState::new(knots[s + 1][i], exit_velocity[s][i], 0.0)
                }
            })
            .collect();

        // Waypoint sections are always time-synchronized: every axis must
        // arrive at the waypoint simultaneously for the hand-off state to
        // be consistent.
        let req = SectionRequest {
            current: &entry,
            target: &exit,
            limits,
            interface: ControlInterface::Position,
            mode: Synchronization::Time,
            minimum_duration: floors[s],
            active_axes: dof,
        };
        let section = synchronize_section(&req, budget)?;
        entry_of_last = entry;
        entry = exit;
        sections.push(section);
    }

    // An overall duration floor is absorbed by the final section.
    if let Some(overall) = input.minimum_duration {
        let total: f64 = sections.iter().map(|s| s.duration).sum();
        if total < overall {
            let last = sections.pop().expect("at least one section");
            let deficit = overall - (total - last.duration);
            let target: Vec<KinematicState> =
                (0..dof).map(|i| input.target_state(i)).collect();
            let req = SectionRequest {
                current: &entry_of_last,
                target: &target,
                limits,
                interface: ControlInterface::Position,
                mode: Synchronization::Time,
                minimum_duration: Some(deficit.max(floors[n_sections - 1].unwrap_or(0.0))),
                active_axes: dof,
            };
            sections.push(synchronize_section(&req, budget)?);
        }
    }

    Ok(sections)
}

/// Closed-form pass-through velocity heuristic for knot `k` on one axis.
fn pass_through_velocity(knots: &[Vec<f64>], k: usize, axis: usize, lim: &Limits) -> f64 {
    let d_prev = knots[k][axis] - knots[k - 1][axis];
    let d_next = knots[k + 1][axis] - knots[k][axis];
    if d_prev * d_next <= 0.0 {
        // Direction reversal (or a dwell knot): stop at the waypoint.
        return 0.0;
    }
    let d = d_prev.abs().min(d_next.abs());
    let v_acc = (0.75 * lim.max_acceleration * d).sqrt();
    let v_jerk = (1.5 * lim.max_jerk * d * d).cbrt();
    let dir = d_next.signum();
    dir * lim.max_velocity.min(v_acc).min(v_jerk)
}
