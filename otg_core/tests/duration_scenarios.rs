//! Minimum-duration and waypoint scenarios.

use otg_core::prelude::*;

/// Three-axis motion whose unconstrained minimum is well under 5 s.
fn min_duration_input() -> InputParameter {
    let mut inp = InputParameter::new(3);
    inp.current_position = vec![0.0, 0.0, 0.5];
    inp.current_velocity = vec![0.0, -2.2, -0.5];
    inp.current_acceleration = vec![0.0, 2.5, -0.5];

    inp.target_position = vec![-5.0, -2.0, -3.5];
    inp.target_velocity = vec![0.0, -0.5, -2.0];
    inp.target_acceleration = vec![0.0, 0.0, 0.5];

    inp.max_velocity = vec![3.0, 1.0, 3.0];
    inp.max_acceleration = vec![3.0, 2.0, 1.0];
    inp.max_jerk = vec![4.0, 3.0, 2.0];
    inp
}

#[test]
fn minimum_duration_floors_the_trajectory() {
    let otg = TrajectoryGenerator::new_offline(3);

    let unconstrained = otg.calculate(&min_duration_input()).unwrap().duration();
    assert!(unconstrained < 5.0, "scenario must be unconstrained: {unconstrained}");

    let mut inp = min_duration_input();
    inp.minimum_duration = Some(5.0);
    let traj = otg.calculate(&inp).unwrap();
    assert!(traj.duration() >= 5.0 - 1e-9);
    assert!((traj.duration() - 5.0).abs() < 1e-6, "duration {}", traj.duration());

    // The floor must not cost accuracy.
    let end = traj.state_at(traj.duration());
    for axis in 0..3 {
        assert!((end[axis].position - inp.target_position[axis]).abs() < 1e-6);
        assert!((end[axis].velocity - inp.target_velocity[axis]).abs() < 1e-6);
    }
}

#[test]
fn minimum_duration_below_the_minimum_changes_nothing() {
    let otg = TrajectoryGenerator::new_offline(3);
    let unconstrained = otg.calculate(&min_duration_input()).unwrap().duration();

    let mut inp = min_duration_input();
    inp.minimum_duration = Some(unconstrained / 2.0);
    let traj = otg.calculate(&inp).unwrap();
    assert!((traj.duration() - unconstrained).abs() < 1e-9);
}

/// Six waypoints with per-section floors, as in a tool-change sweep.
fn waypoint_input() -> InputParameter {
    let mut inp = InputParameter::new(3);
    inp.current_position = vec![0.8, 0.0, 0.5];

    inp.intermediate_positions = vec![
        vec![1.4, -1.6, 1.0],
        vec![-0.6, -0.5, 0.4],
        vec![-0.4, -0.35, 0.0],
        vec![-0.2, 0.35, -0.1],
        vec![0.2, 0.5, -0.1],
        vec![0.8, 1.8, -0.1],
    ];

    inp.target_position = vec![0.5, 1.2, 0.0];

    inp.max_velocity = vec![3.0, 2.0, 2.0];
    inp.max_acceleration = vec![6.0, 4.0, 4.0];
    inp.max_jerk = vec![16.0, 10.0, 20.0];

    inp.per_section_minimum_duration = Some(vec![0.0, 2.0, 0.0, 1.0, 0.0, 2.0, 0.0]);
    inp
}

#[test]
fn per_section_floors_are_honored() {
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&waypoint_input()).unwrap();

    let floors = [0.0, 2.0, 0.0, 1.0, 0.0, 2.0, 0.0];
    assert_eq!(traj.sections().len(), floors.len());
    for (k, (section, &floor)) in traj.sections().iter().zip(&floors).enumerate() {
        assert!(
            section.duration >= floor - 1e-9,
            "section {k}: {} < floor {floor}",
            section.duration
        );
    }
    assert!(traj.duration() >= 5.0);
}

#[test]
fn waypoints_are_passed_in_order() {
    let inp = waypoint_input();
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&inp).unwrap();

    let mut t_edge = 0.0;
    let mut last_time = -1.0;
    for (k, section) in traj
        .sections()
        .iter()
        .take(inp.intermediate_positions.len())
        .enumerate()
    {
        t_edge += section.duration;
        assert!(t_edge > last_time);
        last_time = t_edge;

        let state = traj.state_at(t_edge - 1e-9);
        for axis in 0..3 {
            assert!(
                (state[axis].position - inp.intermediate_positions[k][axis]).abs() < 1e-4,
                "waypoint {k} axis {axis}: {} vs {}",
                state[axis].position,
                inp.intermediate_positions[k][axis]
            );
        }
    }

    let end = traj.state_at(traj.duration());
    for axis in 0..3 {
        assert!((end[axis].position - inp.target_position[axis]).abs() < 1e-6);
    }
}

#[test]
fn waypoint_online_loop_reports_sections() {
    let mut otg = TrajectoryGenerator::with_waypoint_capacity(3, 0.01, 10);
    let mut inp = waypoint_input();
    let mut out = OutputParameter::new(3);

    let mut last_section = 0;
    let mut section_changes = 0;
    let mut cycles = 0;
    loop {
        let status = otg.update(&inp, &mut out).unwrap();
        assert!(
            out.current_section >= last_section,
            "section index went backwards"
        );
        if out.did_section_change {
            section_changes += 1;
        }
        last_section = out.current_section;
        out.pass_to_input(&mut inp);
        cycles += 1;
        assert!(cycles < 100_000);
        if status == UpdateStatus::Finished {
            break;
        }
    }
    assert_eq!(last_section, 6);
    assert_eq!(section_changes, 6);
}

#[test]
fn waypoint_count_beyond_capacity_is_rejected() {
    let mut otg = TrajectoryGenerator::with_waypoint_capacity(3, 0.01, 2);
    let inp = waypoint_input();
    let mut out = OutputParameter::new(3);
    let err = otg.update(&inp, &mut out).unwrap_err();
    assert!(matches!(err, OtgError::InvalidInput(_)));
}
