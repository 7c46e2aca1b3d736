//! End-to-end position-interface scenarios.
//!
//! Exercises the full solver chain — brake prelude, per-axis synthesis,
//! duration synchronization, trajectory query — through the public API,
//! including the reference three-axis motion used across the examples.

use otg_core::prelude::*;

/// The reference three-axis scenario: a fast replan from a state that is
/// partially outside the configured limits.
fn reference_input() -> InputParameter {
    let mut inp = InputParameter::new(3);
    inp.current_position = vec![0.0, 0.0, 0.5];
    inp.current_velocity = vec![0.0, -2.2, -0.5];
    inp.current_acceleration = vec![0.0, 2.5, -0.5];

    inp.target_position = vec![5.0, -2.0, -3.5];
    inp.target_velocity = vec![0.0, -0.5, -2.0];
    inp.target_acceleration = vec![0.0, 0.0, 0.5];

    inp.max_velocity = vec![3.0, 1.0, 3.0];
    inp.max_acceleration = vec![3.0, 2.0, 1.0];
    inp.max_jerk = vec![4.0, 3.0, 2.0];
    inp
}

#[test]
fn reference_scenario_reaches_target() {
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&reference_input()).unwrap();
    assert!(traj.duration() > 0.0);

    let end = traj.state_at(traj.duration());
    let inp = reference_input();
    for axis in 0..3 {
        assert!(
            (end[axis].position - inp.target_position[axis]).abs() < 1e-6,
            "axis {axis} position {} vs {}",
            end[axis].position,
            inp.target_position[axis]
        );
        assert!((end[axis].velocity - inp.target_velocity[axis]).abs() < 1e-6);
        assert!((end[axis].acceleration - inp.target_acceleration[axis]).abs() < 1e-6);
    }
}

#[test]
fn reference_scenario_online_loop() {
    let mut otg = TrajectoryGenerator::new(3, 0.01);
    let mut inp = reference_input();
    let mut out = OutputParameter::new(3);

    let mut first_calculation_duration = None;
    let mut cycles = 0;
    loop {
        let status = otg.update(&inp, &mut out).unwrap();
        if first_calculation_duration.is_none() {
            assert!(out.new_calculation);
            first_calculation_duration = Some(out.calculation_duration);
        }
        out.pass_to_input(&mut inp);
        cycles += 1;
        assert!(cycles < 100_000, "loop did not terminate");
        if status == UpdateStatus::Finished {
            break;
        }
    }

    let reference = reference_input();
    for axis in 0..3 {
        assert!((out.new_position[axis] - reference.target_position[axis]).abs() < 1e-6);
        assert!((out.new_velocity[axis] - reference.target_velocity[axis]).abs() < 1e-6);
    }
    // The loop ran for the whole trajectory duration.
    let traj = out.trajectory.as_ref().unwrap();
    assert!((cycles as f64) * 0.01 >= traj.duration());
}

#[test]
fn limits_are_respected_along_the_trajectory() {
    let inp = reference_input();
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&inp).unwrap();

    let steps = 2000;
    for k in 0..=steps {
        let t = traj.duration() * k as f64 / steps as f64;
        let state = traj.state_at(t);
        for axis in 0..3 {
            // Axes that start outside a bound may only exceed it by their
            // initial excess while braking back in.
            let v_hi = inp.max_velocity[axis].max(inp.current_velocity[axis]) + 1e-6;
            let v_lo = (-inp.max_velocity[axis]).min(inp.current_velocity[axis]) - 1e-6;
            assert!(state[axis].velocity <= v_hi, "axis {axis} v at t={t}");
            assert!(state[axis].velocity >= v_lo, "axis {axis} v at t={t}");

            let a_hi = inp.max_acceleration[axis].max(inp.current_acceleration[axis]) + 1e-6;
            let a_lo = (-inp.max_acceleration[axis]).min(inp.current_acceleration[axis]) - 1e-6;
            assert!(state[axis].acceleration <= a_hi, "axis {axis} a at t={t}");
            assert!(state[axis].acceleration >= a_lo, "axis {axis} a at t={t}");
        }
    }

    // Jerk caps hold phase-wise.
    for (axis, profile) in traj.sections()[0].profiles.iter().enumerate() {
        assert!(profile.peak_jerk() <= inp.max_jerk[axis] + 1e-9);
    }
}

#[test]
fn time_synchronization_equalizes_axis_durations() {
    let inp = reference_input();
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&inp).unwrap();
    for profile in &traj.sections()[0].profiles {
        assert!(
            (profile.duration() - traj.duration()).abs() < 1e-9,
            "axis duration {} vs trajectory {}",
            profile.duration(),
            traj.duration()
        );
    }
}

#[test]
fn calculate_is_idempotent() {
    let otg = TrajectoryGenerator::new_offline(3);
    let a = otg.calculate(&reference_input()).unwrap();
    let b = otg.calculate(&reference_input()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn raising_limits_never_slows_the_minimum() {
    let base_input = reference_input();
    let otg = TrajectoryGenerator::new_offline(3);
    let base = otg.calculate(&base_input).unwrap().duration();

    for scale_axis in 0..3 {
        for field in 0..3 {
            let mut inp = reference_input();
            match field {
                0 => inp.max_velocity[scale_axis] *= 2.0,
                1 => inp.max_acceleration[scale_axis] *= 2.0,
                _ => inp.max_jerk[scale_axis] *= 2.0,
            }
            let t = otg.calculate(&inp).unwrap().duration();
            assert!(
                t <= base + 1e-9,
                "raising limit {field} on axis {scale_axis}: {t} > {base}"
            );
        }
    }
}

#[test]
fn position_extrema_are_reported_with_times() {
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&reference_input()).unwrap();
    for (axis, ext) in traj.position_extrema().iter().enumerate() {
        assert!(ext.min <= ext.max);
        assert!(ext.t_min >= 0.0 && ext.t_min <= traj.duration() + 1e-9);
        assert!(ext.t_max >= 0.0 && ext.t_max <= traj.duration() + 1e-9);
        // The extremum values must actually occur there.
        let at_min = traj.state_at(ext.t_min)[axis].position;
        let at_max = traj.state_at(ext.t_max)[axis].position;
        assert!((at_min - ext.min).abs() < 1e-6, "axis {axis} min");
        assert!((at_max - ext.max).abs() < 1e-6, "axis {axis} max");
    }
}

#[test]
fn phase_synchronization_aligns_colinear_axes() {
    let mut inp = InputParameter::new(2);
    inp.target_position = vec![2.0, 1.0];
    inp.max_velocity = vec![2.0, 2.0];
    inp.max_acceleration = vec![3.0, 3.0];
    inp.max_jerk = vec![10.0, 10.0];
    inp.synchronization = Synchronization::Phase;

    let otg = TrajectoryGenerator::new_offline(2);
    let traj = otg.calculate(&inp).unwrap();
    let [a, b] = &traj.sections()[0].profiles[..] else {
        panic!("expected two profiles");
    };
    assert_eq!(a.phases().len(), b.phases().len());
    for (pa, pb) in a.phases().iter().zip(b.phases()) {
        assert!((pa.duration - pb.duration).abs() < 1e-9);
    }
    let end = traj.state_at(traj.duration());
    assert!((end[0].position - 2.0).abs() < 1e-6);
    assert!((end[1].position - 1.0).abs() < 1e-6);
}

#[test]
fn sampling_beyond_duration_clamps_to_target() {
    let otg = TrajectoryGenerator::new_offline(3);
    let traj = otg.calculate(&reference_input()).unwrap();
    let end = traj.state_at(traj.duration());
    let beyond = traj.state_at(traj.duration() + 10.0);
    assert_eq!(end, beyond);
}
