use std::time::Duration;

use math::{Angle, GeoPoint, Heading, Length, Speed};
use store::{
    AutopilotConfig, ControlMethod, Curve, CurvePoint, LimitsAndSettings, PidGroupConfig,
    SupportTables, Table2d, Table2dRow, VehicleConfig,
};

use super::aero::AeroTables;
use super::{
    AutopilotAction, Channel, ChannelLoopState, CommonController, ControllerCtx, LateralMode,
    SpeedMode, VerticalMode,
};
use crate::level::vehicle::{Kinematics, VehicleData};
use crate::load;
use crate::pid::PidKind;

const DT: Duration = Duration::from_millis(10);

fn vehicle_config() -> VehicleConfig {
    VehicleConfig {
        mass_lbm: 20000.0,
        wing_area_ft2: 300.0,
        flat_plate_area_ft2: 4.0,
        max_thrust_lbs: 8000.0,
        min_thrust_lbs: 200.0,
        afterburner_thrust_lbs: 6000.0,
        response: store::ResponseConfig::default(),
    }
}

fn autopilot_config(method: ControlMethod) -> AutopilotConfig {
    let mut pid_group = PidGroupConfig::default();
    pid_group.pid_altitude.kp = Some(8.0);
    pid_group.pid_altitude.ignore_large_error_accum = Some(500.0);
    pid_group.pid_vert_speed.kp = Some(0.004);
    pid_group.pid_vert_speed.ki = Some(0.0008);
    pid_group.pid_vert_speed.max_error_accum = Some(5000.0);
    pid_group.pid_alpha.kp = Some(0.08);
    pid_group.pid_alpha.ki = Some(0.04);
    pid_group.pid_alpha.max_error_accum = Some(10.0);
    pid_group.pid_roll_heading.kp = Some(1.0);
    pid_group.pid_bank_angle.kp = Some(2.0);
    pid_group.pid_roll_rate.kp = Some(0.01);
    pid_group.pid_speed.kp = Some(0.02);
    pid_group.pid_yaw_heading.kp = Some(1.0);
    pid_group.pid_yaw_rate.kp = Some(0.5);
    pid_group.pid_beta.kp = Some(0.1);
    pid_group.pid_taxi_heading.kp = Some(1.0);
    pid_group.pid_taxi_yaw_rate.kp = Some(0.1);
    pid_group.pid_taxi_speed.kp = Some(0.05);

    AutopilotConfig {
        control_method: method,
        vertical_middle_loop_rate_factor: 10,
        lateral_middle_loop_rate_factor: 10,
        speed_middle_loop_rate_factor: 10,
        vertical_outer_loop_rate_factor: 5,
        lateral_outer_loop_rate_factor: 5,
        speed_outer_loop_rate_factor: 5,
        use_legacy_beta: true,
        use_simple_yaw_damper: false,
        min_taxi_turn_radius: Length::from_feet(50.0),
        pid_group,
        limits_and_settings: LimitsAndSettings::default(),
    }
}

/// Support tables consistent with the default response model:
/// alpha = 4.55 deg per unit CL, stick = alpha / 20.
fn support_tables() -> SupportTables {
    SupportTables {
        alpha_vs_cl: Table2d {
            rows: vec![Table2dRow {
                key: 0.3,
                curve: Curve::from_pairs(&[(-2.0, -9.1), (0.0, 0.0), (2.0, 9.1)]),
            }],
        },
        stick_zero_moment: Table2d {
            rows: vec![Table2dRow {
                key: 0.3,
                curve: Curve::from_pairs(&[(-20.0, -1.0), (0.0, 0.0), (20.0, 1.0)]),
            }],
        },
        alpha_max_mach: Curve::from_pairs(&[(0.0, 22.0), (2.0, 15.0)]),
        alpha_min_mach: Curve::from_pairs(&[(0.0, -10.0), (2.0, -6.0)]),
        beta_vs_g: Curve::from_pairs(&[(-2.0, -6.0), (0.0, 0.0), (2.0, 6.0)]),
        ..SupportTables::default()
    }
}

fn controller(method: ControlMethod) -> CommonController {
    let config = autopilot_config(method);
    let pids = load::build_pid_group(&config.pid_group).expect("valid gains");
    let aero = AeroTables::from_config(&support_tables()).expect("valid tables");
    CommonController::new(&config, pids, aero)
}

fn level_state() -> Kinematics {
    Kinematics::level_flight(
        GeoPoint::from_degrees(35.0, -117.0, Length::from_feet(10000.0)),
        Heading::NORTH,
        Speed::from_knots(350.0),
    )
}

fn vehicle_data() -> VehicleData { VehicleData::from_config(&vehicle_config()) }

fn run_updates(
    ctl: &mut CommonController,
    state: &Kinematics,
    action: &AutopilotAction,
    steps: usize,
) -> crate::level::vehicle::ActuatorCommand {
    let vehicle = vehicle_data();
    let mut out = crate::level::vehicle::ActuatorCommand::default();
    for _ in 0..steps {
        let ctx = ControllerCtx { state, vehicle: &vehicle, action, route: None, dt: DT };
        out = ctl.update(&ctx);
    }
    out
}

#[test]
fn every_output_stays_within_bounds() {
    // Drive the controller hard in every channel and confirm the final
    // limit-enforcement pass holds all bounds.
    let mut ctl = controller(ControlMethod::BankToTurnWithYaw);
    let state = level_state();

    let extreme = AutopilotAction {
        lateral: LateralMode::Heading(Heading::SOUTH),
        stabilizing: LateralMode::Undefined,
        vertical: VerticalMode::Altitude(Length::from_feet(60000.0)),
        speed: SpeedMode::Ktas(2000.0),
        nav: None,
    };

    let vehicle = vehicle_data();
    for _ in 0..200 {
        let ctx =
            ControllerCtx { state: &state, vehicle: &vehicle, action: &extreme, route: None, dt: DT };
        let out = ctl.update(&ctx);
        assert!(out.within_limits(), "bounds violated: {out:?}");
    }
}

#[test]
fn afterburner_engages_above_threshold() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();

    // A huge speed error saturates the speed command at 2.0.
    let action = AutopilotAction {
        speed: SpeedMode::Fps(Speed::from_fps(10000.0)),
        ..AutopilotAction::default()
    };
    let out = run_updates(&mut ctl, &state, &action, 1);

    assert!((out.throttle_military - 1.0).abs() < 1e-12);
    assert!(out.throttle_afterburner > 0.9, "command beyond the threshold spills into ab");
    assert_eq!(out.speed_brake, 0.0);
}

#[test]
fn speed_brake_deploys_below_threshold() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();

    let action =
        AutopilotAction { speed: SpeedMode::Fps(Speed::ZERO), ..AutopilotAction::default() };
    let out = run_updates(&mut ctl, &state, &action, 1);

    assert_eq!(out.throttle_military, 0.0);
    assert_eq!(out.throttle_afterburner, 0.0);
    assert!(out.speed_brake > 0.5, "a large deceleration command deploys the brake");
}

#[test]
fn mid_range_speed_command_is_military_only() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();

    // Holding the current speed keeps the command near the throttle bias.
    let action = AutopilotAction {
        speed: SpeedMode::Fps(state.speed),
        ..AutopilotAction::default()
    };
    let out = run_updates(&mut ctl, &state, &action, 1);

    assert_eq!(out.throttle_afterburner, 0.0);
    assert_eq!(out.speed_brake, 0.0);
    assert!(out.throttle_military > 0.0 && out.throttle_military < 1.0);
}

#[test]
fn alpha_envelope_respects_gload_limit() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();
    let action = AutopilotAction::default();
    run_updates(&mut ctl, &state, &action, 1);

    // The g-load alpha never loosens the configured ceiling, and the
    // invariant min <= max holds after every recomputation.
    assert!(ctl.limited_min_alpha() <= ctl.limited_max_alpha());
    assert!(ctl.limited_max_alpha() <= ctl.current_limits().alpha_max);

    // At a much higher dynamic pressure the g-load alpha is the tighter
    // bound.
    let fast = Kinematics::level_flight(
        GeoPoint::from_degrees(35.0, -117.0, Length::from_feet(2000.0)),
        Heading::NORTH,
        Speed::from_knots(900.0),
    );
    run_updates(&mut ctl, &fast, &action, 1);
    assert!(ctl.limited_max_alpha() < ctl.current_limits().alpha_max);
    assert!(ctl.limited_min_alpha() <= ctl.limited_max_alpha());
}

#[test]
fn g_bias_is_finite_at_vertical_pitch() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let mut state = level_state();
    state.pitch = Angle::RIGHT;

    let action = AutopilotAction {
        vertical: VerticalMode::VertSpeed(Speed::ZERO),
        ..AutopilotAction::default()
    };
    let out = run_updates(&mut ctl, &state, &action, 60);
    assert!(out.stick_back.is_finite());
    assert!(out.within_limits());
}

#[test]
fn zero_speed_taxi_steering_is_neutral() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    ctl.set_taxi_mode(true);

    let mut state = level_state();
    state.speed = Speed::ZERO;
    state.on_ground = true;
    state.refresh_air_data();

    let action = AutopilotAction {
        lateral: LateralMode::YawRate(math::AngularSpeed::from_degrees_per_sec(5.0)),
        ..AutopilotAction::default()
    };
    let out = run_updates(&mut ctl, &state, &action, 20);

    assert_eq!(out.nose_wheel_steering, 0.0, "steering authority fades out at zero speed");
    assert_eq!(out.wheel_brake_left, 0.0);
    assert_eq!(out.wheel_brake_right, 0.0);
    assert!(out.within_limits());
}

#[test]
fn loop_gates_follow_rate_factors() {
    let mut config = autopilot_config(ControlMethod::BankToTurnNoYaw);
    config.lateral_middle_loop_rate_factor = 2;
    config.lateral_outer_loop_rate_factor = 2;
    let pids = load::build_pid_group(&config.pid_group).expect("valid gains");
    let aero = AeroTables::from_config(&support_tables()).expect("valid tables");
    let mut ctl = CommonController::new(&config, pids, aero);

    let state = level_state();
    let vehicle = vehicle_data();
    let action = AutopilotAction::default();

    let mut states = Vec::new();
    for _ in 0..4 {
        let ctx =
            ControllerCtx { state: &state, vehicle: &vehicle, action: &action, route: None, dt: DT };
        ctl.update(&ctx);
        states.push(ctl.channel_loop_state(Channel::Lateral));
    }

    // With M=2, O=2: middle fires every 2nd frame, outer every 4th.
    assert_eq!(states, vec![
        ChannelLoopState::ExecutingInnerOnly,
        ChannelLoopState::ExecutingMiddleAndInner,
        ChannelLoopState::ExecutingInnerOnly,
        ChannelLoopState::ExecutingOuterMiddleAndInner,
    ]);
}

#[test]
fn saturated_altitude_step_clamps_vert_speed_setpoint() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();

    // +10000 m altitude step.
    let target = state.position.alt + Length::from_meters(10000.0);
    let action = AutopilotAction {
        vertical: VerticalMode::Altitude(target),
        ..AutopilotAction::default()
    };

    // Enough steps for outer and middle loops to fire.
    run_updates(&mut ctl, &state, &action, 120);

    let vert = ctl.pid_telemetry(PidKind::VertSpeed);
    let max_fpm = ctl.current_limits().vert_speed_max.into_fpm();
    assert!(
        (vert.set_point - max_fpm).abs() < 1e-9,
        "vert-speed setpoint clamps to the envelope: {}",
        vert.set_point
    );

    // The altitude accumulator is frozen by the large-error guard.
    let alt = ctl.pid_telemetry(PidKind::Altitude);
    assert_eq!(alt.error_accum, 0.0, "large-error freeze holds the accumulator at zero");
}

#[test]
fn revert_limits_restores_defaults() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let defaults = ctl.default_limits().clone();

    ctl.current_limits_mut().bank_angle_max = Angle::from_degrees(15.0);
    ctl.current_limits_mut().vert_speed_max = Speed::from_fpm(500.0);
    ctl.current_limits_mut().pitch_gload_max = 2.0;
    assert!(*ctl.current_limits() != defaults);

    ctl.revert_limits_and_settings_to_defaults();
    assert!(*ctl.current_limits() == defaults, "byte-equal default limits restored");
}

#[test]
fn repeated_action_install_is_idempotent() {
    let action = AutopilotAction {
        lateral: LateralMode::Heading(Heading::EAST),
        vertical: VerticalMode::Altitude(Length::from_feet(12000.0)),
        speed: SpeedMode::Ktas(350.0),
        ..AutopilotAction::default()
    };

    let state = level_state();

    // One controller installs the action once, the other re-installs the
    // same action midway; outputs and accumulators must match.
    let mut once = controller(ControlMethod::BankToTurnNoYaw);
    let mut twice = controller(ControlMethod::BankToTurnNoYaw);
    once.install_action();
    twice.install_action();

    run_updates(&mut once, &state, &action, 50);
    run_updates(&mut twice, &state, &action, 50);

    twice.install_action();

    let a = run_updates(&mut once, &state, &action, 50);
    let b = run_updates(&mut twice, &state, &action, 50);

    assert_eq!(a, b, "identical outputs after re-installing the same action");
    assert_eq!(
        once.pid_telemetry(PidKind::VertSpeed).error_accum,
        twice.pid_telemetry(PidKind::VertSpeed).error_accum,
        "PID accumulators are preserved across the install"
    );
}

#[test]
fn undefined_channels_emit_neutral_output() {
    let mut ctl = controller(ControlMethod::BankToTurnNoYaw);
    let state = level_state();
    let action = AutopilotAction::default();

    let out = run_updates(&mut ctl, &state, &action, 10);
    assert_eq!(out.stick_back, 0.0);
    assert_eq!(out.stick_right, 0.0);
    assert_eq!(out.rudder_right, 0.0);
}

#[test]
fn yaw_to_turn_default_stabilization_levels_the_bank() {
    let mut ctl = controller(ControlMethod::YawToTurnZeroBank);
    let mut state = level_state();
    state.roll = Angle::from_degrees(20.0);

    let action = AutopilotAction {
        lateral: LateralMode::YawRate(math::AngularSpeed::ZERO),
        ..AutopilotAction::default()
    };

    // Run past the middle-loop gate so the bank regulator fires.
    let out = run_updates(&mut ctl, &state, &action, 30);
    assert!(
        out.stick_right < 0.0,
        "zero-bank stabilization rolls left against the positive bank"
    );
}

#[test]
fn legacy_beta_flag_flips_rudder_sign() {
    let state = level_state();
    let action = AutopilotAction {
        lateral: LateralMode::Beta(Angle::from_degrees(5.0)),
        ..AutopilotAction::default()
    };

    let mut legacy = controller(ControlMethod::YawToTurnNoRoll);
    let legacy_out = run_updates(&mut legacy, &state, &action, 1);

    let mut config = autopilot_config(ControlMethod::YawToTurnNoRoll);
    config.use_legacy_beta = false;
    let pids = load::build_pid_group(&config.pid_group).expect("valid gains");
    let aero = AeroTables::from_config(&support_tables()).expect("valid tables");
    let mut modern = CommonController::new(&config, pids, aero);
    let modern_out = run_updates(&mut modern, &state, &action, 1);

    assert!(
        legacy_out.rudder_right > 0.0 && modern_out.rudder_right < 0.0,
        "the two conventions command opposite-signed rudder: {} vs {}",
        legacy_out.rudder_right,
        modern_out.rudder_right
    );
}
