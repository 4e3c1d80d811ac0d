use std::time::Duration;

use bevy::app::App;
use bevy::time::{self, Time};
use math::{Angle, GeoPoint, Heading, Length, Speed};
use store::{
    ActivePilot, AutopilotConfig, ControlMethod, Curve, CurvePoint, LimitsAndSettings, Meta,
    PidGroupConfig, PilotManagerConfig, RegulatedPilotConfig, SupportTables, Table2d, Table2dRow,
    VehicleConfig,
};

use super::{
    AutopilotSetpoint, DirectInputs, PilotCommand, PilotFamily, PilotKind, PilotManager,
    PilotStatus,
};
use crate::level::vehicle::{ActuatorCommand, EngineState, Kinematics};
use crate::load::{self, Placement, Source};

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
    pid_group.pid_vert_speed.kp = Some(0.003);
    pid_group.pid_vert_speed.ki = Some(0.0008);
    pid_group.pid_vert_speed.max_error_accum = Some(5000.0);
    pid_group.pid_alpha.kp = Some(0.08);
    pid_group.pid_alpha.ki = Some(0.04);
    pid_group.pid_alpha.max_error_accum = Some(10.0);
    pid_group.pid_roll_heading.kp = Some(1.0);
    pid_group.pid_bank_angle.kp = Some(2.0);
    pid_group.pid_roll_rate.kp = Some(0.01);
    pid_group.pid_speed.kp = Some(0.02);

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
        ..SupportTables::default()
    }
}

fn base_file(method: ControlMethod) -> store::File {
    store::File {
        meta: Meta { title: "test vehicle".into(), description: String::new() },
        vehicle: vehicle_config(),
        autopilot: autopilot_config(method),
        support: support_tables(),
        pilot_manager: PilotManagerConfig {
            control_inputs: store::ControlInputsConfig::default(),
            manual_pilot_simple_controls: Some(store::ManualPilotSimpleConfig::default()),
            manual_pilot_augmented_controls: None,
            synthetic_pilot: None,
            hardware_autopilot_bank_to_turn: Some(RegulatedPilotConfig::default()),
            hardware_autopilot_skid_to_turn: None,
            guidance_autopilot_bank_to_turn: None,
            guidance_autopilot_skid_to_turn: None,
            active_pilot: ActivePilot::HardwareAutopilot,
        },
        routes: Vec::new(),
    }
}

fn placement() -> Placement {
    Placement {
        position: GeoPoint::from_degrees(35.0, -117.0, Length::from_meters(1000.0)),
        heading: Heading::NORTH,
        speed: Speed::from_mps(100.0),
        on_ground: false,
    }
}

fn base_world(file: store::File) -> (App, bevy::ecs::entity::Entity) {
    let mut app = App::new();
    app.add_plugins(crate::level::Plug);
    app.init_resource::<Time<time::Virtual>>();

    let entity =
        load::do_load(app.world_mut(), &Source::Parsed(Box::new(file)), placement())
            .expect("valid configuration");

    app.update();
    (app, entity)
}

fn advance_world(app: &mut App, dt: Duration) {
    app.world_mut().resource_mut::<Time<time::Virtual>>().advance_by(dt);
    app.update();
}

fn run_seconds(app: &mut App, seconds: f64, dt: Duration) {
    let steps = (seconds / dt.as_secs_f64()).round() as usize;
    for _ in 0..steps {
        advance_world(app, dt);
    }
}

fn enqueue(app: &mut App, entity: bevy::ecs::entity::Entity, command: PilotCommand) {
    app.world_mut()
        .get_mut::<PilotManager>(entity)
        .expect("vehicle has a pilot manager")
        .enqueue(command);
}

#[test]
fn altitude_hold_step_converges() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    let start_kcas = app.world().get::<Kinematics>(entity).unwrap().kcas;
    let target = Length::from_meters(1100.0);
    enqueue(&mut app, entity, PilotCommand::Autopilot(AutopilotSetpoint::Altitude(target)));
    enqueue(
        &mut app,
        entity,
        PilotCommand::Autopilot(AutopilotSetpoint::RollHeading(Heading::NORTH)),
    );
    enqueue(&mut app, entity, PilotCommand::Autopilot(AutopilotSetpoint::SpeedKcas(start_kcas)));

    // The climb command appears once the outer vertical loop fires.
    run_seconds(&mut app, 2.0, DT);
    let vert_speed = app.world().get::<Kinematics>(entity).unwrap().vert_speed;
    assert!(
        vert_speed > Speed::from_fpm(100.0),
        "climb begins shortly after the step: {vert_speed:?}"
    );

    run_seconds(&mut app, 88.0, DT);

    let state = app.world().get::<Kinematics>(entity).unwrap();
    state
        .position
        .alt
        .assert_near(target, Length::from_feet(5.0))
        .expect("altitude captured at the new target");
    state
        .vert_speed
        .assert_near(Speed::ZERO, Speed::from_fpm(60.0))
        .expect("level at the new altitude");
}

#[test]
fn heading_turn_saturates_bank_and_converges() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    let hold_alt = app.world().get::<Kinematics>(entity).unwrap().position.alt;
    enqueue(&mut app, entity, PilotCommand::Autopilot(AutopilotSetpoint::Altitude(hold_alt)));
    enqueue(
        &mut app,
        entity,
        PilotCommand::Autopilot(AutopilotSetpoint::RollHeading(Heading::EAST)),
    );

    let mut max_roll = Angle::ZERO;
    for _ in 0..6000 {
        advance_world(&mut app, DT);
        let roll = app.world().get::<Kinematics>(entity).unwrap().roll;
        max_roll = max_roll.max(roll.abs());
    }

    assert!(
        max_roll > Angle::from_degrees(50.0),
        "the turn saturates near the bank ceiling: {max_roll:?}"
    );

    let state = app.world().get::<Kinematics>(entity).unwrap();
    state
        .heading
        .assert_near(Heading::EAST, Angle::from_degrees(1.0))
        .expect("rolled out on the commanded heading");
    state
        .roll
        .assert_near(Angle::ZERO, Angle::from_degrees(3.0))
        .expect("wings level after the turn");
}

#[test]
fn waypoint_route_is_flown_and_advanced() {
    let mut file = base_file(ControlMethod::BankToTurnNoYaw);
    file.autopilot.limits_and_settings.bank_angle_max = Angle::from_degrees(45.0);

    let start = placement().position;
    let target = start.offset(Heading::NORTHEAST, Length::from_meters(10000.0));
    file.routes.push(store::RoutePlan {
        name: "leg".into(),
        waypoints: vec![
            store::WaypointPlan {
                position: start,
                speed: store::SpeedSpec::Ktas(200.0),
                max_turn_g: None,
                label: None,
                go_to: None,
                follow_horizontal_track: false,
                follow_vertical_track: false,
                waypoint_on_passing: false,
                id: 0,
            },
            store::WaypointPlan {
                position: target,
                speed: store::SpeedSpec::Ktas(200.0),
                max_turn_g: None,
                label: None,
                go_to: None,
                follow_horizontal_track: false,
                follow_vertical_track: false,
                waypoint_on_passing: false,
                id: 1,
            },
        ],
    });
    file.pilot_manager.hardware_autopilot_bank_to_turn =
        Some(RegulatedPilotConfig { planned_route: Some("leg".into()) });

    let (mut app, entity) = base_world(file);
    let dt = Duration::from_millis(20);

    // Early on: aim heading converges onto the leg bearing.
    run_seconds(&mut app, 30.0, dt);
    let status = app.world().get::<PilotStatus>(entity).unwrap();
    status
        .aim_heading
        .expect("regulated pilot exposes an aim heading")
        .assert_near(Heading::NORTHEAST, Angle::from_degrees(5.0))
        .expect("aiming up the leg");

    run_seconds(&mut app, 120.0, dt);

    let status = app.world().get::<PilotStatus>(entity).unwrap();
    assert_eq!(
        status.current_waypoint_index, None,
        "both waypoints achieved, the route is complete"
    );

    let state = app.world().get::<Kinematics>(entity).unwrap();
    state
        .heading
        .assert_near(Heading::NORTHEAST, Angle::from_degrees(5.0))
        .expect("tracking out along the final leg heading");
    assert!(
        state.position.ground_range(target) < Length::from_nm(4.0),
        "passed close to the final waypoint"
    );
}

#[test]
fn destroyed_behavior_pins_controls() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    run_seconds(&mut app, 1.0, DT);
    enqueue(
        &mut app,
        entity,
        PilotCommand::SetDestroyed { pitch_mod: 0.3, roll_mod: 0.5 },
    );
    advance_world(&mut app, DT);

    let out = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert_eq!(out.throttle_military, 0.0);
    assert_eq!(out.throttle_afterburner, 0.0);
    assert_eq!(out.speed_brake, 1.0);
    // roll bias: 0.3 + 0.3 * (0.5 / 0.8)
    assert!((out.stick_right - 0.4875).abs() < 1e-9, "mapped roll bias: {}", out.stick_right);
    // pitch bias: 0.3 * 0.02
    assert!((out.stick_back - 0.006).abs() < 1e-9, "compressed pitch bias: {}", out.stick_back);

    assert!(app.world().get::<EngineState>(entity).unwrap().shutdown, "engines are killed");

    // Further commands are rejected and the controls stay pinned.
    enqueue(
        &mut app,
        entity,
        PilotCommand::Autopilot(AutopilotSetpoint::Altitude(Length::from_meters(5000.0))),
    );
    enqueue(&mut app, entity, PilotCommand::MakeActive(PilotFamily::Manual));
    run_seconds(&mut app, 2.0, DT);

    let after = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert_eq!(after, out, "control settings hold for the remainder of the simulation");

    let manager = app.world().get::<PilotManager>(entity).unwrap();
    assert_eq!(
        manager.active_kind(),
        PilotKind::HardwareBankToTurn,
        "the active pilot is fixed after destruction"
    );
}

#[test]
fn make_active_switches_families_and_respects_absence() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    {
        let mut manager = app.world_mut().get_mut::<PilotManager>(entity).unwrap();
        assert_eq!(manager.active_kind(), PilotKind::HardwareBankToTurn);

        assert!(manager.make_active(PilotFamily::Manual));
        assert_eq!(manager.active_kind(), PilotKind::ManualSimple);

        assert!(
            !manager.make_active(PilotFamily::GuidanceAutopilot),
            "no guidance pilot configured"
        );
        assert_eq!(manager.active_kind(), PilotKind::ManualSimple);

        assert!(manager.make_active(PilotFamily::HardwareAutopilot));
    }
}

#[test]
fn controls_disabled_output_is_neutral() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    enqueue(
        &mut app,
        entity,
        PilotCommand::Autopilot(AutopilotSetpoint::Altitude(Length::from_meters(2000.0))),
    );
    enqueue(&mut app, entity, PilotCommand::EnableControls(false));
    run_seconds(&mut app, 1.0, DT);

    let out = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert_eq!(out, ActuatorCommand::neutral(), "all outputs driven to neutral");
}

#[test]
fn testing_mode_overrides_all_other_inputs() {
    let (mut app, entity) = base_world(base_file(ControlMethod::BankToTurnNoYaw));

    enqueue(
        &mut app,
        entity,
        PilotCommand::Autopilot(AutopilotSetpoint::Altitude(Length::from_meters(9000.0))),
    );
    let test_values = DirectInputs {
        stick_back: 0.25,
        stick_right: -0.5,
        rudder_right: 0.1,
        throttle_military: 0.7,
        ..DirectInputs::default()
    };
    enqueue(&mut app, entity, PilotCommand::SetTestingControls(Some(test_values)));
    run_seconds(&mut app, 1.0, DT);

    let out = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert_eq!(out.stick_back, 0.25);
    assert_eq!(out.stick_right, -0.5);
    assert_eq!(out.rudder_right, 0.1);
    assert_eq!(out.throttle_military, 0.7);

    // Releasing testing mode returns control to the autopilot.
    enqueue(&mut app, entity, PilotCommand::SetTestingControls(None));
    run_seconds(&mut app, 5.0, DT);
    let out = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert!(out.stick_back != 0.25, "autopilot drives the output again");
}

#[test]
fn manual_pilot_passes_shaped_inputs_through() {
    let mut file = base_file(ControlMethod::BankToTurnNoYaw);
    file.pilot_manager.active_pilot = ActivePilot::ManualPilot;
    // A squared-response pitch curve.
    file.pilot_manager.control_inputs.pitch_control_mapping_table = Some(Curve {
        points: vec![
            CurvePoint { input: -1.0, output: -1.0 },
            CurvePoint { input: -0.5, output: -0.25 },
            CurvePoint { input: 0.0, output: 0.0 },
            CurvePoint { input: 0.5, output: 0.25 },
            CurvePoint { input: 1.0, output: 1.0 },
        ],
    });

    let (mut app, entity) = base_world(file);

    enqueue(
        &mut app,
        entity,
        PilotCommand::ManualControls(super::ManualControlData {
            stick_back: 0.5,
            stick_right: 0.2,
            rudder_right: 0.0,
            throttle_military: 0.8,
            ..super::ManualControlData::default()
        }),
    );
    advance_world(&mut app, DT);

    let out = *app.world().get::<ActuatorCommand>(entity).unwrap();
    assert!((out.stick_back - 0.25).abs() < 1e-9, "pitch input runs through the curve");
    assert!((out.stick_right - 0.2).abs() < 1e-9, "unmapped axes pass through linearly");
    assert!((out.throttle_military - 0.8).abs() < 1e-9);
}

#[test]
fn fly_temp_route_diverts_and_returns() {
    let mut file = base_file(ControlMethod::BankToTurnNoYaw);

    let start = placement().position;
    let plan = |name: &str, bearing: Heading| store::RoutePlan {
        name: name.into(),
        waypoints: vec![store::WaypointPlan {
            position: start.offset(bearing, Length::from_nm(30.0)),
            speed: store::SpeedSpec::Ktas(200.0),
            max_turn_g: None,
            label: None,
            go_to: None,
            follow_horizontal_track: false,
            follow_vertical_track: false,
            waypoint_on_passing: false,
            id: 0,
        }],
    };
    file.routes.push(plan("planned", Heading::NORTH));
    file.pilot_manager.hardware_autopilot_bank_to_turn =
        Some(RegulatedPilotConfig { planned_route: Some("planned".into()) });

    let (mut app, entity) = base_world(file);

    // Divert onto a temp route towards the east.
    let temp_plan = plan("temp", Heading::EAST);
    let temp = crate::level::route::Route::from_plan(&temp_plan).expect("valid temp route");
    enqueue(&mut app, entity, PilotCommand::FlyTempRoute(temp));
    run_seconds(&mut app, 1.0, DT);

    {
        let manager = app.world().get::<PilotManager>(entity).unwrap();
        let regulated = manager.active_pilot().regulated().unwrap();
        assert!(!regulated.is_on_planned_route(), "flying the temp route");
        let status = app.world().get::<PilotStatus>(entity).unwrap();
        status
            .aim_heading
            .expect("aim heading available")
            .assert_near(Heading::EAST, Angle::from_degrees(10.0))
            .expect("aiming at the temp waypoint");
    }

    enqueue(&mut app, entity, PilotCommand::ReturnToPlannedRoute);
    run_seconds(&mut app, 1.0, DT);

    let manager = app.world().get::<PilotManager>(entity).unwrap();
    assert!(
        manager.active_pilot().regulated().unwrap().is_on_planned_route(),
        "back on the planned route"
    );
}
