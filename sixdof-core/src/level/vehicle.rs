//! Vehicle state, actuator output and the point-mass response model.

use bevy::app::{self, App, Plugin};
use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use bevy::ecs::message::Message;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{EntityCommand, Query, Res};
use bevy::ecs::world::EntityWorldMut;
use bevy::time::{self, Time};
use math::{
    Angle, AngularSpeed, GeoPoint, Heading, Length, STANDARD_GRAVITY_FPS2, Speed, atmosphere,
};

use super::SystemSets;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.add_message::<SpawnMessage>();
        app.add_systems(
            app::Update,
            vehicle_response_system.in_set(SystemSets::ExecuteEnviron),
        );
    }
}

/// Read-only kinematic snapshot consumed by the flight-control core.
///
/// The core treats this as opaque input; in this crate the response model
/// produces it, in a larger simulation any kinematics source may.
#[derive(Debug, Clone, Component, serde::Serialize, serde::Deserialize)]
pub struct Kinematics {
    /// Geodetic position.
    pub position: GeoPoint,
    /// True heading.
    pub heading: Heading,
    /// Pitch attitude.
    pub pitch: Angle,
    /// Bank angle, positive right wing down.
    pub roll: Angle,
    /// Angle of attack.
    pub alpha: Angle,
    /// Sideslip angle.
    pub beta: Angle,
    /// Rate of change of alpha.
    pub alpha_dot: AngularSpeed,
    /// Rate of change of beta.
    pub beta_dot: AngularSpeed,
    /// Body roll rate.
    pub roll_rate: AngularSpeed,
    /// Body pitch rate.
    pub pitch_rate: AngularSpeed,
    /// Body yaw rate.
    pub yaw_rate: AngularSpeed,
    /// True airspeed.
    pub speed: Speed,
    /// Vertical speed, positive up.
    pub vert_speed: Speed,
    /// Mach number.
    pub mach: f64,
    /// Knots true airspeed.
    pub ktas: f64,
    /// Knots calibrated airspeed.
    pub kcas: f64,
    /// Dynamic pressure, lb/ft^2.
    pub dynamic_pressure_psf: f64,
    /// Longitudinal load factor, g.
    pub nx: f64,
    /// Lateral load factor, g.
    pub ny: f64,
    /// Normal load factor, g.
    pub nz: f64,
    /// Flight-path angle.
    pub flight_path_angle: Angle,
    /// Whether the vehicle is rolling on its gear.
    pub on_ground: bool,
}

impl Kinematics {
    /// Straight-and-level state at the given position, heading and speed.
    #[must_use]
    pub fn level_flight(position: GeoPoint, heading: Heading, speed: Speed) -> Self {
        let mut state = Self {
            position,
            heading,
            pitch: Angle::ZERO,
            roll: Angle::ZERO,
            alpha: Angle::ZERO,
            beta: Angle::ZERO,
            alpha_dot: AngularSpeed::ZERO,
            beta_dot: AngularSpeed::ZERO,
            roll_rate: AngularSpeed::ZERO,
            pitch_rate: AngularSpeed::ZERO,
            yaw_rate: AngularSpeed::ZERO,
            speed,
            vert_speed: Speed::ZERO,
            mach: 0.0,
            ktas: 0.0,
            kcas: 0.0,
            dynamic_pressure_psf: 0.0,
            nx: 0.0,
            ny: 0.0,
            nz: 1.0,
            flight_path_angle: Angle::ZERO,
            on_ground: false,
        };
        state.refresh_air_data();
        state
    }

    /// Recomputes mach/ktas/kcas/dynamic pressure from position and speed.
    pub fn refresh_air_data(&mut self) {
        let alt = self.position.alt;
        self.mach = atmosphere::mach_from_fps(alt, self.speed);
        self.ktas = self.speed.into_knots();
        self.kcas = atmosphere::kcas_from_fps(alt, self.speed);
        self.dynamic_pressure_psf = atmosphere::dynamic_pressure_psf(alt, self.speed);
    }
}

/// Normalized actuator command vector emitted by the flight-control core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Component, serde::Serialize, serde::Deserialize)]
pub struct ActuatorCommand {
    /// Pitch control, positive aft, [-1, 1].
    pub stick_back: f64,
    /// Roll control, positive right, [-1, 1].
    pub stick_right: f64,
    /// Yaw control, positive right, [-1, 1].
    pub rudder_right: f64,
    /// Military throttle, [0, 1].
    pub throttle_military: f64,
    /// Afterburner throttle, [0, 1].
    pub throttle_afterburner: f64,
    /// Thrust-vector yaw, [-1, 1].
    pub thrust_vector_yaw: f64,
    /// Thrust-vector pitch, [-1, 1].
    pub thrust_vector_pitch: f64,
    /// Thrust-vector roll, [-1, 1].
    pub thrust_vector_roll: f64,
    /// Speed brake deployment, [0, 1].
    pub speed_brake: f64,
    /// Nose-wheel steering, positive right, [-1, 1].
    pub nose_wheel_steering: f64,
    /// Whether nose-wheel steering is engaged.
    pub nws_enabled: bool,
    /// Left wheel brake, [0, 1].
    pub wheel_brake_left: f64,
    /// Right wheel brake, [0, 1].
    pub wheel_brake_right: f64,
}

impl ActuatorCommand {
    /// Clamps every channel to its declared bound.
    pub fn enforce_limits(&mut self) {
        self.stick_back = self.stick_back.clamp(-1.0, 1.0);
        self.stick_right = self.stick_right.clamp(-1.0, 1.0);
        self.rudder_right = self.rudder_right.clamp(-1.0, 1.0);
        self.throttle_military = self.throttle_military.clamp(0.0, 1.0);
        self.throttle_afterburner = self.throttle_afterburner.clamp(0.0, 1.0);
        self.thrust_vector_yaw = self.thrust_vector_yaw.clamp(-1.0, 1.0);
        self.thrust_vector_pitch = self.thrust_vector_pitch.clamp(-1.0, 1.0);
        self.thrust_vector_roll = self.thrust_vector_roll.clamp(-1.0, 1.0);
        self.speed_brake = self.speed_brake.clamp(0.0, 1.0);
        self.nose_wheel_steering = self.nose_wheel_steering.clamp(-1.0, 1.0);
        self.wheel_brake_left = self.wheel_brake_left.clamp(0.0, 1.0);
        self.wheel_brake_right = self.wheel_brake_right.clamp(0.0, 1.0);
    }

    /// Whether every channel already satisfies its bound.
    #[must_use]
    pub fn within_limits(&self) -> bool {
        let mut clamped = *self;
        clamped.enforce_limits();
        clamped == *self
    }

    /// Neutral controls: centered stick and rudder, idle throttle,
    /// brakes held.
    #[must_use]
    pub fn neutral() -> Self { Self::default() }
}

/// Physical vehicle description backing the throttle-bias computation
/// and the response model.
#[derive(Debug, Clone, Component)]
pub struct VehicleData {
    /// Vehicle mass, pounds.
    pub mass_lbm: f64,
    /// Reference wing area, ft^2.
    pub wing_area_ft2: f64,
    /// Equivalent flat-plate drag area, ft^2.
    pub flat_plate_area_ft2: f64,
    /// Maximum military-power thrust, pounds.
    pub max_thrust_lbs: f64,
    /// Idle thrust, pounds.
    pub min_thrust_lbs: f64,
    /// Additional thrust at full afterburner, pounds.
    pub afterburner_thrust_lbs: f64,
}

impl VehicleData {
    #[must_use]
    pub fn from_config(config: &store::VehicleConfig) -> Self {
        Self {
            mass_lbm: config.mass_lbm,
            wing_area_ft2: config.wing_area_ft2,
            flat_plate_area_ft2: config.flat_plate_area_ft2,
            max_thrust_lbs: config.max_thrust_lbs,
            min_thrust_lbs: config.min_thrust_lbs,
            afterburner_thrust_lbs: config.afterburner_thrust_lbs,
        }
    }

    #[must_use]
    pub fn mass_slugs(&self) -> f64 { self.mass_lbm / STANDARD_GRAVITY_FPS2 }

    /// Drag at the given dynamic pressure and speed-brake deployment.
    #[must_use]
    pub fn drag_lbs(&self, dynamic_pressure_psf: f64, speed_brake: f64, brake_factor: f64) -> f64 {
        dynamic_pressure_psf * self.flat_plate_area_ft2 * (1.0 + speed_brake * brake_factor)
    }

    /// Thrust at the given throttle positions.
    #[must_use]
    pub fn thrust_lbs(&self, military: f64, afterburner: f64) -> f64 {
        self.min_thrust_lbs
            + military * (self.max_thrust_lbs - self.min_thrust_lbs)
            + afterburner * self.afterburner_thrust_lbs
    }

    /// Largest thrust the engines can produce.
    #[must_use]
    pub fn max_potential_thrust_lbs(&self) -> f64 {
        self.max_thrust_lbs + self.afterburner_thrust_lbs
    }

    /// Smallest thrust the engines can produce.
    #[must_use]
    pub fn min_potential_thrust_lbs(&self) -> f64 { self.min_thrust_lbs }
}

/// First-order control-response coefficients of the point-mass model.
#[derive(Debug, Clone, Component)]
pub struct ResponseModel(pub store::ResponseConfig);

/// Marks a vehicle whose engines have been shut down.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct EngineState {
    /// When true, thrust is pinned to zero regardless of throttle.
    pub shutdown: bool,
}

pub struct SpawnCommand {
    pub kinematics: Kinematics,
    pub data: VehicleData,
    pub response: ResponseModel,
}

impl EntityCommand for SpawnCommand {
    fn apply(self, mut entity: EntityWorldMut) {
        entity.insert((
            self.kinematics,
            self.data,
            self.response,
            ActuatorCommand::default(),
            EngineState::default(),
        ));
        let entity_id = entity.id();
        entity.world_scope(|world| world.write_message(SpawnMessage(entity_id)));
    }
}

/// Sent when a vehicle entity is spawned.
#[derive(Message)]
pub struct SpawnMessage(pub Entity);

/// Advances vehicle kinematics in response to the actuator commands.
///
/// Point-mass with first-order control responses. The sign conventions
/// match the legacy-beta wiring: positive rudder produces positive beta
/// and a positive (nose-right) yaw rate.
fn vehicle_response_system(
    time: Res<Time<time::Virtual>>,
    mut query: Query<(
        &ActuatorCommand,
        &VehicleData,
        &ResponseModel,
        &EngineState,
        &mut Kinematics,
    )>,
) {
    if time.is_paused() {
        return;
    }
    let dt = f64::from(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    query.iter_mut().for_each(|(controls, data, response, engine, mut state)| {
        let model = &response.0;
        let g0 = STANDARD_GRAVITY_FPS2;

        // First-order control responses.
        let blend = |tau: f64| (dt / tau).min(1.0);

        let alpha_target = Angle::from_degrees(controls.stick_back * model.alpha_per_stick_deg);
        let alpha_before = state.alpha;
        state.alpha = state.alpha + (alpha_target - state.alpha) * blend(model.alpha_tau_sec);
        state.alpha_dot = (state.alpha - alpha_before) / time.delta();

        let rate_target = model.roll_rate_per_stick * controls.stick_right;
        state.roll_rate =
            state.roll_rate + (rate_target - state.roll_rate) * blend(model.roll_tau_sec);

        let beta_target = Angle::from_degrees(controls.rudder_right * model.beta_per_rudder_deg);
        let beta_before = state.beta;
        state.beta = state.beta + (beta_target - state.beta) * blend(model.beta_tau_sec);
        state.beta_dot = (state.beta - beta_before) / time.delta();

        // Load factors from the linear aero response.
        state.nz = state.alpha.into_degrees() * model.nz_per_alpha_deg;
        state.ny = state.beta.into_degrees() * model.ny_per_beta_deg;

        // Longitudinal dynamics.
        let thrust = if engine.shutdown {
            0.0
        } else {
            data.thrust_lbs(controls.throttle_military, controls.throttle_afterburner)
        };
        let drag = data.drag_lbs(
            state.dynamic_pressure_psf,
            controls.speed_brake,
            model.speed_brake_drag_factor,
        );
        let mut forward_accel_fps2 = (thrust - drag) / data.mass_slugs();
        if state.on_ground {
            let braking = controls.wheel_brake_left.midpoint(controls.wheel_brake_right);
            forward_accel_fps2 -= braking * model.wheel_brake_fps2;
        }
        state.nx = forward_accel_fps2 / g0;
        state.speed =
            (state.speed + math::Accel::from_fps2(forward_accel_fps2) * time.delta())
                .max(Speed::ZERO);

        if state.on_ground {
            // Ground roll: nose-wheel steering yaws the vehicle, fading
            // out as ground speed approaches zero.
            let speed_gain = (state.speed.into_fps() / 1.0).clamp(0.0, 1.0);
            let steer_rate =
                model.nws_yaw_rate_per_cmd * controls.nose_wheel_steering * speed_gain;
            state.yaw_rate = steer_rate;
            state.heading += steer_rate * time.delta();
            state.vert_speed = Speed::ZERO;
            state.roll = Angle::ZERO;
            state.pitch = Angle::ZERO;
        } else {
            // Bank integrates roll rate.
            state.roll = (state.roll + state.roll_rate * time.delta()).normalized();

            // Vertical dynamics from the normal load factor.
            let lift_vertical_g = state.nz * state.roll.cos();
            let vert_accel_fps2 = g0 * (lift_vertical_g - 1.0);
            state.vert_speed += math::Accel::from_fps2(vert_accel_fps2) * time.delta();

            // Turn dynamics: banked lift plus sideforce.
            let speed_fps = state.speed.into_fps().max(1.0);
            let turn_rate_rps = g0 * (state.nz * state.roll.sin() + state.ny) / speed_fps;
            state.yaw_rate = AngularSpeed::from_radians_per_sec(turn_rate_rps);
            let yaw_delta = state.yaw_rate * time.delta();
            state.heading += yaw_delta;

            let pitch_before = state.pitch;
            state.flight_path_angle = Angle::asin_clamped(
                state.vert_speed.into_fps() / state.speed.into_fps().max(1.0),
            );
            state.pitch = state.flight_path_angle + state.alpha;
            state.pitch_rate = (state.pitch - pitch_before) / time.delta();
        }

        // Translate over the earth.
        let ground_distance = state.speed * time.delta();
        state.position = state.position.offset(state.heading, ground_distance);
        let vert_delta = state.vert_speed * time.delta();
        state.position.alt += vert_delta;

        state.refresh_air_data();
    });
}
