//! The common controller: a cascaded-PID autopilot shared by every
//! regulated pilot source.

use std::time::Duration;

use math::{Angle, AngularSpeed, GeoPoint, Heading, Length, Speed, TurnDirection};
use store::{ControlMethod, LimitsAndSettings};

use super::route::{Route, RouteSegment, Waypoint, WaypointNavData};
use super::vehicle::{ActuatorCommand, Kinematics, VehicleData};
use crate::pid::{PidGroup, PidKind, PidTelemetry};

pub mod aero;
mod envelope;
mod lateral;
mod speed_channel;
mod vertical;

#[cfg(test)]
mod tests;

/// Lateral channel modes. The stabilizing channel draws from the same set:
/// yaw modes stabilize bank-to-turn vehicles, roll modes stabilize
/// yaw-to-turn vehicles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LateralMode {
    #[default]
    Undefined,
    /// Follow the installed route laterally.
    Waypoint,
    /// Hold a heading.
    Heading(Heading),
    /// Head towards a fixed point.
    Point(GeoPoint),
    /// Hold a roll rate.
    RollRate(AngularSpeed),
    /// Hold a bank angle.
    Bank(Angle),
    /// Roll through a relative angle.
    DeltaRoll(Angle),
    /// Hold a lateral load factor, g.
    YawGLoad(f64),
    /// Hold a yaw rate.
    YawRate(AngularSpeed),
    /// Hold a sideslip angle.
    Beta(Angle),
}

/// Vertical channel modes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum VerticalMode {
    #[default]
    Undefined,
    /// Follow the installed route vertically.
    Waypoint,
    /// Capture and hold an altitude above mean sea level.
    Altitude(Length),
    /// Hold a vertical speed.
    VertSpeed(Speed),
    /// Pitch towards a fixed point.
    Point(GeoPoint),
    /// Hold a normal load factor, g.
    PitchGLoad(f64),
    /// Hold a pitch attitude.
    PitchAng(Angle),
    /// Hold a pitch rate.
    PitchRate(AngularSpeed),
    /// Hold a flight-path angle.
    FltPathAng(Angle),
    /// Pitch through a relative angle.
    DeltaPitch(Angle),
    /// Hold an angle of attack.
    Alpha(Angle),
}

/// Speed channel modes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SpeedMode {
    #[default]
    Undefined,
    /// Hold the speed of the waypoint being flown to.
    Waypoint,
    /// Hold a forward acceleration, g.
    ForwardAccel(f64),
    /// Hold knots calibrated airspeed.
    Kias(f64),
    /// Hold knots true airspeed.
    Ktas(f64),
    /// Hold a Mach number.
    Mach(f64),
    /// Hold a true airspeed.
    Fps(Speed),
}

/// Route references carried by a waypoint-mode action: indices into the
/// owning pilot's route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavRefs {
    /// Waypoint the current leg departs from.
    pub prev: Option<usize>,
    /// Waypoint being flown to; `None` once the route is complete.
    pub curr: Option<usize>,
}

impl NavRefs {
    /// References for the first leg of a route.
    #[must_use]
    pub fn first_leg() -> Self { Self { prev: None, curr: Some(0) } }
}

/// A per-frame command to the common controller: the active mode of each
/// channel plus its setpoint. Immutable once installed; rerouting the
/// vehicle is done by installing a new action.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AutopilotAction {
    pub lateral: LateralMode,
    /// Zero-or-one stabilizing mode; `Undefined` selects the default
    /// stabilization of the control method.
    pub stabilizing: LateralMode,
    pub vertical: VerticalMode,
    pub speed: SpeedMode,
    /// Required by waypoint mode in any channel.
    pub nav: Option<NavRefs>,
}

impl AutopilotAction {
    /// A waypoint-following action in every channel.
    #[must_use]
    pub fn waypoint(nav: NavRefs) -> Self {
        Self {
            lateral: LateralMode::Waypoint,
            stabilizing: LateralMode::Undefined,
            vertical: VerticalMode::Waypoint,
            speed: SpeedMode::Waypoint,
            nav: Some(nav),
        }
    }

    /// Whether any channel is in waypoint mode.
    #[must_use]
    pub fn uses_waypoints(&self) -> bool {
        self.lateral == LateralMode::Waypoint
            || self.vertical == VerticalMode::Waypoint
            || self.speed == SpeedMode::Waypoint
    }
}

/// Waypoint references of an action resolved against the pilot's route.
pub(crate) struct ResolvedNav<'a> {
    pub prev: Option<&'a Waypoint>,
    /// `None` when the route has been flown to completion.
    pub curr: Option<&'a Waypoint>,
    pub next: Option<&'a Waypoint>,
    pub curr_segment: Option<&'a RouteSegment>,
    pub next_segment: Option<&'a RouteSegment>,
}

/// Collaborators of one controller update, injected by the caller.
pub struct ControllerCtx<'a> {
    pub state: &'a Kinematics,
    pub vehicle: &'a VehicleData,
    pub action: &'a AutopilotAction,
    pub route: Option<&'a Route>,
    pub dt: Duration,
}

impl ControllerCtx<'_> {
    fn resolve_nav(&self) -> Option<ResolvedNav<'_>> {
        let refs = self.action.nav?;
        let route = self.route?;
        let prev = refs.prev.and_then(|index| route.waypoint(index));
        let curr = refs.curr.and_then(|index| route.waypoint(index));
        let next =
            refs.curr.and_then(|index| route.next_of(index)).and_then(|index| route.waypoint(index));
        let curr_segment = refs.prev.and_then(|index| route.segment_from(index));
        let next_segment = refs.curr.and_then(|index| route.segment_from(index));
        Some(ResolvedNav { prev, curr, next, curr_segment, next_segment })
    }

    fn dt_sec(&self) -> f64 { self.dt.as_secs_f64() }
}

/// Inner/middle/outer execution gate of one channel.
#[derive(Debug, Clone, Copy)]
struct LoopGate {
    middle_factor: u8,
    outer_factor: u8,
    middle_count: u8,
    outer_count: u8,
    execute_middle: bool,
    execute_outer: bool,
}

impl LoopGate {
    fn new(middle_factor: u8, outer_factor: u8) -> Self {
        Self {
            middle_factor,
            outer_factor,
            middle_count: 0,
            outer_count: 0,
            execute_middle: false,
            execute_outer: false,
        }
    }

    /// Advances the modulo counters for one inner-loop pass.
    fn advance(&mut self) {
        self.execute_middle = false;
        self.middle_count += 1;
        if self.middle_factor <= self.middle_count {
            self.middle_count = 0;
            self.execute_middle = true;
        }

        self.execute_outer = false;
        if self.middle_count == 0 {
            self.outer_count += 1;
            if self.outer_factor <= self.outer_count {
                self.outer_count = 0;
                self.execute_outer = true;
            }
        }
    }

    fn reset(&mut self) {
        self.middle_count = 0;
        self.outer_count = 0;
        self.execute_middle = false;
        self.execute_outer = false;
    }
}

/// Execution state of one channel, exposed for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLoopState {
    NotExecutingOuter,
    NotExecutingMiddle,
    ExecutingInnerOnly,
    ExecutingMiddleAndInner,
    ExecutingOuterMiddleAndInner,
}

impl LoopGate {
    fn state(&self) -> ChannelLoopState {
        match (self.execute_outer, self.execute_middle) {
            (true, true) => ChannelLoopState::ExecutingOuterMiddleAndInner,
            (false, true) => ChannelLoopState::ExecutingMiddleAndInner,
            (false, false) => ChannelLoopState::ExecutingInnerOnly,
            // Outer only fires together with middle by construction.
            (true, false) => ChannelLoopState::NotExecutingMiddle,
        }
    }
}

/// The channels a [`LoopGate`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Lateral,
    Vertical,
    Speed,
}

/// Cascaded PID flight controller.
///
/// Translates the installed [`AutopilotAction`] plus the current
/// [`Kinematics`] into an [`ActuatorCommand`], obeying the current
/// limits-and-settings envelope. Never fails: degenerate conditions
/// collapse to neutral or latched output.
#[derive(Debug, Clone)]
pub struct CommonController {
    control_method: ControlMethod,
    use_legacy_beta: bool,
    use_simple_yaw_damper: bool,

    pids: PidGroup,

    default_limits: LimitsAndSettings,
    current_limits: LimitsAndSettings,

    aero: aero::AeroTables,

    lateral_gate: LoopGate,
    vertical_gate: LoopGate,
    speed_gate: LoopGate,

    // Latched mid-cascade commands, held between middle/outer executions.
    last_commanded_vert_rate: Speed,
    last_commanded_alpha: Angle,
    last_commanded_yaw_rate: AngularSpeed,
    last_commanded_beta: Angle,
    last_commanded_bank: Angle,
    last_commanded_roll_rate: AngularSpeed,

    // Envelope recomputed at the start of every update.
    limited_beta: Angle,
    limited_min_alpha: Angle,
    limited_max_alpha: Angle,
    g_bias: f64,
    g_bias_alpha: Option<Angle>,

    // Relative-angle integrators for the delta modes.
    integrated_delta_yaw: Angle,
    integrated_delta_pitch: Angle,
    integrated_delta_roll: Angle,

    nav_data: WaypointNavData,
    achieved_waypoint: bool,
    aim_heading: Heading,
    turning: bool,
    turn_direction: Option<TurnDirection>,

    taxi_mode: bool,
    min_taxi_turn_radius: Length,
    desired_taxi_turn_radius: Length,

    controls: ActuatorCommand,
    combined_wheel_braking: f64,
    wheel_braking_left: f64,
    wheel_braking_right: f64,
}

impl CommonController {
    /// Builds a controller from validated configuration.
    #[must_use]
    pub fn new(
        config: &store::AutopilotConfig,
        pids: PidGroup,
        aero: aero::AeroTables,
    ) -> Self {
        let limits = config.limits_and_settings.clone();
        Self {
            control_method: config.control_method,
            use_legacy_beta: config.use_legacy_beta,
            use_simple_yaw_damper: config.use_simple_yaw_damper,
            pids,
            default_limits: limits.clone(),
            current_limits: limits,
            aero,
            lateral_gate: LoopGate::new(
                config.lateral_middle_loop_rate_factor,
                config.lateral_outer_loop_rate_factor,
            ),
            vertical_gate: LoopGate::new(
                config.vertical_middle_loop_rate_factor,
                config.vertical_outer_loop_rate_factor,
            ),
            speed_gate: LoopGate::new(
                config.speed_middle_loop_rate_factor,
                config.speed_outer_loop_rate_factor,
            ),
            last_commanded_vert_rate: Speed::ZERO,
            last_commanded_alpha: Angle::ZERO,
            last_commanded_yaw_rate: AngularSpeed::ZERO,
            last_commanded_beta: Angle::ZERO,
            last_commanded_bank: Angle::ZERO,
            last_commanded_roll_rate: AngularSpeed::ZERO,
            limited_beta: Angle::ZERO,
            limited_min_alpha: Angle::ZERO,
            limited_max_alpha: Angle::ZERO,
            g_bias: 1.0,
            g_bias_alpha: None,
            integrated_delta_yaw: Angle::ZERO,
            integrated_delta_pitch: Angle::ZERO,
            integrated_delta_roll: Angle::ZERO,
            nav_data: WaypointNavData::default(),
            achieved_waypoint: false,
            aim_heading: Heading::NORTH,
            turning: false,
            turn_direction: None,
            taxi_mode: false,
            min_taxi_turn_radius: config.min_taxi_turn_radius,
            desired_taxi_turn_radius: config.min_taxi_turn_radius,
            controls: ActuatorCommand::default(),
            combined_wheel_braking: 0.0,
            wheel_braking_left: 0.0,
            wheel_braking_right: 0.0,
        }
    }

    /// One controller pass: action + state in, clamped actuator vector out.
    pub fn update(&mut self, ctx: &ControllerCtx<'_>) -> ActuatorCommand {
        self.accumulate_angle_deltas(ctx.state, ctx.dt);
        envelope::calc_alpha_beta_g_limits(self, ctx);

        self.lateral_gate.advance();
        self.vertical_gate.advance();
        self.speed_gate.advance();

        self.pids.set_controlling_value(ctx.state.dynamic_pressure_psf);

        self.combined_wheel_braking = 0.0;
        self.wheel_braking_left = 0.0;
        self.wheel_braking_right = 0.0;

        if self.control_method.is_bank_to_turn() {
            self.update_bank_to_turn(ctx);
        } else {
            self.update_yaw_to_turn(ctx);
        }

        // Merge differential braking over the combined braking floor.
        if self.wheel_braking_left > 0.01 || self.wheel_braking_right > 0.01 {
            self.controls.wheel_brake_left =
                self.wheel_braking_left + 0.8 * self.combined_wheel_braking;
            self.controls.wheel_brake_right =
                self.wheel_braking_right + 0.8 * self.combined_wheel_braking;
        } else {
            self.controls.wheel_brake_left = self.combined_wheel_braking;
            self.controls.wheel_brake_right = self.combined_wheel_braking;
        }

        self.controls.enforce_limits();
        self.controls
    }

    fn update_bank_to_turn(&mut self, ctx: &ControllerCtx<'_>) {
        self.process_lateral_channels_bank_to_turn(ctx);
        self.process_vertical_channel(ctx);
        self.process_speed_channel(ctx);
    }

    fn update_yaw_to_turn(&mut self, ctx: &ControllerCtx<'_>) {
        self.process_lateral_channels_yaw_to_turn(ctx);
        self.process_vertical_channel(ctx);
        self.process_speed_channel(ctx);
    }

    /// Integrates body rates into the delta-angle accumulators used by the
    /// delta-yaw/pitch/roll modes.
    fn accumulate_angle_deltas(&mut self, state: &Kinematics, dt: Duration) {
        self.integrated_delta_yaw += state.yaw_rate * dt;
        self.integrated_delta_pitch += state.pitch_rate * dt;
        self.integrated_delta_roll += state.roll_rate * dt;
    }

    /// Installs a new action.
    ///
    /// Achieving a waypoint keeps the turn latched through the swap; any
    /// other swap clears the turning state. The delta-angle integrators
    /// restart; PID accumulators are preserved.
    pub fn install_action(&mut self) {
        if self.achieved_waypoint {
            self.achieved_waypoint = false;
        } else {
            self.turning = false;
            self.nav_data.execute_turn = false;
        }
        self.reset_all_delta_angles();
    }

    pub fn reset_delta_yaw_angle(&mut self) { self.integrated_delta_yaw = Angle::ZERO; }

    pub fn reset_delta_pitch_angle(&mut self) { self.integrated_delta_pitch = Angle::ZERO; }

    pub fn reset_delta_roll_angle(&mut self) { self.integrated_delta_roll = Angle::ZERO; }

    pub fn reset_lateral_delta_angles(&mut self) {
        self.reset_delta_yaw_angle();
        self.reset_delta_roll_angle();
    }

    pub fn reset_all_delta_angles(&mut self) {
        self.reset_delta_yaw_angle();
        self.reset_delta_pitch_angle();
        self.reset_delta_roll_angle();
    }

    /// Zeroes every PID accumulator, derivative memory and loop counter.
    /// Used when a new action demands a clean start, when testing mode
    /// engages, and on destruction.
    pub fn reset_accumulated_pid_data(&mut self) {
        self.pids.reset_all();
        self.lateral_gate.reset();
        self.vertical_gate.reset();
        self.speed_gate.reset();
        self.last_commanded_vert_rate = Speed::ZERO;
        self.last_commanded_alpha = Angle::ZERO;
        self.last_commanded_yaw_rate = AngularSpeed::ZERO;
        self.last_commanded_beta = Angle::ZERO;
        self.last_commanded_bank = Angle::ZERO;
        self.last_commanded_roll_rate = AngularSpeed::ZERO;
    }

    // Limits-and-settings ------------------------------------------------

    /// Restores the live limits to the configuration defaults.
    pub fn revert_limits_and_settings_to_defaults(&mut self) {
        self.current_limits = self.default_limits.clone();
    }

    #[must_use]
    pub fn current_limits(&self) -> &LimitsAndSettings { &self.current_limits }

    #[must_use]
    pub fn default_limits(&self) -> &LimitsAndSettings { &self.default_limits }

    pub fn set_current_limits(&mut self, limits: LimitsAndSettings) {
        self.current_limits = limits;
    }

    pub fn current_limits_mut(&mut self) -> &mut LimitsAndSettings { &mut self.current_limits }

    // Taxi ---------------------------------------------------------------

    /// Engages taxi mode: the lateral channel steers the nose wheel and
    /// the speed channel may use the wheel brakes.
    pub fn set_taxi_mode(&mut self, active: bool) { self.taxi_mode = active; }

    #[must_use]
    pub fn taxi_mode(&self) -> bool { self.taxi_mode }

    /// Requests a taxi turn radius, floored at the configured minimum.
    pub fn set_desired_taxi_radius(&mut self, radius: Length) {
        if radius <= self.min_taxi_turn_radius {
            bevy::log::warn!(
                "Requested taxi radius {radius:?} below minimum {:?}; using minimum",
                self.min_taxi_turn_radius
            );
            self.desired_taxi_turn_radius = self.min_taxi_turn_radius;
        } else {
            self.desired_taxi_turn_radius = radius;
        }
    }

    // Accessors ----------------------------------------------------------

    #[must_use]
    pub fn control_method(&self) -> ControlMethod { self.control_method }

    #[must_use]
    pub fn use_legacy_beta(&self) -> bool { self.use_legacy_beta }

    #[must_use]
    pub fn use_simple_yaw_damper(&self) -> bool { self.use_simple_yaw_damper }

    #[must_use]
    pub fn waypoint_achieved(&self) -> bool { self.achieved_waypoint }

    #[must_use]
    pub fn nav_data(&self) -> &WaypointNavData { &self.nav_data }

    #[must_use]
    pub fn aim_heading(&self) -> Heading { self.aim_heading }

    #[must_use]
    pub fn turning(&self) -> bool { self.turning }

    #[must_use]
    pub fn channel_loop_state(&self, channel: Channel) -> ChannelLoopState {
        match channel {
            Channel::Lateral => self.lateral_gate.state(),
            Channel::Vertical => self.vertical_gate.state(),
            Channel::Speed => self.speed_gate.state(),
        }
    }

    #[must_use]
    pub fn pid_telemetry(&self, kind: PidKind) -> PidTelemetry { self.pids.get(kind).telemetry() }

    #[must_use]
    pub fn pids(&self) -> &PidGroup { &self.pids }

    #[must_use]
    pub fn pids_mut(&mut self) -> &mut PidGroup { &mut self.pids }

    #[must_use]
    pub fn aero(&self) -> &aero::AeroTables { &self.aero }

    #[must_use]
    pub fn limited_max_alpha(&self) -> Angle { self.limited_max_alpha }

    #[must_use]
    pub fn limited_min_alpha(&self) -> Angle { self.limited_min_alpha }

    #[must_use]
    pub fn limited_beta(&self) -> Angle { self.limited_beta }

    #[must_use]
    pub fn last_commanded_bank(&self) -> Angle { self.last_commanded_bank }

    #[must_use]
    pub fn last_commanded_vert_rate(&self) -> Speed { self.last_commanded_vert_rate }

    #[must_use]
    pub fn last_commanded_alpha(&self) -> Angle { self.last_commanded_alpha }
}
