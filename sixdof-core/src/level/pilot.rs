//! Pilot sources and the manager that arbitrates between them.
//!
//! The manager owns every configured source and exposes exactly one as
//! active. Commands enqueued during a step are applied, in call order, at
//! the start of the next update; only the last setpoint for each mode
//! wins.

use bevy::app::{self, App, Plugin};
use bevy::ecs::component::Component;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Query, Res};
use bevy::time::{self, Time};
use math::{Angle, AngularSpeed, Heading, Length, Speed};
use rand::Rng;
use store::LimitsAndSettings;

use super::SystemSets;
use super::autopilot::{
    AutopilotAction, CommonController, LateralMode, NavRefs, SpeedMode, VerticalMode,
    aero::Lookup1,
};
use super::route::Route;
use super::vehicle::{ActuatorCommand, EngineState, Kinematics, VehicleData};

#[cfg(test)]
mod tests;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.add_systems(app::Update, pilot_update_system.in_set(SystemSets::Aviate));
        app.add_systems(app::Update, reconcile_status_system.in_set(SystemSets::ReconcileForRead));
    }
}

/// The source families a vehicle can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum PilotFamily {
    Manual,
    Synthetic,
    HardwareAutopilot,
    GuidanceAutopilot,
}

/// Concrete pilot kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum PilotKind {
    ManualSimple,
    ManualAugmented,
    Synthetic,
    HardwareBankToTurn,
    HardwareSkidToTurn,
    GuidanceBankToTurn,
    GuidanceSkidToTurn,
}

impl PilotKind {
    #[must_use]
    pub fn family(self) -> PilotFamily {
        match self {
            Self::ManualSimple | Self::ManualAugmented => PilotFamily::Manual,
            Self::Synthetic => PilotFamily::Synthetic,
            Self::HardwareBankToTurn | Self::HardwareSkidToTurn => PilotFamily::HardwareAutopilot,
            Self::GuidanceBankToTurn | Self::GuidanceSkidToTurn => PilotFamily::GuidanceAutopilot,
        }
    }
}

/// Raw control-input values of a pilot station.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectInputs {
    pub stick_back: f64,
    pub stick_right: f64,
    pub rudder_right: f64,
    pub throttle_military: f64,
    pub throttle_afterburner: f64,
    pub speed_brake: f64,
    pub wheel_brake_left: f64,
    pub wheel_brake_right: f64,
    pub nws_enabled: bool,
}

impl DirectInputs {
    fn into_actuators(self) -> ActuatorCommand {
        ActuatorCommand {
            stick_back: self.stick_back,
            stick_right: self.stick_right,
            rudder_right: self.rudder_right,
            throttle_military: self.throttle_military,
            throttle_afterburner: self.throttle_afterburner,
            speed_brake: self.speed_brake,
            nose_wheel_steering: if self.nws_enabled { self.rudder_right } else { 0.0 },
            nws_enabled: self.nws_enabled,
            wheel_brake_left: self.wheel_brake_left,
            wheel_brake_right: self.wheel_brake_right,
            ..ActuatorCommand::default()
        }
    }
}

/// Non-linear shaping of manual inputs.
#[derive(Debug, Clone, Default)]
pub struct InputShaping {
    pitch: Option<Lookup1>,
    roll: Option<Lookup1>,
    yaw: Option<Lookup1>,
    pitch_trim_factor: f64,
    roll_trim_factor: f64,
    yaw_trim_factor: f64,
}

impl InputShaping {
    pub(crate) fn from_config(
        config: &store::ControlInputsConfig,
    ) -> Result<Self, super::autopilot::aero::SupportTableError> {
        let curve = |curve: &Option<store::Curve>, name| match curve {
            Some(curve) => Lookup1::from_curve(curve, name),
            None => Ok(None),
        };
        Ok(Self {
            pitch: curve(&config.pitch_control_mapping_table, "pitch_control_mapping_table")?,
            roll: curve(&config.roll_control_mapping_table, "roll_control_mapping_table")?,
            yaw: curve(&config.yaw_control_mapping_table, "yaw_control_mapping_table")?,
            pitch_trim_factor: config.pitch_trim_factor,
            roll_trim_factor: config.roll_trim_factor,
            yaw_trim_factor: config.yaw_trim_factor,
        })
    }

    fn shape(curve: Option<&Lookup1>, input: f64) -> f64 {
        match curve {
            Some(curve) => curve.sample(input),
            None => input,
        }
    }
}

/// Trim offsets accumulated from the trim switches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrimState {
    pub nose_up: f64,
    pub roll_right: f64,
    pub yaw_right: f64,
}

/// State shared by every pilot kind.
#[derive(Debug, Clone, Default)]
pub struct PilotCommon {
    /// Latest control-input values from the station.
    pub input: DirectInputs,
    /// Trim offsets added to the shaped inputs.
    pub trim: TrimState,
    /// Whether this source drives through the common controller.
    pub autopilot_enabled: bool,
    /// Testing override: when set, these values drive the actuators
    /// regardless of any other input.
    pub testing: Option<DirectInputs>,
    /// External-direct override, claimed by `TakeExternalDirectControl`.
    pub external_direct: Option<DirectInputs>,
}

/// A regulated flight-control stack: a common controller, the installed
/// action, and the routes it may fly. The pilot source owns its routes;
/// transferring a route transfers ownership.
#[derive(Debug, Clone)]
pub struct RegulatedPilot {
    pub controller: CommonController,
    action: AutopilotAction,
    temp_action: Option<AutopilotAction>,
    planned_route: Option<Route>,
    temp_route: Option<Route>,
    planned_refs: NavRefs,
    temp_refs: NavRefs,
}

impl RegulatedPilot {
    #[must_use]
    pub fn new(controller: CommonController) -> Self {
        Self {
            controller,
            action: AutopilotAction::default(),
            temp_action: None,
            planned_route: None,
            temp_route: None,
            planned_refs: NavRefs::first_leg(),
            temp_refs: NavRefs::first_leg(),
        }
    }

    /// Whether the pilot is flying its planned route (no temp diversion).
    #[must_use]
    pub fn is_on_planned_route(&self) -> bool { self.temp_action.is_none() }

    #[must_use]
    pub fn current_action(&self) -> &AutopilotAction {
        self.temp_action.as_ref().unwrap_or(&self.action)
    }

    fn current_action_mut(&mut self) -> &mut AutopilotAction {
        self.temp_action.as_mut().unwrap_or(&mut self.action)
    }

    #[must_use]
    pub fn current_route(&self) -> Option<&Route> {
        if self.temp_action.is_some() {
            self.temp_route.as_ref()
        } else {
            self.planned_route.as_ref()
        }
    }

    #[must_use]
    pub fn current_waypoint_index(&self) -> Option<usize> {
        if self.temp_action.is_some() { self.temp_refs.curr } else { self.planned_refs.curr }
    }

    /// Installs a route as the planned route and flies it from the start.
    pub fn set_planned_route(&mut self, route: Route) {
        self.planned_route = Some(route);
        self.planned_refs = NavRefs::first_leg();
        self.action = AutopilotAction::waypoint(self.planned_refs);
        self.controller.install_action();
    }

    /// Diverts onto a temporary route, keeping the planned route to
    /// return to.
    pub fn fly_temp_route(&mut self, route: Route) {
        self.temp_route = Some(route);
        self.temp_refs = NavRefs::first_leg();
        self.temp_action = Some(AutopilotAction::waypoint(self.temp_refs));
        self.controller.install_action();
    }

    /// Abandons any temporary route and resumes the planned one.
    pub fn return_to_planned_route(&mut self) {
        self.temp_action = None;
        self.temp_route = None;
        self.controller.install_action();
    }

    /// Jumps the planned route to the given waypoint index.
    pub fn set_planned_waypoint_index(&mut self, index: usize) -> bool {
        let valid =
            self.planned_route.as_ref().is_some_and(|route| route.waypoint(index).is_some());
        if valid {
            self.planned_refs = NavRefs { prev: None, curr: Some(index) };
            if self.temp_action.is_none() {
                self.action.nav = Some(self.planned_refs);
                self.controller.install_action();
            }
        }
        valid
    }

    /// Replaces the installed action, preserving waypoint references.
    fn install_action(&mut self, mut action: AutopilotAction) {
        if action.uses_waypoints() && action.nav.is_none() {
            action.nav = Some(if self.temp_action.is_some() {
                self.temp_refs
            } else {
                self.planned_refs
            });
        }
        *self.current_action_mut() = action;
        self.controller.install_action();
    }

    /// Applies a single-channel setpoint onto the installed action.
    fn apply_setpoint(&mut self, setpoint: &AutopilotSetpoint) {
        let nav_refs =
            if self.temp_action.is_some() { self.temp_refs } else { self.planned_refs };
        let action = self.current_action_mut();
        setpoint.apply(action, nav_refs);
        self.controller.install_action();
    }

    /// Runs the controller and advances the route when the current
    /// waypoint is achieved.
    fn update(
        &mut self,
        state: &Kinematics,
        vehicle: &VehicleData,
        dt: std::time::Duration,
    ) -> ActuatorCommand {
        let action = if self.temp_action.is_some() {
            self.temp_action.as_ref().expect("checked above")
        } else {
            &self.action
        };
        let route =
            if self.temp_action.is_some() { self.temp_route.as_ref() } else { self.planned_route.as_ref() };

        let ctx = super::autopilot::ControllerCtx { state, vehicle, action, route, dt };
        let command = self.controller.update(&ctx);

        if self.controller.waypoint_achieved() {
            self.advance_route();
        }

        command
    }

    fn advance_route(&mut self) {
        let on_temp = self.temp_action.is_some();
        let route = if on_temp { self.temp_route.as_ref() } else { self.planned_route.as_ref() };
        let refs = if on_temp { &mut self.temp_refs } else { &mut self.planned_refs };

        if let (Some(route), Some(curr)) = (route, refs.curr) {
            refs.prev = Some(curr);
            refs.curr = route.next_of(curr);
        }

        let refs = *refs;
        let action = self.current_action_mut();
        if action.nav.is_some() {
            action.nav = Some(refs);
        }
        self.controller.install_action();
    }
}

/// One pilot source: a concrete kind composing the shared record.
#[derive(Debug, Clone)]
pub enum PilotSource {
    ManualSimple {
        common: PilotCommon,
        yaw_damper: bool,
    },
    ManualAugmented {
        common: PilotCommon,
        cas: store::ManualPilotAugmentedConfig,
        regulated: RegulatedPilot,
    },
    Synthetic {
        common: PilotCommon,
        regulated: RegulatedPilot,
    },
    HardwareBankToTurn {
        common: PilotCommon,
        regulated: RegulatedPilot,
    },
    HardwareSkidToTurn {
        common: PilotCommon,
        regulated: RegulatedPilot,
    },
    GuidanceBankToTurn {
        common: PilotCommon,
        regulated: RegulatedPilot,
    },
    GuidanceSkidToTurn {
        common: PilotCommon,
        regulated: RegulatedPilot,
    },
}

impl PilotSource {
    #[must_use]
    pub fn kind(&self) -> PilotKind {
        match self {
            Self::ManualSimple { .. } => PilotKind::ManualSimple,
            Self::ManualAugmented { .. } => PilotKind::ManualAugmented,
            Self::Synthetic { .. } => PilotKind::Synthetic,
            Self::HardwareBankToTurn { .. } => PilotKind::HardwareBankToTurn,
            Self::HardwareSkidToTurn { .. } => PilotKind::HardwareSkidToTurn,
            Self::GuidanceBankToTurn { .. } => PilotKind::GuidanceBankToTurn,
            Self::GuidanceSkidToTurn { .. } => PilotKind::GuidanceSkidToTurn,
        }
    }

    #[must_use]
    pub fn common(&self) -> &PilotCommon {
        match self {
            Self::ManualSimple { common, .. }
            | Self::ManualAugmented { common, .. }
            | Self::Synthetic { common, .. }
            | Self::HardwareBankToTurn { common, .. }
            | Self::HardwareSkidToTurn { common, .. }
            | Self::GuidanceBankToTurn { common, .. }
            | Self::GuidanceSkidToTurn { common, .. } => common,
        }
    }

    pub fn common_mut(&mut self) -> &mut PilotCommon {
        match self {
            Self::ManualSimple { common, .. }
            | Self::ManualAugmented { common, .. }
            | Self::Synthetic { common, .. }
            | Self::HardwareBankToTurn { common, .. }
            | Self::HardwareSkidToTurn { common, .. }
            | Self::GuidanceBankToTurn { common, .. }
            | Self::GuidanceSkidToTurn { common, .. } => common,
        }
    }

    #[must_use]
    pub fn regulated(&self) -> Option<&RegulatedPilot> {
        match self {
            Self::ManualSimple { .. } => None,
            Self::ManualAugmented { regulated, .. }
            | Self::Synthetic { regulated, .. }
            | Self::HardwareBankToTurn { regulated, .. }
            | Self::HardwareSkidToTurn { regulated, .. }
            | Self::GuidanceBankToTurn { regulated, .. }
            | Self::GuidanceSkidToTurn { regulated, .. } => Some(regulated),
        }
    }

    pub fn regulated_mut(&mut self) -> Option<&mut RegulatedPilot> {
        match self {
            Self::ManualSimple { .. } => None,
            Self::ManualAugmented { regulated, .. }
            | Self::Synthetic { regulated, .. }
            | Self::HardwareBankToTurn { regulated, .. }
            | Self::HardwareSkidToTurn { regulated, .. }
            | Self::GuidanceBankToTurn { regulated, .. }
            | Self::GuidanceSkidToTurn { regulated, .. } => Some(regulated),
        }
    }
}

/// An autopilot setpoint command: selects a channel mode and its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutopilotSetpoint {
    Altitude(Length),
    VerticalSpeed(Speed),
    PitchAngle(Angle),
    PitchRate(AngularSpeed),
    FlightPathAngle(Angle),
    PitchGLoad(f64),
    Alpha(Angle),
    DeltaPitch(Angle),
    RollHeading(Heading),
    YawHeading(Heading),
    Bank(Angle),
    RollRate(AngularSpeed),
    DeltaRoll(Angle),
    YawRate(AngularSpeed),
    Beta(Angle),
    YawGLoad(f64),
    SpeedKtas(f64),
    SpeedKcas(f64),
    SpeedMach(f64),
    SpeedFps(Speed),
    ForwardAccel(f64),
    LateralWaypointMode,
    VerticalWaypointMode,
    SpeedWaypointMode,
    WaypointMode,
    NoControl,
}

impl AutopilotSetpoint {
    fn apply(self, action: &mut AutopilotAction, nav_refs: NavRefs) {
        match self {
            Self::Altitude(v) => action.vertical = VerticalMode::Altitude(v),
            Self::VerticalSpeed(v) => action.vertical = VerticalMode::VertSpeed(v),
            Self::PitchAngle(v) => action.vertical = VerticalMode::PitchAng(v),
            Self::PitchRate(v) => action.vertical = VerticalMode::PitchRate(v),
            Self::FlightPathAngle(v) => action.vertical = VerticalMode::FltPathAng(v),
            Self::PitchGLoad(v) => action.vertical = VerticalMode::PitchGLoad(v),
            Self::Alpha(v) => action.vertical = VerticalMode::Alpha(v),
            Self::DeltaPitch(v) => action.vertical = VerticalMode::DeltaPitch(v),
            Self::RollHeading(v) | Self::YawHeading(v) => {
                action.lateral = LateralMode::Heading(v);
            }
            Self::Bank(v) => action.lateral = LateralMode::Bank(v),
            Self::RollRate(v) => action.lateral = LateralMode::RollRate(v),
            Self::DeltaRoll(v) => action.lateral = LateralMode::DeltaRoll(v),
            Self::YawRate(v) => action.lateral = LateralMode::YawRate(v),
            Self::Beta(v) => action.lateral = LateralMode::Beta(v),
            Self::YawGLoad(v) => action.lateral = LateralMode::YawGLoad(v),
            Self::SpeedKtas(v) => action.speed = SpeedMode::Ktas(v),
            Self::SpeedKcas(v) => action.speed = SpeedMode::Kias(v),
            Self::SpeedMach(v) => action.speed = SpeedMode::Mach(v),
            Self::SpeedFps(v) => action.speed = SpeedMode::Fps(v),
            Self::ForwardAccel(v) => action.speed = SpeedMode::ForwardAccel(v),
            Self::LateralWaypointMode => {
                action.lateral = LateralMode::Waypoint;
                action.nav = Some(nav_refs);
            }
            Self::VerticalWaypointMode => {
                action.vertical = VerticalMode::Waypoint;
                action.nav = Some(nav_refs);
            }
            Self::SpeedWaypointMode => {
                action.speed = SpeedMode::Waypoint;
                action.nav = Some(nav_refs);
            }
            Self::WaypointMode => {
                *action = AutopilotAction::waypoint(nav_refs);
            }
            Self::NoControl => {
                *action = AutopilotAction::default();
            }
        }
    }
}

/// Direct throttle overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePosition {
    Idle,
    Full,
    Afterburner,
}

/// Manual control-input values with trim switch state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualControlData {
    pub stick_back: f64,
    pub stick_right: f64,
    pub rudder_right: f64,
    pub throttle_military: f64,
    pub throttle_afterburner: f64,
    pub speed_brake: f64,
    pub wheel_brake_left: f64,
    pub wheel_brake_right: f64,
    pub nws_enabled: bool,
}

/// Commands accepted by the pilot manager. Applied at the next update, in
/// call order.
#[derive(Debug, Clone)]
pub enum PilotCommand {
    MakeActive(PilotFamily),
    EnableControls(bool),
    EnableAutopilot(bool),
    Autopilot(AutopilotSetpoint),
    SetPlannedRoute(Route),
    FlyTempRoute(Route),
    ReturnToPlannedRoute,
    SetPlannedWaypointIndex(usize),
    SetTaxiMode(bool),
    SetDesiredTaxiRadius(Length),
    SetDestroyed { pitch_mod: f64, roll_mod: f64 },
    RevertLimitsToDefaults,
    SetLimits(Box<LimitsAndSettings>),
    ManualControls(ManualControlData),
    MoveThrottle(ThrottlePosition),
    AdjustTrim { nose_up_sec: f64, roll_right_sec: f64, yaw_right_sec: f64 },
    TakeExternalDirectControl,
    ReleaseExternalDirectControl,
    SetExternalDirectControls(DirectInputs),
    SetTestingControls(Option<DirectInputs>),
}

/// Owns the pilot sources of one vehicle and arbitrates which one drives
/// the actuator bus each frame.
#[derive(Debug, Component)]
pub struct PilotManager {
    pilots: Vec<PilotSource>,
    /// Index of the active source; always valid once initialized.
    active: usize,
    controls_enabled: bool,
    destroyed: bool,
    /// Actuator values pinned at destruction.
    destroyed_controls: Option<ActuatorCommand>,
    pending: Vec<PilotCommand>,
    shaping: InputShaping,
    use_simple_yaw_damper: bool,
}

impl PilotManager {
    /// Builds a manager over an already-validated set of sources.
    ///
    /// `active` must index into `pilots`.
    #[must_use]
    pub fn new(
        pilots: Vec<PilotSource>,
        active: usize,
        shaping: InputShaping,
        use_simple_yaw_damper: bool,
    ) -> Self {
        Self {
            pilots,
            active,
            controls_enabled: true,
            destroyed: false,
            destroyed_controls: None,
            pending: Vec::new(),
            shaping,
            use_simple_yaw_damper,
        }
    }

    /// Queues a command for the next update.
    pub fn enqueue(&mut self, command: PilotCommand) { self.pending.push(command); }

    #[must_use]
    pub fn active_pilot(&self) -> &PilotSource { &self.pilots[self.active] }

    pub fn active_pilot_mut(&mut self) -> &mut PilotSource { &mut self.pilots[self.active] }

    #[must_use]
    pub fn active_kind(&self) -> PilotKind { self.pilots[self.active].kind() }

    #[must_use]
    pub fn is_destroyed(&self) -> bool { self.destroyed }

    #[must_use]
    pub fn controls_enabled(&self) -> bool { self.controls_enabled }

    #[must_use]
    pub fn pilots(&self) -> &[PilotSource] { &self.pilots }

    /// Promotes the first pilot of the given family. Fails when no such
    /// pilot exists or the vehicle is destroyed.
    pub fn make_active(&mut self, family: PilotFamily) -> bool {
        if self.destroyed {
            return false;
        }
        match self.pilots.iter().position(|pilot| pilot.kind().family() == family) {
            Some(index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }

    /// Destroys the vehicle: pins the active pilot, disables the
    /// autopilot, pulls the power to idle, deploys the speed brake and
    /// applies the pitch/roll control biases.
    ///
    /// The modifiers are random factors in [-1, 1]; tests inject fixed
    /// values to reproduce the output.
    pub fn set_destroyed(&mut self, pitch_mod: f64, roll_mod: f64) {
        if self.destroyed {
            return;
        }

        let pilot = &mut self.pilots[self.active];
        pilot.common_mut().autopilot_enabled = false;
        if let Some(regulated) = pilot.regulated_mut() {
            regulated.controller.reset_accumulated_pid_data();
        }

        // Excessive pitch control would loop the vehicle; keep the pitch
        // bias small, 2% of full control in 80% of cases, else 5%.
        let pitch_bias =
            if pitch_mod.abs() < 0.8 { pitch_mod * 0.02 } else { pitch_mod * 0.05 };

        // Roll should be visible: 30%-60% of full control in 80% of
        // cases, else reduced to at most 10%.
        let roll_bias = if roll_mod.abs() < 0.8 {
            if roll_mod >= 0.0 {
                0.3 + 0.3 * (roll_mod / 0.8)
            } else {
                -0.3 + 0.3 * (roll_mod / 0.8)
            }
        } else {
            roll_mod * 0.1
        };

        let input = pilot.common().input;
        let stick_right = (input.stick_right + roll_bias).clamp(-1.0, 1.0);
        let mut stick_back = (input.stick_back + pitch_bias).clamp(-1.0, 1.0);

        // A minimal roll command gets a slow pitch-over instead.
        if stick_right.abs() < 0.1 {
            stick_back = -0.1;
        }

        let pinned = DirectInputs {
            stick_back,
            stick_right,
            rudder_right: 0.0,
            throttle_military: 0.0,
            throttle_afterburner: 0.0,
            speed_brake: 1.0,
            ..DirectInputs::default()
        };
        pilot.common_mut().external_direct = Some(pinned);

        self.destroyed_controls = Some(pinned.into_actuators());
        self.destroyed = true;
    }

    /// [`Self::set_destroyed`] with modifiers drawn from the given RNG.
    pub fn set_destroyed_random(&mut self, rng: &mut impl Rng) {
        let pitch_mod = rng.random_range(-1.0..=1.0);
        let roll_mod = rng.random_range(-1.0..=1.0);
        self.set_destroyed(pitch_mod, roll_mod);
    }

    fn apply_command(&mut self, command: PilotCommand) {
        // Once destroyed, no further control changes are accepted.
        if self.destroyed {
            return;
        }

        match command {
            PilotCommand::MakeActive(family) => {
                self.make_active(family);
            }
            PilotCommand::EnableControls(enabled) => self.controls_enabled = enabled,
            PilotCommand::EnableAutopilot(enabled) => {
                self.active_pilot_mut().common_mut().autopilot_enabled = enabled;
            }
            PilotCommand::Autopilot(setpoint) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.apply_setpoint(&setpoint);
                }
            }
            PilotCommand::SetPlannedRoute(route) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.set_planned_route(route);
                }
            }
            PilotCommand::FlyTempRoute(route) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.fly_temp_route(route);
                }
            }
            PilotCommand::ReturnToPlannedRoute => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.return_to_planned_route();
                }
            }
            PilotCommand::SetPlannedWaypointIndex(index) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.set_planned_waypoint_index(index);
                }
            }
            PilotCommand::SetTaxiMode(active) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.controller.set_taxi_mode(active);
                }
            }
            PilotCommand::SetDesiredTaxiRadius(radius) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.controller.set_desired_taxi_radius(radius);
                }
            }
            PilotCommand::SetDestroyed { pitch_mod, roll_mod } => {
                self.set_destroyed(pitch_mod, roll_mod);
            }
            PilotCommand::RevertLimitsToDefaults => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.controller.revert_limits_and_settings_to_defaults();
                }
            }
            PilotCommand::SetLimits(limits) => {
                if let Some(regulated) = self.active_pilot_mut().regulated_mut() {
                    regulated.controller.set_current_limits(*limits);
                }
            }
            PilotCommand::ManualControls(data) => {
                let common = self.active_pilot_mut().common_mut();
                common.input = DirectInputs {
                    stick_back: data.stick_back,
                    stick_right: data.stick_right,
                    rudder_right: data.rudder_right,
                    throttle_military: data.throttle_military,
                    throttle_afterburner: data.throttle_afterburner,
                    speed_brake: data.speed_brake,
                    wheel_brake_left: data.wheel_brake_left,
                    wheel_brake_right: data.wheel_brake_right,
                    nws_enabled: data.nws_enabled,
                };
            }
            PilotCommand::MoveThrottle(position) => {
                let input = &mut self.active_pilot_mut().common_mut().input;
                match position {
                    ThrottlePosition::Idle => {
                        input.throttle_military = 0.0;
                        input.throttle_afterburner = 0.0;
                    }
                    ThrottlePosition::Full => {
                        input.throttle_military = 1.0;
                        input.throttle_afterburner = 0.0;
                    }
                    ThrottlePosition::Afterburner => {
                        input.throttle_military = 1.0;
                        input.throttle_afterburner = 1.0;
                    }
                }
            }
            PilotCommand::AdjustTrim { nose_up_sec, roll_right_sec, yaw_right_sec } => {
                let factors = (
                    self.shaping.pitch_trim_factor,
                    self.shaping.roll_trim_factor,
                    self.shaping.yaw_trim_factor,
                );
                let trim = &mut self.active_pilot_mut().common_mut().trim;
                trim.nose_up = (trim.nose_up + nose_up_sec * factors.0).clamp(-1.0, 1.0);
                trim.roll_right =
                    (trim.roll_right + roll_right_sec * factors.1).clamp(-1.0, 1.0);
                trim.yaw_right = (trim.yaw_right + yaw_right_sec * factors.2).clamp(-1.0, 1.0);
            }
            PilotCommand::TakeExternalDirectControl => {
                let common = self.active_pilot_mut().common_mut();
                common.external_direct = Some(common.input);
            }
            PilotCommand::ReleaseExternalDirectControl => {
                self.active_pilot_mut().common_mut().external_direct = None;
            }
            PilotCommand::SetExternalDirectControls(inputs) => {
                let common = self.active_pilot_mut().common_mut();
                if common.external_direct.is_some() {
                    common.external_direct = Some(inputs);
                }
            }
            PilotCommand::SetTestingControls(values) => {
                let pilot = self.active_pilot_mut();
                if values.is_some() {
                    // Engaging testing mode restarts the regulators.
                    if let Some(regulated) = pilot.regulated_mut() {
                        regulated.controller.reset_accumulated_pid_data();
                        regulated.controller.reset_all_delta_angles();
                    }
                }
                pilot.common_mut().testing = values;
            }
        }
    }

    /// One arbitration-and-update pass. Priority, highest first: testing,
    /// destroyed, controls-disabled, autopilot, manual/external-direct.
    fn update(
        &mut self,
        state: &Kinematics,
        vehicle: &VehicleData,
        dt: std::time::Duration,
    ) -> ActuatorCommand {
        let commands: Vec<_> = self.pending.drain(..).collect();
        for command in commands {
            self.apply_command(command);
        }

        if let Some(testing) = self.active_pilot().common().testing {
            let mut command = testing.into_actuators();
            command.enforce_limits();
            return command;
        }

        if self.destroyed {
            let mut command =
                self.destroyed_controls.unwrap_or_else(ActuatorCommand::neutral);
            command.enforce_limits();
            return command;
        }

        if !self.controls_enabled {
            return ActuatorCommand::neutral();
        }

        let Self { pilots, active, shaping, use_simple_yaw_damper, .. } = self;
        let yaw_damper_configured = *use_simple_yaw_damper;
        let pilot = &mut pilots[*active];

        if let Some(external) = pilot.common().external_direct {
            let mut command = external.into_actuators();
            command.enforce_limits();
            return command;
        }

        let autopilot_enabled = pilot.common().autopilot_enabled;

        let mut command = match pilot {
            PilotSource::ManualSimple { common, yaw_damper } => manual_simple_output(
                common,
                shaping,
                *yaw_damper || yaw_damper_configured,
                state,
            ),
            PilotSource::ManualAugmented { common, cas, regulated } => {
                if autopilot_enabled {
                    regulated.update(state, vehicle, dt)
                } else {
                    manual_augmented_output(common, cas, regulated, state, vehicle, dt)
                }
            }
            PilotSource::Synthetic { common, regulated } => {
                if autopilot_enabled {
                    regulated.update(state, vehicle, dt)
                } else {
                    common.input.into_actuators()
                }
            }
            PilotSource::HardwareBankToTurn { common, regulated }
            | PilotSource::HardwareSkidToTurn { common, regulated }
            | PilotSource::GuidanceBankToTurn { common, regulated }
            | PilotSource::GuidanceSkidToTurn { common, regulated } => {
                if autopilot_enabled {
                    regulated.update(state, vehicle, dt)
                } else {
                    common.input.into_actuators()
                }
            }
        };

        command.enforce_limits();
        command
    }
}

/// Simple manual pilot: shaped inputs straight to the actuators, with the
/// optional yaw damper opposing the current yaw rate.
fn manual_simple_output(
    common: &PilotCommon,
    shaping: &InputShaping,
    yaw_damper: bool,
    state: &Kinematics,
) -> ActuatorCommand {
    let input = common.input;

    let stick_back =
        InputShaping::shape(shaping.pitch.as_ref(), input.stick_back) + common.trim.nose_up;
    let stick_right =
        InputShaping::shape(shaping.roll.as_ref(), input.stick_right) + common.trim.roll_right;
    let mut rudder_right =
        InputShaping::shape(shaping.yaw.as_ref(), input.rudder_right) + common.trim.yaw_right;

    if yaw_damper {
        // A fixed-gain rate opposition; enough to kill the dutch roll of
        // the simple response model.
        const YAW_DAMPER_GAIN_PER_DPS: f64 = 0.05;
        rudder_right -= state.yaw_rate.into_degrees_per_sec() * YAW_DAMPER_GAIN_PER_DPS;
    }

    ActuatorCommand {
        stick_back,
        stick_right,
        rudder_right,
        throttle_military: input.throttle_military,
        throttle_afterburner: input.throttle_afterburner,
        speed_brake: input.speed_brake,
        nose_wheel_steering: if input.nws_enabled { rudder_right } else { 0.0 },
        nws_enabled: input.nws_enabled,
        wheel_brake_left: input.wheel_brake_left,
        wheel_brake_right: input.wheel_brake_right,
        ..ActuatorCommand::default()
    }
}

/// Augmented manual pilot: stick deflections become CAS setpoints through
/// the common controller (pitch to commanded g, roll to commanded roll
/// rate), with SAS rate damping summed onto the outputs.
fn manual_augmented_output(
    common: &PilotCommon,
    cas: &store::ManualPilotAugmentedConfig,
    regulated: &mut RegulatedPilot,
    state: &Kinematics,
    vehicle: &VehicleData,
    dt: std::time::Duration,
) -> ActuatorCommand {
    let input = common.input;

    let gload = 1.0 + input.stick_back * (cas.pitch_gload_per_stick - 1.0);
    let roll_rate = cas.roll_rate_per_stick * input.stick_right;

    let action = AutopilotAction {
        lateral: LateralMode::RollRate(roll_rate),
        stabilizing: LateralMode::Undefined,
        vertical: VerticalMode::PitchGLoad(gload),
        speed: SpeedMode::Undefined,
        nav: None,
    };
    regulated.install_action(action);

    let mut command = regulated.update(state, vehicle, dt);

    // Stability augmentation: rate damping on top of the CAS output.
    command.stick_back -= cas.pitch_sas_gain * state.pitch_rate.into_degrees_per_sec();
    command.stick_right -= cas.roll_sas_gain * state.roll_rate.into_degrees_per_sec();
    command.rudder_right -= cas.yaw_sas_gain * state.yaw_rate.into_degrees_per_sec();

    // The throttle passes straight through from the station.
    command.throttle_military = input.throttle_military;
    command.throttle_afterburner = input.throttle_afterburner;
    command.speed_brake = input.speed_brake;
    command.wheel_brake_left = input.wheel_brake_left;
    command.wheel_brake_right = input.wheel_brake_right;

    command
}

/// Per-vehicle telemetry reconciled for external readers.
#[derive(Debug, Clone, Component, Default)]
pub struct PilotStatus {
    pub active: Option<PilotKind>,
    pub autopilot_enabled: bool,
    pub controls_enabled: bool,
    pub destroyed: bool,
    pub aim_heading: Option<Heading>,
    pub turning: bool,
    pub current_waypoint_index: Option<usize>,
}

fn pilot_update_system(
    time: Res<Time<time::Virtual>>,
    mut query: Query<(
        &Kinematics,
        &VehicleData,
        &mut PilotManager,
        &mut ActuatorCommand,
        &mut EngineState,
    )>,
) {
    if time.is_paused() {
        return;
    }
    let dt = time.delta();
    if dt.is_zero() {
        return;
    }

    query.iter_mut().for_each(|(state, vehicle, mut manager, mut actuators, mut engine)| {
        *actuators = manager.update(state, vehicle, dt);

        // Destruction kills the engines completely.
        if manager.is_destroyed() && !engine.shutdown {
            engine.shutdown = true;
        }
    });
}

fn reconcile_status_system(mut query: Query<(&PilotManager, &mut PilotStatus)>) {
    query.iter_mut().for_each(|(manager, mut status)| {
        let pilot = manager.active_pilot();
        status.active = Some(pilot.kind());
        status.autopilot_enabled = pilot.common().autopilot_enabled;
        status.controls_enabled = manager.controls_enabled();
        status.destroyed = manager.is_destroyed();
        status.aim_heading =
            pilot.regulated().map(|regulated| regulated.controller.aim_heading());
        status.turning =
            pilot.regulated().is_some_and(|regulated| regulated.controller.turning());
        status.current_waypoint_index =
            pilot.regulated().and_then(RegulatedPilot::current_waypoint_index);
    });
}
