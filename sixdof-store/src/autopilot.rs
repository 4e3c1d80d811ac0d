use math::{Angle, AngularSpeed, Length, Speed};
use serde::{Deserialize, Serialize};

/// Autopilot configuration block of a vehicle file.
#[derive(Clone, Serialize, Deserialize)]
pub struct AutopilotConfig {
    /// Overall control method of the vehicle.
    pub control_method: ControlMethod,

    /// Inner-loop updates per middle-loop update, vertical channel. Valid 1..=254.
    #[serde(default = "default_middle_loop_factor")]
    pub vertical_middle_loop_rate_factor: u8,
    /// Inner-loop updates per middle-loop update, lateral channel. Valid 1..=254.
    #[serde(default = "default_middle_loop_factor")]
    pub lateral_middle_loop_rate_factor: u8,
    /// Inner-loop updates per middle-loop update, speed channel. Valid 1..=254.
    #[serde(default = "default_middle_loop_factor")]
    pub speed_middle_loop_rate_factor: u8,
    /// Middle-loop updates per outer-loop update, vertical channel. Valid 1..=254.
    #[serde(default = "default_outer_loop_factor")]
    pub vertical_outer_loop_rate_factor: u8,
    /// Middle-loop updates per outer-loop update, lateral channel. Valid 1..=254.
    #[serde(default = "default_outer_loop_factor")]
    pub lateral_outer_loop_rate_factor: u8,
    /// Middle-loop updates per outer-loop update, speed channel. Valid 1..=254.
    #[serde(default = "default_outer_loop_factor")]
    pub speed_outer_loop_rate_factor: u8,

    /// Selects the legacy sign convention of the beta regulator output in
    /// yaw-to-turn methods. Which convention is correct is a per-vehicle
    /// decision.
    #[serde(default = "default_true")]
    pub use_legacy_beta: bool,
    /// Enables the simple yaw damper of the manual pilot.
    #[serde(default)]
    pub use_simple_yaw_damper: bool,
    /// Smallest taxi turn radius the autopilot will ever command.
    #[serde(default = "default_min_taxi_turn_radius")]
    pub min_taxi_turn_radius: Length,

    /// Gains of the twenty autopilot PIDs.
    pub pid_group: PidGroupConfig,
    /// Envelope limits and autopilot settings; loaded as the *default* set.
    #[serde(default)]
    pub limits_and_settings: LimitsAndSettings,
}

fn default_middle_loop_factor() -> u8 { 10 }
fn default_outer_loop_factor() -> u8 { 5 }
fn default_true() -> bool { true }
fn default_min_taxi_turn_radius() -> Length { Length::from_feet(50.0) }

/// Overall control method of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ControlMethod {
    /// Bank-to-turn without yaw stabilization.
    BankToTurnNoYaw,
    /// Bank-to-turn with beta-nulling yaw stabilization.
    BankToTurnWithYaw,
    /// Yaw-to-turn with the roll channel uncontrolled.
    YawToTurnNoRoll,
    /// Yaw-to-turn holding zero roll rate.
    YawToTurnRollRate,
    /// Yaw-to-turn holding zero bank angle.
    YawToTurnZeroBank,
}

impl ControlMethod {
    /// Whether this is one of the bank-to-turn methods.
    #[must_use]
    pub fn is_bank_to_turn(self) -> bool {
        matches!(self, Self::BankToTurnNoYaw | Self::BankToTurnWithYaw)
    }

    /// Whether this is one of the yaw-to-turn methods.
    #[must_use]
    pub fn is_yaw_to_turn(self) -> bool { !self.is_bank_to_turn() }
}

/// Gain configuration for every PID of the autopilot.
///
/// Field names match the configuration surface
/// (`pid_alpha`, `pid_vert_speed`, ...).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PidGroupConfig {
    /// Angle-of-attack regulator.
    #[serde(default)]
    pub pid_alpha: PidConfig,
    /// Vertical-speed regulator.
    #[serde(default)]
    pub pid_vert_speed: PidConfig,
    /// Pitch-angle regulator.
    #[serde(default)]
    pub pid_pitch_angle: PidConfig,
    /// Pitch-rate regulator.
    #[serde(default)]
    pub pid_pitch_rate: PidConfig,
    /// Flight-path-angle regulator.
    #[serde(default)]
    pub pid_flightpath_angle: PidConfig,
    /// Delta-pitch regulator.
    #[serde(default)]
    pub pid_delta_pitch: PidConfig,
    /// Altitude regulator.
    #[serde(default)]
    pub pid_altitude: PidConfig,
    /// Sideslip regulator.
    #[serde(default)]
    pub pid_beta: PidConfig,
    /// Yaw-rate regulator.
    #[serde(default)]
    pub pid_yaw_rate: PidConfig,
    /// Yaw-heading regulator.
    #[serde(default)]
    pub pid_yaw_heading: PidConfig,
    /// Taxi-heading regulator.
    #[serde(default)]
    pub pid_taxi_heading: PidConfig,
    /// Roll-rate regulator.
    #[serde(default)]
    pub pid_roll_rate: PidConfig,
    /// Delta-roll regulator.
    #[serde(default)]
    pub pid_delta_roll: PidConfig,
    /// Bank-angle regulator.
    #[serde(default)]
    pub pid_bank_angle: PidConfig,
    /// Roll-heading regulator.
    #[serde(default)]
    pub pid_roll_heading: PidConfig,
    /// Forward-acceleration regulator.
    #[serde(default)]
    pub pid_forward_accel: PidConfig,
    /// Speed regulator.
    #[serde(default)]
    pub pid_speed: PidConfig,
    /// Taxi forward-acceleration regulator.
    #[serde(default)]
    pub pid_taxi_forward_accel: PidConfig,
    /// Taxi-speed regulator.
    #[serde(default)]
    pub pid_taxi_speed: PidConfig,
    /// Taxi yaw-rate regulator.
    #[serde(default)]
    pub pid_taxi_yaw_rate: PidConfig,
}

/// Gains of one PID: either scalar gains or a gain table keyed by a
/// controlling value. Supplying both forms is a configuration error.
///
/// Anti-windup and filtering features of the PID are enabled by the
/// presence of their tuning value (scalar or in any table row).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PidConfig {
    /// Scalar proportional gain.
    #[serde(default)]
    pub kp: Option<f64>,
    /// Scalar integral gain.
    #[serde(default)]
    pub ki: Option<f64>,
    /// Scalar derivative gain.
    #[serde(default)]
    pub kd: Option<f64>,
    /// Accumulator clamp magnitude; enables the clamp.
    #[serde(default)]
    pub max_error_accum: Option<f64>,
    /// Derivative low-pass filter alpha; enables the filter.
    #[serde(default)]
    pub low_pass_alpha: Option<f64>,
    /// Freeze accumulation while |error| exceeds this; enables the freeze.
    #[serde(default)]
    pub ignore_large_error_accum: Option<f64>,
    /// Freeze accumulation while |error| is below this; enables the freeze.
    #[serde(default)]
    pub ignore_small_error_accum: Option<f64>,
    /// Kt back-calculation anti-windup gain; enables the technique.
    #[serde(default)]
    pub kt_anti_windup_gain: Option<f64>,
    /// Tabular gains; rows must be strictly increasing in `control_value`.
    #[serde(default)]
    pub gain_table: Vec<GainRow>,
}

impl PidConfig {
    /// Whether any scalar gain or tuning value is present.
    #[must_use]
    pub fn has_scalar_data(&self) -> bool {
        self.kp.is_some()
            || self.ki.is_some()
            || self.kd.is_some()
            || self.max_error_accum.is_some()
            || self.low_pass_alpha.is_some()
            || self.ignore_large_error_accum.is_some()
            || self.ignore_small_error_accum.is_some()
            || self.kt_anti_windup_gain.is_some()
    }
}

/// One row of a PID gain table.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GainRow {
    /// Controlling value (typically dynamic pressure in lb/ft^2) of this row.
    pub control_value: f64,
    /// Proportional gain at this controlling value.
    #[serde(default)]
    pub kp: f64,
    /// Integral gain at this controlling value.
    #[serde(default)]
    pub ki: f64,
    /// Derivative gain at this controlling value.
    #[serde(default)]
    pub kd: f64,
    /// Accumulator clamp magnitude; enables the clamp.
    #[serde(default)]
    pub max_error_accum: Option<f64>,
    /// Derivative low-pass filter alpha; enables the filter.
    #[serde(default)]
    pub low_pass_alpha: Option<f64>,
    /// Freeze accumulation while |error| exceeds this; enables the freeze.
    #[serde(default)]
    pub ignore_large_error_accum: Option<f64>,
    /// Freeze accumulation while |error| is below this; enables the freeze.
    #[serde(default)]
    pub ignore_small_error_accum: Option<f64>,
    /// Kt back-calculation anti-windup gain; enables the technique.
    #[serde(default)]
    pub kt_anti_windup_gain: Option<f64>,
}

/// Envelope limits and autopilot settings of a vehicle.
///
/// Loaded once as the *default* set; a mutable *current* copy is live at
/// runtime and may be reverted to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsAndSettings {
    /// Whether the speed channel may push the throttle into afterburner.
    pub enable_afterburner_auto_control: bool,
    /// Speed command above which the afterburner engages.
    pub afterburner_threshold: f64,
    /// Whether the speed channel may deploy the speed brake.
    pub enable_speed_brake_auto_control: bool,
    /// Speed command below which the speed brake deploys.
    pub speed_brake_threshold: f64,
    /// Multiplier on the geometric turn lead distance when rolling into
    /// a waypoint turn.
    pub turn_roll_in_multiplier: f64,
    /// Heading error beyond which the approach test declares a waypoint
    /// unreachable and advances the route.
    pub route_allowable_angle_error: Angle,
    /// Most negative commanded pitch load factor, g.
    pub pitch_gload_min: f64,
    /// Most positive commanded pitch load factor, g.
    pub pitch_gload_max: f64,
    /// Most negative commanded angle of attack.
    pub alpha_min: Angle,
    /// Most positive commanded angle of attack.
    pub alpha_max: Angle,
    /// Most negative commanded pitch rate.
    pub pitch_rate_min: AngularSpeed,
    /// Most positive commanded pitch rate.
    pub pitch_rate_max: AngularSpeed,
    /// Most negative commanded vertical speed.
    pub vert_speed_min: Speed,
    /// Most positive commanded vertical speed.
    pub vert_speed_max: Speed,
    /// Maximum commanded yaw load factor magnitude, g.
    pub yaw_gload_max: f64,
    /// Maximum commanded sideslip magnitude.
    pub beta_max: Angle,
    /// Maximum commanded yaw rate magnitude.
    pub yaw_rate_max: AngularSpeed,
    /// Maximum commanded roll rate magnitude.
    pub roll_rate_max: AngularSpeed,
    /// Maximum commanded bank angle magnitude.
    pub bank_angle_max: Angle,
    /// Most negative commanded forward acceleration, g.
    pub forward_accel_min: f64,
    /// Most positive commanded forward acceleration, g.
    pub forward_accel_max: f64,
    /// Maximum taxi ground speed.
    pub taxi_speed_max: Speed,
    /// Maximum taxi yaw rate magnitude.
    pub taxi_yaw_rate_max: AngularSpeed,
}

impl Default for LimitsAndSettings {
    /// Conventional fighter-class envelope used when the configuration
    /// block is absent.
    fn default() -> Self {
        Self {
            enable_afterburner_auto_control: true,
            afterburner_threshold: 1.0,
            enable_speed_brake_auto_control: true,
            speed_brake_threshold: 0.0,
            turn_roll_in_multiplier: 1.0,
            route_allowable_angle_error: Angle::from_degrees(3.0),
            pitch_gload_min: -3.0,
            pitch_gload_max: 8.0,
            alpha_min: Angle::from_degrees(-8.0),
            alpha_max: Angle::from_degrees(20.0),
            pitch_rate_min: AngularSpeed::from_degrees_per_sec(-10.0),
            pitch_rate_max: AngularSpeed::from_degrees_per_sec(40.0),
            vert_speed_min: Speed::from_fpm(-15000.0),
            vert_speed_max: Speed::from_fpm(15000.0),
            yaw_gload_max: 8.0,
            beta_max: Angle::from_degrees(10.0),
            yaw_rate_max: AngularSpeed::from_degrees_per_sec(20.0),
            roll_rate_max: AngularSpeed::from_degrees_per_sec(180.0),
            bank_angle_max: Angle::from_degrees(60.0),
            forward_accel_min: -2.0,
            forward_accel_max: 2.0,
            taxi_speed_max: Speed::from_fps(10.0),
            taxi_yaw_rate_max: AngularSpeed::from_degrees_per_sec(10.0),
        }
    }
}
