use math::AngularSpeed;
use serde::{Deserialize, Serialize};

/// Physical description of the vehicle.
///
/// The flight-control core does not model force generation; these values
/// feed the throttle-bias computation and the point-mass response model
/// that closes the loop in tests and demos.
#[derive(Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Vehicle mass in pounds.
    pub mass_lbm: f64,
    /// Reference wing area in square feet, used to relate lift
    /// coefficient to load factor.
    pub wing_area_ft2: f64,
    /// Equivalent flat-plate drag area in square feet.
    /// Drag is `dynamic pressure * area`.
    pub flat_plate_area_ft2: f64,
    /// Maximum military-power thrust in pounds.
    pub max_thrust_lbs: f64,
    /// Minimum (idle) thrust in pounds.
    pub min_thrust_lbs: f64,
    /// Additional thrust in pounds at full afterburner.
    #[serde(default)]
    pub afterburner_thrust_lbs: f64,
    /// Response-model coefficients.
    #[serde(default)]
    pub response: ResponseConfig,
}

/// First-order control-response coefficients of the point-mass model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Angle of attack in degrees commanded by full aft stick.
    pub alpha_per_stick_deg: f64,
    /// Time constant of the alpha response, seconds.
    pub alpha_tau_sec: f64,
    /// Normal load factor in g per degree of alpha.
    pub nz_per_alpha_deg: f64,
    /// Roll rate commanded by full right stick.
    pub roll_rate_per_stick: AngularSpeed,
    /// Time constant of the roll-rate response, seconds.
    pub roll_tau_sec: f64,
    /// Sideslip in degrees commanded by full right rudder.
    pub beta_per_rudder_deg: f64,
    /// Lateral load factor in g per degree of sideslip.
    pub ny_per_beta_deg: f64,
    /// Time constant of the beta response, seconds.
    pub beta_tau_sec: f64,
    /// Speed-brake drag as a fraction of flat-plate drag at full deployment.
    pub speed_brake_drag_factor: f64,
    /// Nose-wheel-steering yaw rate at full deflection during taxi.
    pub nws_yaw_rate_per_cmd: AngularSpeed,
    /// Wheel braking deceleration at full brake.
    pub wheel_brake_fps2: f64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            alpha_per_stick_deg: 20.0,
            alpha_tau_sec: 0.3,
            nz_per_alpha_deg: 0.4,
            roll_rate_per_stick: AngularSpeed::from_degrees_per_sec(180.0),
            roll_tau_sec: 0.2,
            beta_per_rudder_deg: 10.0,
            ny_per_beta_deg: 0.3,
            beta_tau_sec: 0.3,
            speed_brake_drag_factor: 1.5,
            nws_yaw_rate_per_cmd: AngularSpeed::from_degrees_per_sec(15.0),
            wheel_brake_fps2: 8.0,
        }
    }
}
