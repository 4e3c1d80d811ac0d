use math::AngularSpeed;
use serde::{Deserialize, Serialize};

use crate::Curve;

/// Pilot-manager wiring: which pilot sources exist and which one starts
/// active.
#[derive(Clone, Serialize, Deserialize)]
pub struct PilotManagerConfig {
    /// Mapping of external control inputs shared by the manual pilots.
    #[serde(default)]
    pub control_inputs: ControlInputsConfig,
    /// Manual pilot passing inputs straight to the actuators.
    #[serde(default)]
    pub manual_pilot_simple_controls: Option<ManualPilotSimpleConfig>,
    /// Manual pilot routing inputs through the common controller (CAS/SAS).
    #[serde(default)]
    pub manual_pilot_augmented_controls: Option<ManualPilotAugmentedConfig>,
    /// Script-driven pilot exposing direct control-data setters.
    #[serde(default)]
    pub synthetic_pilot: Option<SyntheticPilotConfig>,
    /// Hardware autopilot, bank-to-turn family.
    #[serde(default)]
    pub hardware_autopilot_bank_to_turn: Option<RegulatedPilotConfig>,
    /// Hardware autopilot, skid-to-turn family.
    #[serde(default)]
    pub hardware_autopilot_skid_to_turn: Option<RegulatedPilotConfig>,
    /// Guidance autopilot, bank-to-turn family.
    #[serde(default)]
    pub guidance_autopilot_bank_to_turn: Option<RegulatedPilotConfig>,
    /// Guidance autopilot, skid-to-turn family.
    #[serde(default)]
    pub guidance_autopilot_skid_to_turn: Option<RegulatedPilotConfig>,
    /// Family of the initially active pilot. Must name a defined source.
    pub active_pilot: ActivePilot,
}

/// The pilot family activated at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ActivePilot {
    /// Whichever manual pilot is defined, simple preferred.
    ManualPilot,
    /// The synthetic pilot.
    SyntheticPilot,
    /// Whichever hardware autopilot is defined, bank-to-turn preferred.
    HardwareAutopilot,
    /// Whichever guidance autopilot is defined, bank-to-turn preferred.
    GuidanceAutopilot,
}

/// Non-linear control-input shaping shared by the manual pilots.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ControlInputsConfig {
    /// Optional non-linear mapping of normalized pitch input.
    #[serde(default)]
    pub pitch_control_mapping_table: Option<Curve>,
    /// Optional non-linear mapping of normalized roll input.
    #[serde(default)]
    pub roll_control_mapping_table: Option<Curve>,
    /// Optional non-linear mapping of normalized yaw input.
    #[serde(default)]
    pub yaw_control_mapping_table: Option<Curve>,
    /// Trim rate applied per second of nose-up trim input.
    #[serde(default = "default_trim_factor")]
    pub pitch_trim_factor: f64,
    /// Trim rate applied per second of roll-right trim input.
    #[serde(default = "default_trim_factor")]
    pub roll_trim_factor: f64,
    /// Trim rate applied per second of yaw-right trim input.
    #[serde(default = "default_trim_factor")]
    pub yaw_trim_factor: f64,
}

fn default_trim_factor() -> f64 { 0.1 }

/// Configuration of the simple manual pilot.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ManualPilotSimpleConfig {
    /// Adds a rudder increment opposing the current yaw rate.
    #[serde(default)]
    pub simple_yaw_damper: bool,
}

/// Configuration of the augmented manual pilot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPilotAugmentedConfig {
    /// Pitch load factor commanded by full aft stick under CAS.
    #[serde(default = "default_cas_gload")]
    pub pitch_gload_per_stick: f64,
    /// Roll rate commanded by full right stick under CAS.
    #[serde(default = "default_cas_roll_rate")]
    pub roll_rate_per_stick: AngularSpeed,
    /// Pitch-rate damping gain of the SAS.
    #[serde(default)]
    pub pitch_sas_gain: f64,
    /// Yaw-rate damping gain of the SAS.
    #[serde(default)]
    pub yaw_sas_gain: f64,
    /// Roll-rate damping gain of the SAS.
    #[serde(default)]
    pub roll_sas_gain: f64,
}

impl Default for ManualPilotAugmentedConfig {
    fn default() -> Self {
        Self {
            pitch_gload_per_stick: default_cas_gload(),
            roll_rate_per_stick: default_cas_roll_rate(),
            pitch_sas_gain: 0.0,
            yaw_sas_gain: 0.0,
            roll_sas_gain: 0.0,
        }
    }
}

fn default_cas_gload() -> f64 { 7.0 }
fn default_cas_roll_rate() -> AngularSpeed { AngularSpeed::from_degrees_per_sec(180.0) }

/// Configuration of the synthetic (script-driven) pilot.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SyntheticPilotConfig {
    /// Route plan flown at initialization, by name.
    #[serde(default)]
    pub planned_route: Option<String>,
}

/// Configuration of a regulated (hardware or guidance) autopilot.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegulatedPilotConfig {
    /// Route plan flown at initialization, by name.
    #[serde(default)]
    pub planned_route: Option<String>,
}
