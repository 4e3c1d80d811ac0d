//! Loading and validation of vehicle configuration files.
//!
//! Configuration and initialization errors surface synchronously here and
//! abort the vehicle; nothing past this point fails at runtime.

use std::borrow::Cow;
use std::io;

use bevy::ecs::entity::Entity;
use bevy::prelude::{Command as BevyCommand, World};
use math::{GeoPoint, Heading, Speed};
use store::ActivePilot;

use crate::level::autopilot::aero::{AeroTables, SupportTableError};
use crate::level::autopilot::CommonController;
use crate::level::pilot::{
    InputShaping, PilotCommon, PilotManager, PilotSource, PilotStatus, RegulatedPilot,
};
use crate::level::route::{Route, RouteError};
use crate::level::vehicle::{Kinematics, ResponseModel, SpawnCommand, VehicleData};
use crate::pid::{GainRow, GainTable, GainTableError, Pid, PidFlags, PidGroup};


pub enum Source {
    Raw(Cow<'static, [u8]>),
    Parsed(Box<store::File>),
}

/// Initial placement of the spawned vehicle.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub position: GeoPoint,
    pub heading: Heading,
    pub speed: Speed,
    pub on_ground: bool,
}

pub struct Command {
    pub source: Source,
    pub placement: Placement,
    pub on_error: Box<dyn FnOnce(&mut World, Error) + Send>,
}

impl BevyCommand for Command {
    fn apply(self, world: &mut World) {
        if let Err(err) = do_load(world, &self.source, self.placement) {
            (self.on_error)(world, err);
        }
    }
}

/// Parses, validates and spawns one vehicle. Returns the spawned entity.
pub fn do_load(world: &mut World, source: &Source, placement: Placement) -> Result<Entity, Error> {
    let file_owned: store::File;
    let file = match source {
        Source::Raw(bytes) => {
            file_owned = ciborium::from_reader(bytes.as_ref()).map_err(Error::Serde)?;
            &file_owned
        }
        Source::Parsed(file) => file,
    };

    validate_loop_factors(&file.autopilot)?;

    let pids = build_pid_group(&file.autopilot.pid_group)?;
    let aero = AeroTables::from_config(&file.support)?;
    let shaping = InputShaping::from_config(&file.pilot_manager.control_inputs)?;

    let routes = build_routes(&file.routes)?;
    let manager = build_pilot_manager(file, &pids, &aero, shaping, &routes)?;

    let mut kinematics =
        Kinematics::level_flight(placement.position, placement.heading, placement.speed);
    kinematics.on_ground = placement.on_ground;

    let entity = world.spawn((manager, PilotStatus::default()));
    let entity_id = entity.id();
    bevy::ecs::system::EntityCommand::apply(
        SpawnCommand {
            kinematics,
            data: VehicleData::from_config(&file.vehicle),
            response: ResponseModel(file.vehicle.response.clone()),
        },
        entity,
    );

    Ok(entity_id)
}

fn validate_loop_factors(config: &store::AutopilotConfig) -> Result<(), Error> {
    let factors = [
        ("vertical_middle_loop_rate_factor", config.vertical_middle_loop_rate_factor),
        ("lateral_middle_loop_rate_factor", config.lateral_middle_loop_rate_factor),
        ("speed_middle_loop_rate_factor", config.speed_middle_loop_rate_factor),
        ("vertical_outer_loop_rate_factor", config.vertical_outer_loop_rate_factor),
        ("lateral_outer_loop_rate_factor", config.lateral_outer_loop_rate_factor),
        ("speed_outer_loop_rate_factor", config.speed_outer_loop_rate_factor),
    ];
    for (key, value) in factors {
        if !(1..=254).contains(&value) {
            return Err(Error::LoopFactor { key, value });
        }
    }
    Ok(())
}

/// Builds one PID from its configuration, deriving the feature flags from
/// which tuning values are present.
fn build_pid(config: &store::PidConfig, name: &'static str) -> Result<Pid, Error> {
    let tabular = !config.gain_table.is_empty();
    if tabular && config.has_scalar_data() {
        return Err(Error::MixedPidGains { name });
    }

    let mut flags = PidFlags::empty();
    let rows: Vec<GainRow> = if tabular {
        config
            .gain_table
            .iter()
            .map(|row| {
                if row.low_pass_alpha.is_some() {
                    flags |= PidFlags::USE_ALPHA;
                }
                if row.max_error_accum.is_some() {
                    flags |= PidFlags::LIMIT_MAX;
                }
                if row.ignore_large_error_accum.is_some() {
                    flags |= PidFlags::ZERO_GT_MAX;
                }
                if row.ignore_small_error_accum.is_some() {
                    flags |= PidFlags::ZERO_LT_MIN;
                }
                if row.kt_anti_windup_gain.is_some() {
                    flags |= PidFlags::USE_KT;
                }
                GainRow {
                    control_value: row.control_value,
                    kp: row.kp,
                    ki: row.ki,
                    kd: row.kd,
                    max_accum: row.max_error_accum.unwrap_or_default(),
                    lowpass_alpha: row.low_pass_alpha.unwrap_or_default(),
                    max_error_zero: row.ignore_large_error_accum.unwrap_or_default(),
                    min_error_zero: row.ignore_small_error_accum.unwrap_or_default(),
                    kt: row.kt_anti_windup_gain.unwrap_or_default(),
                }
            })
            .collect()
    } else {
        if config.low_pass_alpha.is_some() {
            flags |= PidFlags::USE_ALPHA;
        }
        if config.max_error_accum.is_some() {
            flags |= PidFlags::LIMIT_MAX;
        }
        if config.ignore_large_error_accum.is_some() {
            flags |= PidFlags::ZERO_GT_MAX;
        }
        if config.ignore_small_error_accum.is_some() {
            flags |= PidFlags::ZERO_LT_MIN;
        }
        if config.kt_anti_windup_gain.is_some() {
            flags |= PidFlags::USE_KT;
        }
        vec![GainRow {
            control_value: 0.0,
            kp: config.kp.unwrap_or_default(),
            ki: config.ki.unwrap_or_default(),
            kd: config.kd.unwrap_or_default(),
            max_accum: config.max_error_accum.unwrap_or_default(),
            lowpass_alpha: config.low_pass_alpha.unwrap_or_default(),
            max_error_zero: config.ignore_large_error_accum.unwrap_or_default(),
            min_error_zero: config.ignore_small_error_accum.unwrap_or_default(),
            kt: config.kt_anti_windup_gain.unwrap_or_default(),
        }]
    };

    let table = GainTable::new(rows).map_err(|source| Error::GainTable { name, source })?;
    Ok(Pid::new(table, flags))
}

/// Builds the full PID group of the autopilot.
pub fn build_pid_group(config: &store::PidGroupConfig) -> Result<PidGroup, Error> {
    Ok(PidGroup {
        alpha: build_pid(&config.pid_alpha, "pid_alpha")?,
        vert_speed: build_pid(&config.pid_vert_speed, "pid_vert_speed")?,
        pitch_angle: build_pid(&config.pid_pitch_angle, "pid_pitch_angle")?,
        pitch_rate: build_pid(&config.pid_pitch_rate, "pid_pitch_rate")?,
        fltpath_angle: build_pid(&config.pid_flightpath_angle, "pid_flightpath_angle")?,
        delta_pitch: build_pid(&config.pid_delta_pitch, "pid_delta_pitch")?,
        altitude: build_pid(&config.pid_altitude, "pid_altitude")?,
        beta: build_pid(&config.pid_beta, "pid_beta")?,
        yaw_rate: build_pid(&config.pid_yaw_rate, "pid_yaw_rate")?,
        yaw_heading: build_pid(&config.pid_yaw_heading, "pid_yaw_heading")?,
        taxi_heading: build_pid(&config.pid_taxi_heading, "pid_taxi_heading")?,
        roll_rate: build_pid(&config.pid_roll_rate, "pid_roll_rate")?,
        delta_roll: build_pid(&config.pid_delta_roll, "pid_delta_roll")?,
        bank_angle: build_pid(&config.pid_bank_angle, "pid_bank_angle")?,
        roll_heading: build_pid(&config.pid_roll_heading, "pid_roll_heading")?,
        forward_accel: build_pid(&config.pid_forward_accel, "pid_forward_accel")?,
        speed: build_pid(&config.pid_speed, "pid_speed")?,
        taxi_forward_accel: build_pid(&config.pid_taxi_forward_accel, "pid_taxi_forward_accel")?,
        taxi_speed: build_pid(&config.pid_taxi_speed, "pid_taxi_speed")?,
        taxi_yaw_rate: build_pid(&config.pid_taxi_yaw_rate, "pid_taxi_yaw_rate")?,
    })
}

fn build_routes(plans: &[store::RoutePlan]) -> Result<Vec<(String, Route)>, Error> {
    plans
        .iter()
        .map(|plan| {
            Route::from_plan(plan)
                .map(|route| (plan.name.clone(), route))
                .map_err(|source| Error::Route { name: plan.name.clone(), source })
        })
        .collect()
}

fn find_route(routes: &[(String, Route)], name: &str) -> Result<Route, Error> {
    routes
        .iter()
        .find(|(route_name, _)| route_name == name)
        .map(|(_, route)| route.clone())
        .ok_or_else(|| Error::UnknownRoute(name.to_owned()))
}

fn build_pilot_manager(
    file: &store::File,
    pids: &PidGroup,
    aero: &AeroTables,
    shaping: InputShaping,
    routes: &[(String, Route)],
) -> Result<PilotManager, Error> {
    let config = &file.pilot_manager;

    if config.hardware_autopilot_bank_to_turn.is_some()
        && config.hardware_autopilot_skid_to_turn.is_some()
    {
        return Err(Error::DuplicatePilot { family: "hardware_autopilot" });
    }
    if config.guidance_autopilot_bank_to_turn.is_some()
        && config.guidance_autopilot_skid_to_turn.is_some()
    {
        return Err(Error::DuplicatePilot { family: "guidance_autopilot" });
    }

    let controller =
        || CommonController::new(&file.autopilot, pids.clone(), aero.clone());

    let regulated = |planned: &Option<String>,
                     autopilot_enabled_default: bool|
     -> Result<(RegulatedPilot, PilotCommon), Error> {
        let mut pilot = RegulatedPilot::new(controller());
        let mut enabled = autopilot_enabled_default;
        if let Some(name) = planned {
            pilot.set_planned_route(find_route(routes, name)?);
            enabled = true;
        }
        let common = PilotCommon { autopilot_enabled: enabled, ..PilotCommon::default() };
        Ok((pilot, common))
    };

    let mut pilots = Vec::new();

    if let Some(manual) = &config.manual_pilot_simple_controls {
        pilots.push(PilotSource::ManualSimple {
            common: PilotCommon::default(),
            yaw_damper: manual.simple_yaw_damper,
        });
    }
    if let Some(manual) = &config.manual_pilot_augmented_controls {
        pilots.push(PilotSource::ManualAugmented {
            common: PilotCommon::default(),
            cas: manual.clone(),
            regulated: RegulatedPilot::new(controller()),
        });
    }
    if let Some(synthetic) = &config.synthetic_pilot {
        let (pilot, common) = regulated(&synthetic.planned_route, false)?;
        pilots.push(PilotSource::Synthetic { common, regulated: pilot });
    }
    if let Some(hardware) = &config.hardware_autopilot_bank_to_turn {
        let (pilot, common) = regulated(&hardware.planned_route, true)?;
        pilots.push(PilotSource::HardwareBankToTurn { common, regulated: pilot });
    }
    if let Some(hardware) = &config.hardware_autopilot_skid_to_turn {
        let (pilot, common) = regulated(&hardware.planned_route, true)?;
        pilots.push(PilotSource::HardwareSkidToTurn { common, regulated: pilot });
    }
    if let Some(guidance) = &config.guidance_autopilot_bank_to_turn {
        let (pilot, common) = regulated(&guidance.planned_route, true)?;
        pilots.push(PilotSource::GuidanceBankToTurn { common, regulated: pilot });
    }
    if let Some(guidance) = &config.guidance_autopilot_skid_to_turn {
        let (pilot, common) = regulated(&guidance.planned_route, true)?;
        pilots.push(PilotSource::GuidanceSkidToTurn { common, regulated: pilot });
    }

    if pilots.is_empty() {
        return Err(Error::NoPilotDeclared);
    }

    let family = match config.active_pilot {
        ActivePilot::ManualPilot => crate::level::pilot::PilotFamily::Manual,
        ActivePilot::SyntheticPilot => crate::level::pilot::PilotFamily::Synthetic,
        ActivePilot::HardwareAutopilot => crate::level::pilot::PilotFamily::HardwareAutopilot,
        ActivePilot::GuidanceAutopilot => crate::level::pilot::PilotFamily::GuidanceAutopilot,
    };
    let active = pilots
        .iter()
        .position(|pilot| pilot.kind().family() == family)
        .ok_or(Error::UnknownActivePilot { family: config.active_pilot })?;

    Ok(PilotManager::new(pilots, active, shaping, file.autopilot.use_simple_yaw_damper))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Deserialization error: {0}")]
    Serde(ciborium::de::Error<io::Error>),
    #[error("PID {name} mixes scalar gains with a gain table")]
    MixedPidGains { name: &'static str },
    #[error("PID {name}: {source}")]
    GainTable {
        name: &'static str,
        source: GainTableError,
    },
    #[error("{0}")]
    SupportTable(#[from] SupportTableError),
    #[error("{key} must be within 1..=254, got {value}")]
    LoopFactor { key: &'static str, value: u8 },
    #[error("More than one {family} pilot defined")]
    DuplicatePilot { family: &'static str },
    #[error("No pilot declared in pilot_manager")]
    NoPilotDeclared,
    #[error("active_pilot {family:?} names a pilot that was not defined")]
    UnknownActivePilot { family: ActivePilot },
    #[error("Route {name:?}: {source}")]
    Route { name: String, source: RouteError },
    #[error("No route called {0:?}")]
    UnknownRoute(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
