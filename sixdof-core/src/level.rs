//! Per-step simulation of the flight-control core.

use bevy::app::{self, App, Plugin};
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::SystemSet;
use itertools::Itertools;
use strum::IntoEnumIterator;

pub mod autopilot;
pub mod pilot;
pub mod route;
pub mod vehicle;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        for set in SystemSets::iter() {
            app.configure_sets(app::Update, set.in_set(AllSystemSets));
        }

        for (before, after) in SystemSets::iter().tuple_windows() {
            app.configure_sets(app::Update, before.before(after));
        }

        app.add_plugins(vehicle::Plug);
        app.add_plugins(pilot::Plug);
    }
}

/// Execution phases of one simulation step.
///
/// The core is single-threaded and cooperative: each vehicle is driven by
/// exactly one pass through these phases per step, and commands issued
/// during a step take effect at the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet, strum::EnumIter)]
pub enum SystemSets {
    /// Queued pilot commands are applied and arbitration picks the active
    /// pilot source.
    Action,
    /// The active pilot translates its action into actuator commands.
    Aviate,
    /// Vehicle kinematics respond to the actuator commands.
    ExecuteEnviron,
    /// Telemetry components are reconciled for external readers.
    ReconcileForRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub struct AllSystemSets;
