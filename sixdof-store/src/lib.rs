//! Schema for vehicle configuration files.

#![forbid(missing_docs)]

use serde::{Deserialize, Serialize};

mod meta;
pub use meta::*;

mod vehicle;
pub use vehicle::*;

mod autopilot;
pub use autopilot::*;

mod support;
pub use support::*;

mod pilot;
pub use pilot::*;

mod route;
pub use route::*;

/// Root structure for a vehicle configuration file.
#[derive(Clone, Serialize, Deserialize)]
pub struct File {
    /// Metadata about the file.
    pub meta: Meta,
    /// Physical description of the vehicle consumed by the response model
    /// and the throttle-bias computation.
    pub vehicle: VehicleConfig,
    /// Autopilot configuration: control method, loop rates, PID gains and
    /// the limits-and-settings envelope.
    pub autopilot: AutopilotConfig,
    /// Aerodynamic support curves and tables for feed-forward and
    /// envelope limiting.
    #[serde(default)]
    pub support: SupportTables,
    /// Pilot sources and the name of the initially active one.
    pub pilot_manager: PilotManagerConfig,
    /// Route plans that pilots may fly.
    #[serde(default)]
    pub routes: Vec<RoutePlan>,
}
