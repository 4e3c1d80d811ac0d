use math::GeoPoint;
use serde::{Deserialize, Serialize};

/// A named route plan: an ordered sequence of waypoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Name used to reference the plan from pilot configuration.
    pub name: String,
    /// Waypoints of the plan, in flying order.
    pub waypoints: Vec<WaypointPlan>,
}

/// One waypoint of a route plan.
#[derive(Clone, Serialize, Deserialize)]
pub struct WaypointPlan {
    /// Geodetic position of the waypoint.
    pub position: GeoPoint,
    /// Speed to hold on the segment towards this waypoint.
    pub speed: SpeedSpec,
    /// Maximum turn g-load when turning at this waypoint.
    #[serde(default)]
    pub max_turn_g: Option<TurnGSpec>,
    /// Label other waypoints can `go_to`.
    #[serde(default)]
    pub label: Option<String>,
    /// Label of the waypoint to continue with after this one.
    /// Permits simple cycles; an unmatched label terminates the route.
    #[serde(default)]
    pub go_to: Option<String>,
    /// Steer along the segment track with cross-track correction instead
    /// of heading directly at the waypoint.
    #[serde(default)]
    pub follow_horizontal_track: bool,
    /// Follow the altitude profile of the segment instead of capturing the
    /// waypoint altitude as quickly as possible.
    #[serde(default)]
    pub follow_vertical_track: bool,
    /// Achieve this waypoint on passing abeam rather than on approach.
    #[serde(default)]
    pub waypoint_on_passing: bool,
    /// Numerical identity of this waypoint.
    #[serde(default)]
    pub id: i32,
}

/// A speed in one of the accepted waypoint units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSpec {
    /// Mach number.
    Mach(f64),
    /// Knots true air speed.
    Ktas(f64),
    /// Knots calibrated air speed.
    Kcas(f64),
    /// Feet per second.
    Fps(f64),
    /// Statute miles per hour.
    Mph(f64),
    /// Meters per second.
    Mps(f64),
}

/// A turn g-load limit in one of the accepted references.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnGSpec {
    /// Load factor in the lateral (turn) plane.
    Lateral(f64),
    /// Load factor felt by the pilot.
    Pilot(f64),
}
