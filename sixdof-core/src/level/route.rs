//! Routes, segment geometry and the waypoint navigator.

use std::time::Duration;

use math::{
    Angle, GeoPoint, Heading, Length, STANDARD_GRAVITY_FPS2, Speed, atmosphere,
};
use store::{SpeedSpec, TurnGSpec};

#[cfg(test)]
mod tests;

/// A runtime waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Geodetic position.
    pub position: GeoPoint,
    /// Speed to hold on the segment towards this waypoint.
    pub speed: SpeedSpec,
    /// Turn g-load limit when turning at this waypoint.
    pub max_turn_g: Option<TurnGSpec>,
    /// Label other waypoints can `go_to`.
    pub label: Option<String>,
    /// Label of the waypoint flown after this one.
    pub go_to: Option<String>,
    /// Steer along the segment track with cross-track correction.
    pub follow_horizontal_track: bool,
    /// Follow the altitude profile of the segment.
    pub follow_vertical_track: bool,
    /// Achieve on passing abeam rather than on approach.
    pub waypoint_on_passing: bool,
    /// Numerical identity.
    pub id: i32,
}

impl Waypoint {
    #[must_use]
    pub fn from_plan(plan: &store::WaypointPlan) -> Self {
        Self {
            position: plan.position,
            speed: plan.speed,
            max_turn_g: plan.max_turn_g,
            label: plan.label.clone(),
            go_to: plan.go_to.clone(),
            follow_horizontal_track: plan.follow_horizontal_track,
            follow_vertical_track: plan.follow_vertical_track,
            waypoint_on_passing: plan.waypoint_on_passing,
            id: plan.id,
        }
    }
}

/// Precomputed geometry of the leg from one waypoint to its successor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSegment {
    /// Ground range of the leg.
    pub track_distance: Length,
    /// Initial bearing at the start of the leg.
    pub start_heading: Heading,
    /// Bearing on arrival at the end of the leg.
    pub end_heading: Heading,
    /// Straight-line range including the altitude change.
    pub slant_range: Length,
    /// Elevation angle of the leg.
    pub slope: Angle,
}

impl RouteSegment {
    /// Computes the leg geometry between two waypoints.
    #[must_use]
    pub fn between(from: &Waypoint, to: &Waypoint) -> Self {
        let track_distance = from.position.ground_range(to.position);
        let start_heading = from.position.initial_bearing(to.position);
        // Bearing on arrival is the reverse of the back-bearing.
        let end_heading = to.position.initial_bearing(from.position).opposite();
        Self {
            track_distance,
            start_heading,
            end_heading,
            slant_range: from.position.slant_range(to.position),
            slope: from.position.slope_to(to.position),
        }
    }
}

/// Rejection reasons for a route plan.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route has no waypoints")]
    Empty,
    #[error("waypoint {index} duplicates the position of its predecessor")]
    DuplicateWaypoint { index: usize },
}

/// An ordered sequence of waypoints with a precomputed segment map.
///
/// `go_to` labels are resolved at build time; a label that matches no
/// waypoint terminates the route at that point.
#[derive(Debug, Clone, Default)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    /// `segments[i]` is the leg from waypoint `i` to `next_index[i]`.
    segments: Vec<Option<RouteSegment>>,
    next_index: Vec<Option<usize>>,
}

impl Route {
    /// Builds a route from a stored plan.
    pub fn from_plan(plan: &store::RoutePlan) -> Result<Self, RouteError> {
        let mut route = Self::default();
        for waypoint in &plan.waypoints {
            route.push_waypoint(Waypoint::from_plan(waypoint))?;
        }
        if route.waypoints.is_empty() {
            return Err(RouteError::Empty);
        }
        Ok(route)
    }

    /// Appends a waypoint, rejecting one at the identical position as its
    /// predecessor, and regenerates the segment map.
    pub fn push_waypoint(&mut self, waypoint: Waypoint) -> Result<(), RouteError> {
        if let Some(last) = self.waypoints.last() {
            if last.position == waypoint.position {
                return Err(RouteError::DuplicateWaypoint { index: self.waypoints.len() });
            }
        }
        self.waypoints.push(waypoint);
        self.regenerate_segments();
        Ok(())
    }

    /// Resolves follow-on indices and recomputes every segment.
    fn regenerate_segments(&mut self) {
        self.next_index = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, waypoint)| match &waypoint.go_to {
                Some(label) => self
                    .waypoints
                    .iter()
                    .position(|candidate| candidate.label.as_deref() == Some(label.as_str())),
                None => (index + 1 < self.waypoints.len()).then_some(index + 1),
            })
            .collect();

        self.segments = self
            .next_index
            .iter()
            .enumerate()
            .map(|(index, next)| {
                next.map(|next| {
                    RouteSegment::between(&self.waypoints[index], &self.waypoints[next])
                })
            })
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize { self.waypoints.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.waypoints.is_empty() }

    #[must_use]
    pub fn waypoint(&self, index: usize) -> Option<&Waypoint> { self.waypoints.get(index) }

    /// Index of the waypoint flown after `index`, honoring `go_to`.
    #[must_use]
    pub fn next_of(&self, index: usize) -> Option<usize> {
        self.next_index.get(index).copied().flatten()
    }

    /// Geometry of the leg from `index` to its successor.
    #[must_use]
    pub fn segment_from(&self, index: usize) -> Option<&RouteSegment> {
        self.segments.get(index).and_then(Option::as_ref)
    }
}

/// Resolves a typed waypoint speed to true airspeed at the given altitude.
#[must_use]
pub fn waypoint_speed(spec: SpeedSpec, alt: Length) -> Speed {
    match spec {
        SpeedSpec::Mach(mach) => atmosphere::fps_from_mach(alt, mach),
        SpeedSpec::Ktas(ktas) => atmosphere::fps_from_ktas(ktas),
        SpeedSpec::Kcas(kcas) => atmosphere::fps_from_kcas(alt, kcas),
        SpeedSpec::Fps(fps) => Speed::from_fps(fps),
        SpeedSpec::Mph(mph) => Speed::from_mph(mph),
        SpeedSpec::Mps(mps) => Speed::from_mps(mps),
    }
}

/// Bank angle ceiling equivalent to a turn g-load limit.
#[must_use]
pub fn bank_for_turn_g(spec: TurnGSpec) -> Angle {
    match spec {
        // tan(bank) = lateral g on a one-g vertical component.
        TurnGSpec::Lateral(g) => Angle::atan2(g.max(0.0), 1.0),
        // cos(bank) = 1 / pilot g.
        TurnGSpec::Pilot(g) => {
            if g <= 1.0 {
                Angle::ZERO
            } else {
                Angle::from_radians((1.0 / g).acos())
            }
        }
    }
}

/// Level-turn radius at `speed` and `bank`.
///
/// Degenerate bank collapses to an effectively-straight (huge) radius.
#[must_use]
pub fn turn_radius(speed: Speed, bank: Angle) -> Length {
    let tan_bank = bank.abs().tan();
    if tan_bank < 1e-6 {
        return Length::from_feet(1e10);
    }
    let v = speed.into_fps();
    Length::from_feet(v * v / (STANDARD_GRAVITY_FPS2 * tan_bank))
}

/// Level-turn radius at `speed` under a lateral acceleration of
/// `lateral_g` g.
#[must_use]
pub fn turn_radius_from_lateral_g(speed: Speed, lateral_g: f64) -> Length {
    if lateral_g < 1e-6 {
        return Length::from_feet(1e10);
    }
    let v = speed.into_fps();
    Length::from_feet(v * v / (STANDARD_GRAVITY_FPS2 * lateral_g))
}

/// Distance before a waypoint at which a turn through `turn_angle` must
/// begin to roll out on the next leg.
#[must_use]
pub fn turn_lead_distance(turn_angle: Angle, radius: Length) -> Length {
    let half = (turn_angle.abs() * 0.5).min(Angle::from_degrees(89.0));
    Length::from_feet(radius.into_feet() * half.tan())
}

/// Navigation solution of the waypoint navigator for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointNavData {
    /// Distance before the current waypoint at which the turn to the next
    /// leg begins.
    pub turn_lead_dist: Length,
    /// Heading the lateral channel should command.
    pub aim_heading: Heading,
    /// Ground range to the current waypoint.
    pub range_track: Length,
    /// Closing speed towards the current waypoint. Negative when opening.
    pub range_rate: Speed,
    /// Altitude of the current waypoint minus current altitude.
    pub delta_alt: Length,
    /// Vertical speed that follows the leg's altitude profile.
    pub vert_speed: Speed,
    /// Bank-angle ceiling for the lateral channel (bank-to-turn).
    pub commanded_bank: Angle,
    /// Lateral-acceleration ceiling for the lateral channel (yaw-to-turn).
    pub commanded_lateral_g: f64,
    /// Whether the turn to the next leg is in progress.
    pub execute_turn: bool,
    /// Direction of the pending turn.
    pub turn_direction: Option<math::TurnDirection>,
}

impl Default for WaypointNavData {
    fn default() -> Self {
        Self {
            turn_lead_dist: Length::ZERO,
            aim_heading: Heading::NORTH,
            range_track: Length::ZERO,
            range_rate: Speed::ZERO,
            delta_alt: Length::ZERO,
            vert_speed: Speed::ZERO,
            commanded_bank: Angle::ZERO,
            commanded_lateral_g: 0.0,
            execute_turn: false,
            turn_direction: None,
        }
    }
}

/// Inputs of one navigator evaluation.
pub struct NavInputs<'a> {
    pub prev: Option<&'a Waypoint>,
    pub curr: &'a Waypoint,
    pub next: Option<&'a Waypoint>,
    pub curr_segment: Option<&'a RouteSegment>,
    pub next_segment: Option<&'a RouteSegment>,
    pub position: GeoPoint,
    pub heading: Heading,
    pub speed: Speed,
    pub dt: Duration,
}

/// Cross-track correction look-ahead: the correction aims the vehicle at a
/// point this many seconds ahead on the track.
const TRACK_CAPTURE_LOOKAHEAD: Duration = Duration::from_secs(10);
/// Largest cross-track correction angle.
const MAX_TRACK_CORRECTION: Angle = Angle::from_degrees(30.0);

/// Computes aim heading, turn anticipation and the bank ceiling for
/// bank-to-turn waypoint navigation. Returns `true` when the current
/// waypoint has been achieved.
pub fn calc_aim_heading_and_bank(
    inputs: &NavInputs<'_>,
    nav: &mut WaypointNavData,
    waypoint_speed: Speed,
    roll_in_multiplier: f64,
    allowable_angle_error: Angle,
    bank_max: Angle,
) -> bool {
    let turn_bank = turn_bank_ceiling(inputs, bank_max);
    let radius = turn_radius(waypoint_speed, turn_bank);

    update_common_nav(inputs, nav, radius, turn_bank.abs(), roll_in_multiplier);
    nav.commanded_bank = turn_bank.abs();
    nav.commanded_lateral_g = turn_bank.abs().tan();

    achieved_waypoint(inputs, nav, allowable_angle_error, radius)
}

/// Yaw-to-turn variant: the ceiling is a lateral acceleration derived from
/// the pitch g-load limit instead of a bank angle.
pub fn calc_yaw_aim_heading(
    inputs: &NavInputs<'_>,
    nav: &mut WaypointNavData,
    allowable_angle_error: Angle,
    max_g: f64,
) -> bool {
    let lateral_g = turn_lateral_g_ceiling(inputs, max_g);
    let radius = turn_radius_from_lateral_g(inputs.speed, lateral_g);

    update_common_nav(inputs, nav, radius, Angle::ZERO, 1.0);
    nav.commanded_bank = Angle::ZERO;
    nav.commanded_lateral_g = lateral_g;

    achieved_waypoint(inputs, nav, allowable_angle_error, radius)
}

/// Taxi variant: the turn radius is an explicit configured value.
pub fn calc_taxi_aim_heading(
    inputs: &NavInputs<'_>,
    nav: &mut WaypointNavData,
    allowable_angle_error: Angle,
    taxi_radius: Length,
) -> bool {
    update_common_nav(inputs, nav, taxi_radius, Angle::ZERO, 1.0);
    nav.commanded_bank = Angle::ZERO;
    nav.commanded_lateral_g = 0.0;

    achieved_waypoint(inputs, nav, allowable_angle_error, taxi_radius)
}

/// Commanded vertical speed following the leg's altitude profile:
/// the altitude error closes at the same relative rate as the track range.
pub fn calc_vertical_speed(nav: &mut WaypointNavData) {
    if nav.range_track.into_feet() > 1.0 && nav.range_rate.is_positive() {
        nav.vert_speed = Speed::from_fps(
            nav.delta_alt.into_feet() * nav.range_rate.into_fps() / nav.range_track.into_feet(),
        );
    } else {
        nav.vert_speed = Speed::ZERO;
    }
}

fn turn_bank_ceiling(inputs: &NavInputs<'_>, bank_max: Angle) -> Angle {
    // The g-limit of the waypoint being turned at restricts the roll-in.
    let turn_g = inputs.curr.max_turn_g;
    match turn_g {
        Some(spec) => bank_for_turn_g(spec).min(bank_max),
        None => bank_max,
    }
}

fn turn_lateral_g_ceiling(inputs: &NavInputs<'_>, max_g: f64) -> f64 {
    match inputs.curr.max_turn_g {
        Some(TurnGSpec::Lateral(g)) => g.min(max_g),
        Some(TurnGSpec::Pilot(g)) => (g * g - 1.0).max(0.0).sqrt().min(max_g),
        None => max_g,
    }
}

fn update_common_nav(
    inputs: &NavInputs<'_>,
    nav: &mut WaypointNavData,
    radius: Length,
    _turn_bank: Angle,
    roll_in_multiplier: f64,
) {
    let direct_heading = inputs.position.initial_bearing(inputs.curr.position);
    nav.range_track = inputs.position.ground_range(inputs.curr.position);
    nav.range_rate =
        inputs.speed * (inputs.heading.closest_distance(direct_heading)).cos();
    nav.delta_alt = inputs.curr.position.alt - inputs.position.alt;

    // Aim heading: along-track with cross-track correction, or direct.
    nav.aim_heading = if inputs.curr.follow_horizontal_track {
        match (inputs.prev, inputs.curr_segment) {
            (Some(prev), Some(segment)) => {
                let cross_track =
                    inputs.position.cross_track_distance(prev.position, inputs.curr.position);
                let capture_dist =
                    (inputs.speed * TRACK_CAPTURE_LOOKAHEAD).into_feet().max(1.0);
                let correction = Angle::atan2(-cross_track.into_feet(), capture_dist)
                    .clamp(-MAX_TRACK_CORRECTION, MAX_TRACK_CORRECTION);
                segment.end_heading + correction
            }
            _ => direct_heading,
        }
    } else {
        direct_heading
    };

    // Turn anticipation towards the next leg.
    let turn_angle = match (inputs.curr_segment, inputs.next_segment) {
        (Some(curr), Some(next)) => curr.end_heading.closest_distance(next.start_heading),
        (None, Some(next)) => inputs.heading.closest_distance(next.start_heading),
        _ => Angle::ZERO,
    };

    nav.turn_lead_dist = if inputs.next_segment.is_some() {
        turn_lead_distance(turn_angle, radius) * roll_in_multiplier
    } else {
        Length::ZERO
    };

    if inputs.next_segment.is_some() && nav.range_track <= nav.turn_lead_dist {
        nav.execute_turn = true;
        nav.turn_direction = Some(if turn_angle.is_negative() {
            math::TurnDirection::CounterClockwise
        } else {
            math::TurnDirection::Clockwise
        });
    }
}

/// Waypoint achievement: the passing test inside the terminal area, or the
/// approach test when the bearing to the waypoint has swung past the
/// allowable route angle error.
fn achieved_waypoint(
    inputs: &NavInputs<'_>,
    nav: &WaypointNavData,
    allowable_angle_error: Angle,
    radius: Length,
) -> bool {
    let terminal_area = nav.range_track <= nav.turn_lead_dist.max(radius);

    // Passing test: within one step of the waypoint, or opening range
    // inside the terminal area.
    let step = inputs.speed * inputs.dt;
    let passed = nav.range_track < step.max(Length::ZERO)
        || (terminal_area && !nav.range_rate.is_positive());
    if passed {
        return true;
    }

    if inputs.curr.waypoint_on_passing {
        // Approach shortcuts disabled for this waypoint.
        return false;
    }

    // Approach test.
    let direct_heading = inputs.position.initial_bearing(inputs.curr.position);
    terminal_area && inputs.heading.closest_distance(direct_heading).abs() > allowable_angle_error
}
