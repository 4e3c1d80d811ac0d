use std::time::Duration;

use math::{Angle, GeoPoint, Heading, Length, STANDARD_GRAVITY_FPS2, Speed};
use store::{RoutePlan, SpeedSpec, TurnGSpec, WaypointPlan};

use super::{
    NavInputs, Route, RouteError, Waypoint, WaypointNavData, bank_for_turn_g,
    calc_aim_heading_and_bank, calc_vertical_speed, turn_lead_distance, turn_radius,
    waypoint_speed,
};

fn plan_waypoint(lat_deg: f64, lon_deg: f64, alt_ft: f64) -> WaypointPlan {
    WaypointPlan {
        position: GeoPoint::from_degrees(lat_deg, lon_deg, Length::from_feet(alt_ft)),
        speed: SpeedSpec::Ktas(250.0),
        max_turn_g: None,
        label: None,
        go_to: None,
        follow_horizontal_track: false,
        follow_vertical_track: false,
        waypoint_on_passing: false,
        id: 0,
    }
}

fn plan(waypoints: Vec<WaypointPlan>) -> RoutePlan {
    RoutePlan { name: "test".into(), waypoints }
}

#[test]
fn duplicate_adjacent_waypoint_rejected() {
    let result = Route::from_plan(&plan(vec![
        plan_waypoint(35.0, -117.0, 10000.0),
        plan_waypoint(35.0, -117.0, 10000.0),
    ]));
    assert!(
        matches!(result, Err(RouteError::DuplicateWaypoint { index: 1 })),
        "identical adjacent positions are rejected"
    );
}

#[test]
fn empty_route_rejected() {
    assert!(matches!(Route::from_plan(&plan(vec![])), Err(RouteError::Empty)));
}

#[test]
fn segments_cover_consecutive_legs() {
    let route = Route::from_plan(&plan(vec![
        plan_waypoint(35.0, -117.0, 10000.0),
        plan_waypoint(36.0, -117.0, 12000.0),
        plan_waypoint(36.0, -116.0, 12000.0),
    ]))
    .expect("valid route");

    assert_eq!(route.len(), 3);
    assert_eq!(route.next_of(0), Some(1));
    assert_eq!(route.next_of(1), Some(2));
    assert_eq!(route.next_of(2), None);

    let leg = route.segment_from(0).expect("segment 0 -> 1");
    leg.start_heading
        .assert_near(Heading::NORTH, Angle::from_degrees(0.5))
        .expect("northbound leg");
    leg.track_distance
        .assert_near(Length::from_nm(60.04), Length::from_nm(0.2))
        .expect("one degree of latitude");
    assert!(leg.slope.is_positive(), "climbing leg has a positive slope");

    assert!(route.segment_from(2).is_none(), "the last waypoint has no outgoing leg");
}

#[test]
fn go_to_label_forms_cycle() {
    let mut first = plan_waypoint(35.0, -117.0, 10000.0);
    first.label = Some("ALPHA".into());
    let second = plan_waypoint(36.0, -117.0, 10000.0);
    let mut third = plan_waypoint(36.0, -116.0, 10000.0);
    third.go_to = Some("ALPHA".into());

    let route = Route::from_plan(&plan(vec![first, second, third])).expect("valid route");

    assert_eq!(route.next_of(2), Some(0), "go_to jumps back to the labeled waypoint");
    let jump = route.segment_from(2).expect("segment of the jump leg");
    assert!(jump.track_distance.is_positive());
}

#[test]
fn unmatched_go_to_terminates_route() {
    let mut first = plan_waypoint(35.0, -117.0, 10000.0);
    first.go_to = Some("NOWHERE".into());
    let second = plan_waypoint(36.0, -117.0, 10000.0);

    let route = Route::from_plan(&plan(vec![first, second])).expect("valid route");
    assert_eq!(route.next_of(0), None, "an unmatched label ends the route");
    assert!(route.segment_from(0).is_none());
}

#[test]
fn waypoint_speed_conversions() {
    let alt = Length::from_feet(0.0);
    waypoint_speed(SpeedSpec::Fps(500.0), alt)
        .assert_near(Speed::from_fps(500.0), Speed::from_fps(1e-9))
        .expect("fps is verbatim");
    waypoint_speed(SpeedSpec::Ktas(250.0), alt)
        .assert_near(Speed::from_knots(250.0), Speed::from_fps(1e-9))
        .expect("ktas");
    waypoint_speed(SpeedSpec::Mps(100.0), alt)
        .assert_near(Speed::from_mps(100.0), Speed::from_fps(1e-9))
        .expect("mps");
    // Mach 0.5 at sea level is half the sea-level speed of sound.
    waypoint_speed(SpeedSpec::Mach(0.5), alt)
        .assert_near(Speed::from_fps(558.2), Speed::from_fps(0.1))
        .expect("mach");
}

#[test]
fn turn_geometry() {
    // R = v^2 / (g tan(bank))
    let radius = turn_radius(Speed::from_fps(500.0), Angle::from_degrees(45.0));
    radius
        .assert_near(
            Length::from_feet(500.0 * 500.0 / STANDARD_GRAVITY_FPS2),
            Length::from_feet(0.1),
        )
        .expect("45-degree bank radius");

    // L = R tan(theta/2): a 90-degree turn leads by exactly one radius.
    turn_lead_distance(Angle::RIGHT, radius)
        .assert_near(radius, Length::from_feet(0.1))
        .expect("90-degree turn leads by one radius");

    // Degenerate bank produces an effectively-straight radius, not inf.
    assert!(turn_radius(Speed::from_fps(500.0), Angle::ZERO).into_feet().is_finite());
}

#[test]
fn bank_ceiling_from_turn_g() {
    bank_for_turn_g(TurnGSpec::Lateral(1.0))
        .assert_near(Angle::from_degrees(45.0), Angle::from_degrees(1e-6))
        .expect("one lateral g is a 45-degree bank");
    bank_for_turn_g(TurnGSpec::Pilot(2.0))
        .assert_near(Angle::from_degrees(60.0), Angle::from_degrees(1e-6))
        .expect("two pilot g is a 60-degree bank");
    assert_eq!(bank_for_turn_g(TurnGSpec::Pilot(0.5)), Angle::ZERO);
}

struct NavFixture {
    route: Route,
    position: GeoPoint,
    heading: Heading,
    speed: Speed,
}

impl NavFixture {
    /// Two-leg dogleg: north for 10 nm, then east for 10 nm.
    fn dogleg() -> Self {
        let start = plan_waypoint(35.0, -117.0, 10000.0);
        let corner_pos = start.position.offset(Heading::NORTH, Length::from_nm(10.0));
        let end_pos = corner_pos.offset(Heading::EAST, Length::from_nm(10.0));
        let mut corner = plan_waypoint(0.0, 0.0, 10000.0);
        corner.position = corner_pos;
        let mut end = plan_waypoint(0.0, 0.0, 10000.0);
        end.position = end_pos;

        let position = start.position;
        let route =
            Route::from_plan(&plan(vec![start, corner, end])).expect("valid route");
        Self { route, position, heading: Heading::NORTH, speed: Speed::from_knots(250.0) }
    }

    fn inputs(&self) -> NavInputs<'_> {
        NavInputs {
            prev: Some(self.route.waypoint(0).expect("waypoint 0")),
            curr: self.route.waypoint(1).expect("waypoint 1"),
            next: self.route.waypoint(2),
            curr_segment: self.route.segment_from(0),
            next_segment: self.route.segment_from(1),
            position: self.position,
            heading: self.heading,
            speed: self.speed,
            dt: Duration::from_millis(20),
        }
    }
}

#[test]
fn aim_heading_points_at_current_waypoint() {
    let fixture = NavFixture::dogleg();
    let mut nav = WaypointNavData::default();

    let achieved = calc_aim_heading_and_bank(
        &fixture.inputs(),
        &mut nav,
        fixture.speed,
        1.0,
        Angle::from_degrees(3.0),
        Angle::from_degrees(45.0),
    );

    assert!(!achieved, "ten nm out is not achieved");
    nav.aim_heading
        .assert_near(Heading::NORTH, Angle::from_degrees(0.5))
        .expect("aim heading points up the leg");
    nav.range_track
        .assert_near(Length::from_nm(10.0), Length::from_nm(0.1))
        .expect("range to the corner");
    assert!(nav.range_rate.is_positive(), "closing on the waypoint");
    assert!(!nav.execute_turn, "no turn anticipation this far out");
}

#[test]
fn turn_anticipation_fires_at_lead_distance() {
    let mut fixture = NavFixture::dogleg();
    let mut nav = WaypointNavData::default();

    // The 90-degree corner leads by one turn radius (~1.2 nm at 250 kt
    // and 45 degrees of bank). Stand 0.5 nm short of the corner.
    let corner = fixture.route.waypoint(1).expect("corner").position;
    fixture.position = corner.offset(Heading::SOUTH, Length::from_nm(0.5));

    let achieved = calc_aim_heading_and_bank(
        &fixture.inputs(),
        &mut nav,
        fixture.speed,
        1.0,
        Angle::from_degrees(3.0),
        Angle::from_degrees(45.0),
    );

    assert!(nav.execute_turn, "inside the lead distance the turn begins");
    assert_eq!(nav.turn_direction, Some(math::TurnDirection::Clockwise), "right turn to east");
    assert!(nav.turn_lead_dist > Length::from_nm(0.5));
    assert!(
        nav.commanded_bank.assert_near(Angle::from_degrees(45.0), Angle::from_degrees(1e-6)).is_ok(),
        "bank ceiling is the configured maximum"
    );
    // Closing almost head-on and inside the terminal area: the passing
    // test has not fired yet because range is still decreasing.
    assert!(!achieved || nav.range_rate.is_positive());
}

#[test]
fn approach_test_fires_when_bearing_swings_past_allowable_error() {
    let mut fixture = NavFixture::dogleg();
    let mut nav = WaypointNavData::default();

    // Abeam the corner: 0.2 nm south, heading already east.
    let corner = fixture.route.waypoint(1).expect("corner").position;
    fixture.position = corner.offset(Heading::SOUTH, Length::from_nm(0.2));
    fixture.heading = Heading::EAST;

    let achieved = calc_aim_heading_and_bank(
        &fixture.inputs(),
        &mut nav,
        fixture.speed,
        1.0,
        Angle::from_degrees(3.0),
        Angle::from_degrees(45.0),
    );

    assert!(achieved, "90 degrees of bearing error inside the terminal area achieves");
}

#[test]
fn vertical_track_rate_closes_altitude_with_range() {
    let mut nav = WaypointNavData {
        range_track: Length::from_nm(10.0),
        range_rate: Speed::from_fps(400.0),
        delta_alt: Length::from_feet(2000.0),
        ..WaypointNavData::default()
    };
    calc_vertical_speed(&mut nav);

    // vs = delta_alt * closure / range
    let expected = Speed::from_fps(2000.0 * 400.0 / Length::from_nm(10.0).into_feet());
    nav.vert_speed.assert_near(expected, Speed::from_fps(1e-9)).expect("profile rate");

    // Opening range commands no vertical rate.
    nav.range_rate = Speed::from_fps(-50.0);
    calc_vertical_speed(&mut nav);
    assert_eq!(nav.vert_speed, Speed::ZERO);
}

#[test]
fn single_waypoint_route_relies_on_approach_test() {
    let single = Route::from_plan(&plan(vec![plan_waypoint(35.0, -117.0, 10000.0)]))
        .expect("valid route");
    let target = single.waypoint(0).expect("waypoint");

    // Heading away from the waypoint right next to it.
    let position = target.position.offset(Heading::NORTH, Length::from_feet(500.0));
    let inputs = NavInputs {
        prev: None,
        curr: target,
        next: None,
        curr_segment: None,
        next_segment: None,
        position,
        heading: Heading::NORTH,
        speed: Speed::from_knots(250.0),
        dt: Duration::from_millis(20),
    };

    let mut nav = WaypointNavData::default();
    let achieved = calc_aim_heading_and_bank(
        &inputs,
        &mut nav,
        Speed::from_knots(250.0),
        1.0,
        Angle::from_degrees(3.0),
        Angle::from_degrees(45.0),
    );

    assert_eq!(nav.turn_lead_dist, Length::ZERO, "no next leg, no lead distance");
    assert!(achieved, "opening range inside the terminal area achieves the waypoint");
}
