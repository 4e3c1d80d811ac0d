use super::GeoPoint;
use crate::{Angle, Heading, Length};

const EPSILON: Angle = Angle::from_radians(1e-6);

fn point(lat_deg: f64, lon_deg: f64) -> GeoPoint {
    GeoPoint::from_degrees(lat_deg, lon_deg, Length::ZERO)
}

#[test]
fn bearing_cardinals() {
    let origin = point(30.0, -90.0);
    origin
        .initial_bearing(point(31.0, -90.0))
        .assert_near(Heading::NORTH, EPSILON)
        .expect("due north");
    origin
        .initial_bearing(point(29.0, -90.0))
        .assert_near(Heading::SOUTH, EPSILON)
        .expect("due south");
    origin
        .initial_bearing(point(30.0, -89.0))
        .assert_near(Heading::EAST, Angle::from_degrees(0.5))
        .expect("roughly due east");
}

#[test]
fn bearing_coincident_points_is_north() {
    let origin = point(10.0, 10.0);
    origin
        .initial_bearing(origin)
        .assert_near(Heading::NORTH, EPSILON)
        .expect("degenerate bearing defaults to north");
}

#[test]
fn one_degree_of_latitude() {
    let range = point(0.0, 0.0).ground_range(point(1.0, 0.0));
    // One degree of arc on the spherical earth is about 60 nm.
    range
        .assert_near(Length::from_nm(60.04), Length::from_nm(0.1))
        .expect("one degree of latitude is ~60 nm");
}

#[test]
fn offset_round_trip() {
    let origin = point(45.0, 10.0);
    let moved = origin.offset(Heading::from_degrees(77.0), Length::from_nm(25.0));

    origin
        .ground_range(moved)
        .assert_near(Length::from_nm(25.0), Length::from_feet(5.0))
        .expect("offset preserves range");
    origin
        .initial_bearing(moved)
        .assert_near(Heading::from_degrees(77.0), Angle::from_degrees(0.3))
        .expect("offset preserves bearing");
}

#[test]
fn slant_range_includes_altitude() {
    let low = point(0.0, 0.0);
    let mut high = low;
    high.alt = Length::from_feet(3000.0);

    low.slant_range(high)
        .assert_near(Length::from_feet(3000.0), Length::from_feet(1.0))
        .expect("vertical slant range is the altitude difference");
}

#[test]
fn cross_track_sign() {
    let start = point(0.0, 0.0);
    let end = point(1.0, 0.0); // northbound track

    let right = point(0.5, 0.1);
    assert!(
        right.cross_track_distance(start, end).is_positive(),
        "east of a northbound track is right of track"
    );

    let left = point(0.5, -0.1);
    assert!(
        left.cross_track_distance(start, end).is_negative(),
        "west of a northbound track is left of track"
    );
}
