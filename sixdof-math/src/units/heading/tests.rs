use super::{Heading, TurnDirection};
use crate::units::Angle;

const EPSILON: Angle = Angle::from_radians(1e-9);

#[test]
fn heading_from_north_east() {
    Heading::from_north_east(0.0, 1.0)
        .assert_near(Heading::EAST, EPSILON)
        .expect("(0, 1) is eastward");
    Heading::from_north_east(0.0, -1.0)
        .assert_near(Heading::WEST, EPSILON)
        .expect("(0, -1) is westward");
    Heading::from_north_east(1.0, 0.0)
        .assert_near(Heading::NORTH, EPSILON)
        .expect("(1, 0) is northward");
    Heading::from_north_east(-1.0, 0.0)
        .assert_near(Heading::SOUTH, EPSILON)
        .expect("(-1, 0) is southward");
}

#[test]
fn heading_from_degrees() {
    Heading::from_degrees(-90.0)
        .assert_near(Heading::WEST, EPSILON)
        .expect("-90 degrees is westward");
    Heading::from_degrees(-270.0)
        .assert_near(Heading::EAST, EPSILON)
        .expect("-270 degrees is eastward");
    Heading::from_degrees(-360.0)
        .assert_near(Heading::NORTH, EPSILON)
        .expect("-360 degrees is northward");
    Heading::from_degrees(270.0)
        .assert_near(Heading::WEST, EPSILON)
        .expect("270 degrees is westward");
    Heading::from_degrees(180.0)
        .assert_near(Heading::SOUTH, EPSILON)
        .expect("180 degrees is southward");
}

#[test]
fn heading_distance() {
    Heading::WEST
        .distance(Heading::NORTH, TurnDirection::Clockwise)
        .assert_near(Angle::RIGHT, EPSILON)
        .expect("90 degrees right from west to north");
    Heading::WEST
        .distance(Heading::NORTH, TurnDirection::CounterClockwise)
        .assert_near(Angle::RIGHT * -3.0, EPSILON)
        .expect("270 degrees left from west to north");

    Heading::EAST
        .distance(Heading::WEST, TurnDirection::Clockwise)
        .assert_near(Angle::STRAIGHT, EPSILON)
        .expect("180 degrees from east to west");

    Heading::NORTH
        .distance(Heading::NORTH, TurnDirection::Clockwise)
        .assert_near(Angle::ZERO, EPSILON)
        .expect("0 degrees for equal");
}

#[test]
fn heading_closer_direction() {
    assert_eq!(
        Heading::NORTH.closer_direction_to(Heading::EAST),
        TurnDirection::Clockwise,
        "right turn from north to east"
    );
    assert_eq!(
        Heading::NORTH.closer_direction_to(Heading::WEST),
        TurnDirection::CounterClockwise,
        "left turn from north to west"
    );
    assert_eq!(
        Heading::from_degrees(-1.0).closer_direction_to(Heading::from_degrees(1.0)),
        TurnDirection::Clockwise,
        "right turn crossing north"
    );
    assert_eq!(
        Heading::from_degrees(1.0).closer_direction_to(Heading::from_degrees(-1.0)),
        TurnDirection::CounterClockwise,
        "left turn crossing north"
    );
}

#[test]
fn heading_closest_distance() {
    Heading::from_degrees(350.0)
        .closest_distance(Heading::from_degrees(10.0))
        .assert_near(Angle::from_degrees(20.0), EPSILON)
        .expect("20 degrees right across north");
    Heading::from_degrees(10.0)
        .closest_distance(Heading::from_degrees(350.0))
        .assert_near(Angle::from_degrees(-20.0), EPSILON)
        .expect("20 degrees left across north");
}

#[test]
fn heading_is_between() {
    assert!(
        Heading::NORTH.is_between(Heading::from_degrees(-1.0), Heading::from_degrees(1.0)),
        "north is between -1 and 1 degrees"
    );
    assert!(
        !Heading::SOUTH.is_between(Heading::from_degrees(-1.0), Heading::from_degrees(1.0)),
        "south is not between -1 and 1 degrees"
    );
}

#[test]
fn heading_restricted_turn() {
    Heading::NORTH
        .restricted_turn(Heading::EAST, Angle::from_degrees(30.0))
        .assert_near(Heading::from_degrees(30.0), EPSILON)
        .expect("limited to 30 degrees of the turn to east");
    Heading::NORTH
        .restricted_turn(Heading::from_degrees(10.0), Angle::from_degrees(30.0))
        .assert_near(Heading::from_degrees(10.0), EPSILON)
        .expect("within the limit the turn completes");
}
