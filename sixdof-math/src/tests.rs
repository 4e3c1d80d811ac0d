use std::time::Duration;

use crate::{Accel, Angle, Length, Speed};

#[test]
fn unit_conversions() {
    Length::from_nm(1.0)
        .assert_near(Length::from_feet(6076.115), Length::from_feet(1e-9))
        .expect("nm to feet");
    Speed::from_knots(1.0)
        .assert_near(Speed::from_fps(1.68781), Speed::from_fps(1e-9))
        .expect("knots to fps");
    Speed::from_fpm(600.0)
        .assert_near(Speed::from_fps(10.0), Speed::from_fps(1e-9))
        .expect("fpm to fps");
    Accel::from_gees(2.0)
        .assert_near(Accel::from_fps2(64.348), Accel::from_fps2(1e-9))
        .expect("gees to fps2");
}

#[test]
fn duration_arithmetic() {
    let dt = Duration::from_millis(500);
    (Speed::from_fps(100.0) * dt)
        .assert_near(Length::from_feet(50.0), Length::from_feet(1e-9))
        .expect("speed times duration");
    (Length::from_feet(100.0) / dt)
        .assert_near(Speed::from_fps(200.0), Speed::from_fps(1e-9))
        .expect("length over duration");
}

#[test]
fn angle_normalization() {
    Angle::from_degrees(370.0)
        .normalized()
        .assert_near(Angle::from_degrees(10.0), Angle::from_radians(1e-9))
        .expect("wraps above full circle");
    Angle::from_degrees(-190.0)
        .normalized()
        .assert_near(Angle::from_degrees(170.0), Angle::from_radians(1e-9))
        .expect("wraps below negative straight");
}

#[test]
fn acute_signed_tan_endpoints() {
    assert_eq!(Angle::RIGHT.acute_signed_tan(), f64::INFINITY);
    assert_eq!((-Angle::RIGHT).acute_signed_tan(), f64::NEG_INFINITY);
    assert!(Angle::from_degrees(45.0).acute_signed_tan() - 1.0 < 1e-12);
}

#[test]
fn try_div_rejects_degenerate_speeds() {
    assert!(Length::from_feet(100.0).try_div(Speed::ZERO).is_none());
    assert!(Length::from_feet(100.0).try_div(Speed::from_fps(-5.0)).is_none());
    assert_eq!(
        Length::from_feet(100.0).try_div(Speed::from_fps(50.0)),
        Some(Duration::from_secs(2))
    );
}
