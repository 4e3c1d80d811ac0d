use super::{
    density_ratio, dynamic_pressure_psf, fps_from_kcas, fps_from_ktas, fps_from_mach,
    mach_from_fps, speed_of_sound,
};
use crate::{Length, Speed};

#[test]
fn sea_level_speed_of_sound() {
    speed_of_sound(Length::ZERO)
        .assert_near(Speed::from_fps(1116.45), Speed::from_fps(0.01))
        .expect("ISA sea-level speed of sound");
}

#[test]
fn tropopause_speed_of_sound() {
    // Above the tropopause the temperature is constant, so the speed of
    // sound stops decreasing.
    let at_40k = speed_of_sound(Length::from_feet(40000.0));
    let at_50k = speed_of_sound(Length::from_feet(50000.0));
    at_40k.assert_near(at_50k, Speed::from_fps(1e-6)).expect("isothermal layer");
    at_40k
        .assert_near(Speed::from_fps(968.1), Speed::from_fps(1.0))
        .expect("stratospheric speed of sound");
}

#[test]
fn mach_round_trip() {
    let alt = Length::from_feet(25000.0);
    let speed = fps_from_mach(alt, 0.8);
    assert!((mach_from_fps(alt, speed) - 0.8).abs() < 1e-12);
}

#[test]
fn kcas_equals_ktas_at_sea_level() {
    fps_from_kcas(Length::ZERO, 250.0)
        .assert_near(fps_from_ktas(250.0), Speed::from_fps(1e-9))
        .expect("no compressibility correction at sea level");
}

#[test]
fn kcas_faster_than_ktas_aloft() {
    let tas = fps_from_kcas(Length::from_feet(30000.0), 250.0);
    assert!(
        tas > fps_from_ktas(250.0),
        "a fixed CAS corresponds to a higher TAS at altitude"
    );
}

#[test]
fn density_decreases_with_altitude() {
    assert!(density_ratio(Length::ZERO) > density_ratio(Length::from_feet(10000.0)));
    assert!(
        density_ratio(Length::from_feet(10000.0)) > density_ratio(Length::from_feet(45000.0))
    );
}

#[test]
fn sea_level_dynamic_pressure() {
    // q = 0.5 * 0.0023769 * 1000^2
    let q = dynamic_pressure_psf(Length::ZERO, Speed::from_fps(1000.0));
    assert!((q - 1188.45).abs() < 0.01);
}
