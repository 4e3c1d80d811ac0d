//! Standard-atmosphere conversions consumed by the waypoint speed types.
//!
//! ISA with a linear troposphere and an isothermal layer above the
//! tropopause. All altitudes are geometric feet above mean sea level.

use crate::{Length, Speed};

#[cfg(test)]
mod tests;

/// Sea-level temperature, degrees Rankine.
pub const SEA_LEVEL_TEMPERATURE_R: f64 = 518.67;
/// Tropospheric lapse rate, degrees Rankine per foot.
pub const LAPSE_RATE_R_PER_FT: f64 = 0.0035662;
/// Altitude of the tropopause, feet.
pub const TROPOPAUSE_ALT_FT: f64 = 36089.24;
/// Temperature above the tropopause, degrees Rankine.
pub const TROPOPAUSE_TEMPERATURE_R: f64 = 389.97;
/// Sea-level speed of sound, ft/s.
pub const SEA_LEVEL_SPEED_OF_SOUND_FPS: f64 = 1116.45;
/// Sea-level air density, slug/ft^3.
pub const SEA_LEVEL_DENSITY_SLUG_FT3: f64 = 0.0023769;
/// Pressure-ratio exponent of the troposphere.
const PRESSURE_EXPONENT: f64 = 5.2559;
/// Scale height of the isothermal layer, feet.
const ISOTHERMAL_SCALE_HEIGHT_FT: f64 = 20806.0;

/// Static temperature ratio `T / T0` at the given altitude.
#[must_use]
pub fn temperature_ratio(alt: Length) -> f64 {
    let alt_ft = alt.into_feet();
    if alt_ft < TROPOPAUSE_ALT_FT {
        (SEA_LEVEL_TEMPERATURE_R - LAPSE_RATE_R_PER_FT * alt_ft) / SEA_LEVEL_TEMPERATURE_R
    } else {
        TROPOPAUSE_TEMPERATURE_R / SEA_LEVEL_TEMPERATURE_R
    }
}

/// Static pressure ratio `p / p0` at the given altitude.
#[must_use]
pub fn pressure_ratio(alt: Length) -> f64 {
    let alt_ft = alt.into_feet();
    if alt_ft < TROPOPAUSE_ALT_FT {
        temperature_ratio(alt).powf(PRESSURE_EXPONENT)
    } else {
        let at_tropopause = (TROPOPAUSE_TEMPERATURE_R / SEA_LEVEL_TEMPERATURE_R)
            .powf(PRESSURE_EXPONENT - 1.0)
            * (TROPOPAUSE_TEMPERATURE_R / SEA_LEVEL_TEMPERATURE_R);
        at_tropopause * (-(alt_ft - TROPOPAUSE_ALT_FT) / ISOTHERMAL_SCALE_HEIGHT_FT).exp()
    }
}

/// Density ratio `rho / rho0` at the given altitude.
#[must_use]
pub fn density_ratio(alt: Length) -> f64 { pressure_ratio(alt) / temperature_ratio(alt) }

/// Air density at the given altitude, slug/ft^3.
#[must_use]
pub fn density_slug_ft3(alt: Length) -> f64 { SEA_LEVEL_DENSITY_SLUG_FT3 * density_ratio(alt) }

/// Speed of sound at the given altitude.
#[must_use]
pub fn speed_of_sound(alt: Length) -> Speed {
    Speed::from_fps(SEA_LEVEL_SPEED_OF_SOUND_FPS * temperature_ratio(alt).sqrt())
}

/// True airspeed corresponding to the given Mach number at altitude.
#[must_use]
pub fn fps_from_mach(alt: Length, mach: f64) -> Speed { speed_of_sound(alt) * mach }

/// Mach number corresponding to the given true airspeed at altitude.
#[must_use]
pub fn mach_from_fps(alt: Length, speed: Speed) -> f64 { speed / speed_of_sound(alt) }

/// True airspeed corresponding to the given knots true air speed.
/// Altitude-independent; exists for symmetry with the other conversions.
#[must_use]
pub fn fps_from_ktas(ktas: f64) -> Speed { Speed::from_knots(ktas) }

/// True airspeed corresponding to the given knots calibrated air speed
/// at altitude, using the equivalent-airspeed approximation.
#[must_use]
pub fn fps_from_kcas(alt: Length, kcas: f64) -> Speed {
    Speed::from_knots(kcas / density_ratio(alt).sqrt())
}

/// Calibrated airspeed (equivalent-airspeed approximation) for a true
/// airspeed at altitude, in knots.
#[must_use]
pub fn kcas_from_fps(alt: Length, tas: Speed) -> f64 {
    (tas * density_ratio(alt).sqrt()).into_knots()
}

/// Dynamic pressure at the given altitude and true airspeed, lb/ft^2.
#[must_use]
pub fn dynamic_pressure_psf(alt: Length, tas: Speed) -> f64 {
    0.5 * density_slug_ft3(alt) * tas.into_fps() * tas.into_fps()
}
