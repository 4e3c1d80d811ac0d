use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;
use std::{fmt, ops};

use crate::Sign;

mod heading;
pub use heading::{Heading, TurnDirection};

/// Converts nautical miles to feet.
pub const FEET_PER_NM: f64 = 6076.115;
/// Converts knots to feet per second.
pub const FPS_PER_KNOT: f64 = 1.68781;
/// Converts statute miles per hour to feet per second.
pub const FPS_PER_MPH: f64 = 1.46667;
/// Converts meters to feet.
pub const FEET_PER_METER: f64 = 3.28084;
/// Converts minutes to seconds.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd)]
        pub struct $name(f64);

        impl $name {
            pub const ZERO: Self = Self(0.0);

            #[must_use]
            pub const fn new(raw: f64) -> Self { Self(raw) }

            #[must_use]
            pub const fn get(self) -> f64 { self.0 }

            #[must_use]
            pub fn abs(self) -> Self { Self(self.0.abs()) }

            #[must_use]
            pub fn signum(self) -> f64 { self.0.signum() }

            #[must_use]
            pub fn copysign(self, other: Self) -> Self { Self(self.0.copysign(other.0)) }

            #[must_use]
            pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0)) }

            #[must_use]
            pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0)) }

            #[must_use]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                Self(self.0.clamp(min.0, max.0))
            }

            #[must_use]
            pub fn midpoint(self, other: Self) -> Self { Self(self.0.midpoint(other.0)) }

            #[must_use]
            pub fn lerp(self, other: Self, s: f64) -> Self {
                Self(crate::lerp(self.0, other.0, s))
            }

            /// Inverse lerp function.
            #[must_use]
            pub fn ratio_between(self, start: Self, end: Self) -> f64 {
                crate::unlerp(start.0, end.0, self.0)
            }

            #[must_use]
            pub fn is_positive(self) -> bool { self.0 > 0.0 }

            #[must_use]
            pub fn is_negative(self) -> bool { self.0 < 0.0 }

            #[must_use]
            pub fn is_zero(self) -> bool { self.0 == 0.0 }

            #[must_use]
            pub fn is_finite(self) -> bool { self.0.is_finite() }

            #[must_use]
            pub fn sign(self) -> Sign {
                if self.0 == 0.0 {
                    Sign::Zero
                } else if self.0 < 0.0 {
                    Sign::Negative
                } else {
                    Sign::Positive
                }
            }

            /// Checks that the value is within `tolerance` of `expected`,
            /// for assertions in tests.
            ///
            /// # Errors
            /// Returns a human-readable message when the check fails.
            pub fn assert_near(self, expected: Self, tolerance: Self) -> Result<(), String> {
                if (self - expected).abs() <= tolerance.abs() {
                    Ok(())
                } else {
                    Err(format!(
                        "{self:?} is not within {tolerance:?} of expected {expected:?}"
                    ))
                }
            }
        }

        impl ops::Add for $name {
            type Output = Self;
            fn add(self, other: Self) -> Self { Self(self.0 + other.0) }
        }

        impl ops::AddAssign for $name {
            fn add_assign(&mut self, other: Self) { self.0 += other.0; }
        }

        impl ops::Sub for $name {
            type Output = Self;
            fn sub(self, other: Self) -> Self { Self(self.0 - other.0) }
        }

        impl ops::SubAssign for $name {
            fn sub_assign(&mut self, other: Self) { self.0 -= other.0; }
        }

        impl ops::Neg for $name {
            type Output = Self;
            fn neg(self) -> Self { Self(-self.0) }
        }

        impl ops::Mul<f64> for $name {
            type Output = Self;
            fn mul(self, other: f64) -> Self { Self(self.0 * other) }
        }

        impl ops::MulAssign<f64> for $name {
            fn mul_assign(&mut self, other: f64) { self.0 *= other; }
        }

        impl ops::Div<f64> for $name {
            type Output = Self;
            fn div(self, other: f64) -> Self { Self(self.0 / other) }
        }

        impl ops::Div for $name {
            type Output = f64;
            fn div(self, other: Self) -> f64 { self.0 / other.0 }
        }

        impl ops::Rem for $name {
            type Output = Self;
            fn rem(self, other: Self) -> Self { Self(self.0 % other.0) }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |sum, value| sum + value)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = f64::deserialize(d)?;
                if raw.is_finite() {
                    Ok(Self(raw))
                } else {
                    Err(<D::Error as serde::de::Error>::custom("non-finite quantity"))
                }
            }
        }
    };
}

quantity! {
    /// A relative angle. Internal representation is in radians.
    Angle
}

quantity! {
    /// A distance quantity. Internal representation is in feet.
    Length
}

quantity! {
    /// A linear speed quantity. Internal representation is in ft/s.
    Speed
}

quantity! {
    /// A linear acceleration quantity. Internal representation is in ft/s^2.
    Accel
}

quantity! {
    /// An angular speed quantity. Internal representation is in rad/s.
    AngularSpeed
}

quantity! {
    /// An angular acceleration quantity. Internal representation is in rad/s^2.
    AngularAccel
}

impl Angle {
    pub const RIGHT: Self = Self(FRAC_PI_2);
    pub const STRAIGHT: Self = Self(PI);
    pub const FULL: Self = Self(TAU);

    #[must_use]
    pub const fn from_radians(radians: f64) -> Self { Self(radians) }

    #[must_use]
    pub const fn into_radians(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_degrees(degrees: f64) -> Self { Self(degrees.to_radians()) }

    #[must_use]
    pub fn into_degrees(self) -> f64 { self.0.to_degrees() }

    #[must_use]
    pub fn sin(self) -> f64 { self.0.sin() }

    #[must_use]
    pub fn cos(self) -> f64 { self.0.cos() }

    #[must_use]
    pub fn tan(self) -> f64 { self.0.tan() }

    #[must_use]
    pub fn atan2(y: f64, x: f64) -> Self { Self(y.atan2(x)) }

    #[must_use]
    pub fn asin_clamped(ratio: f64) -> Self { Self(ratio.clamp(-1.0, 1.0).asin()) }

    /// Wraps the angle into `(-STRAIGHT, STRAIGHT]`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.0 %= TAU;
        if self.0 > PI {
            self.0 -= TAU;
        } else if self.0 <= -PI {
            self.0 += TAU;
        }
        self
    }

    /// Returns the slope of a line whose angle of elevation is the receiver value.
    ///
    /// The angle is clamped to `-RIGHT..=RIGHT`; the endpoints map to
    /// negative/positive infinity. Monotonic over the clamped range.
    #[must_use]
    pub fn acute_signed_tan(self) -> f64 {
        if self <= -Self::RIGHT {
            f64::NEG_INFINITY
        } else if self >= Self::RIGHT {
            f64::INFINITY
        } else {
            self.0.tan()
        }
    }
}

impl Length {
    #[must_use]
    pub const fn from_feet(feet: f64) -> Self { Self(feet) }

    #[must_use]
    pub const fn into_feet(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_meters(meters: f64) -> Self { Self(meters * FEET_PER_METER) }

    #[must_use]
    pub const fn into_meters(self) -> f64 { self.0 / FEET_PER_METER }

    #[must_use]
    pub const fn from_nm(nm: f64) -> Self { Self(nm * FEET_PER_NM) }

    #[must_use]
    pub const fn into_nm(self) -> f64 { self.0 / FEET_PER_NM }
}

impl Speed {
    #[must_use]
    pub const fn from_fps(fps: f64) -> Self { Self(fps) }

    #[must_use]
    pub const fn into_fps(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_knots(knots: f64) -> Self { Self(knots * FPS_PER_KNOT) }

    #[must_use]
    pub const fn into_knots(self) -> f64 { self.0 / FPS_PER_KNOT }

    #[must_use]
    pub const fn from_fpm(fpm: f64) -> Self { Self(fpm / SECONDS_PER_MINUTE) }

    #[must_use]
    pub const fn into_fpm(self) -> f64 { self.0 * SECONDS_PER_MINUTE }

    #[must_use]
    pub const fn from_mps(mps: f64) -> Self { Self(mps * FEET_PER_METER) }

    #[must_use]
    pub const fn into_mps(self) -> f64 { self.0 / FEET_PER_METER }

    #[must_use]
    pub const fn from_mph(mph: f64) -> Self { Self(mph * FPS_PER_MPH) }

    #[must_use]
    pub const fn into_mph(self) -> f64 { self.0 / FPS_PER_MPH }
}

impl Accel {
    #[must_use]
    pub const fn from_fps2(fps2: f64) -> Self { Self(fps2) }

    #[must_use]
    pub const fn into_fps2(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_gees(gees: f64) -> Self { Self(gees * crate::STANDARD_GRAVITY_FPS2) }

    #[must_use]
    pub const fn into_gees(self) -> f64 { self.0 / crate::STANDARD_GRAVITY_FPS2 }
}

impl AngularSpeed {
    #[must_use]
    pub const fn from_radians_per_sec(rps: f64) -> Self { Self(rps) }

    #[must_use]
    pub const fn into_radians_per_sec(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_degrees_per_sec(dps: f64) -> Self { Self(dps.to_radians()) }

    #[must_use]
    pub fn into_degrees_per_sec(self) -> f64 { self.0.to_degrees() }
}

impl AngularAccel {
    #[must_use]
    pub const fn from_degrees_per_sec2(dps2: f64) -> Self { Self(dps2.to_radians()) }

    #[must_use]
    pub fn into_degrees_per_sec2(self) -> f64 { self.0.to_degrees() }
}

impl ops::Mul<Duration> for Speed {
    type Output = Length;
    fn mul(self, dt: Duration) -> Length { Length(self.0 * dt.as_secs_f64()) }
}

impl ops::Mul<Duration> for Accel {
    type Output = Speed;
    fn mul(self, dt: Duration) -> Speed { Speed(self.0 * dt.as_secs_f64()) }
}

impl ops::Mul<Duration> for AngularSpeed {
    type Output = Angle;
    fn mul(self, dt: Duration) -> Angle { Angle(self.0 * dt.as_secs_f64()) }
}

impl ops::Mul<Duration> for AngularAccel {
    type Output = AngularSpeed;
    fn mul(self, dt: Duration) -> AngularSpeed { AngularSpeed(self.0 * dt.as_secs_f64()) }
}

impl ops::Div<Duration> for Length {
    type Output = Speed;
    fn div(self, dt: Duration) -> Speed { Speed(self.0 / dt.as_secs_f64()) }
}

impl ops::Div<Duration> for Speed {
    type Output = Accel;
    fn div(self, dt: Duration) -> Accel { Accel(self.0 / dt.as_secs_f64()) }
}

impl ops::Div<Duration> for Angle {
    type Output = AngularSpeed;
    fn div(self, dt: Duration) -> AngularSpeed { AngularSpeed(self.0 / dt.as_secs_f64()) }
}

impl Length {
    /// Time to cover this distance at `speed`, or `None` when the speed is
    /// non-positive or the distance is negative.
    #[must_use]
    pub fn try_div(self, speed: Speed) -> Option<Duration> {
        Duration::try_from_secs_f64(self.0 / speed.0).ok()
    }

    /// Arc length of this radius swept at `angular`, as a linear speed.
    #[must_use]
    pub fn radius_to_arc(self, angular: AngularSpeed) -> Speed { Speed(self.0 * angular.0) }
}

impl Speed {
    /// Radius of the circle traced at this speed under `angular` turn rate.
    #[must_use]
    pub fn arc_to_radius(self, angular: AngularSpeed) -> Length { Length(self.0 / angular.0) }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Angle").field("degrees", &self.into_degrees()).finish()
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("feet", &self.into_feet())
            .field("nm", &self.into_nm())
            .finish()
    }
}

impl fmt::Debug for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("fps", &self.into_fps())
            .field("knots", &self.into_knots())
            .finish()
    }
}

impl fmt::Debug for Accel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accel").field("fps2", &self.into_fps2()).finish()
    }
}

impl fmt::Debug for AngularSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AngularSpeed").field("degrees/s", &self.into_degrees_per_sec()).finish()
    }
}

impl fmt::Debug for AngularAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AngularAccel").field("degrees/s2", &self.into_degrees_per_sec2()).finish()
    }
}
