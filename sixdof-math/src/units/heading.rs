use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::hash::Hash;
use std::{fmt, ops};

use ordered_float::{FloatIsNan, NotNan};

use super::Angle;

#[cfg(test)]
mod tests;

/// An absolute directional bearing measured clockwise from true north.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Heading(
    Angle, // always -PI < heading <= PI
);

impl Heading {
    /// Heading north.
    pub const NORTH: Self = Self(Angle::new(0.0));
    /// Heading east.
    pub const EAST: Self = Self(Angle::new(FRAC_PI_2));
    /// Heading south.
    pub const SOUTH: Self = Self(Angle::new(PI));
    /// Heading west.
    pub const WEST: Self = Self(Angle::new(FRAC_PI_2 * 3.0));

    /// Heading northeast.
    pub const NORTHEAST: Self = Self(Angle::new(FRAC_PI_4));
    /// Heading southeast.
    pub const SOUTHEAST: Self = Self(Angle::new(FRAC_PI_2 + FRAC_PI_4));
    /// Heading southwest.
    pub const SOUTHWEST: Self = Self(Angle::new(PI + FRAC_PI_4));
    /// Heading northwest.
    pub const NORTHWEST: Self = Self(Angle::new(PI + FRAC_PI_2 + FRAC_PI_4));

    /// Creates a heading from an absolute bearing.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self { Self::from_radians(Angle::from_degrees(degrees)) }

    /// Returns the heading in degrees in the range 0..360.
    #[must_use]
    pub fn degrees(self) -> f64 {
        let degrees = self.0.into_degrees();
        if degrees < 0.0 { degrees + 360.0 } else { degrees }
    }

    /// Creates a heading from an absolute bearing in radians.
    #[must_use]
    pub fn from_radians(radians: Angle) -> Self { Self(radians.normalized()) }

    /// Returns the heading of the local north/east displacement vector.
    ///
    /// Returns a NaN heading if and only if the components are zero or NaN.
    #[must_use]
    pub fn from_north_east(north: f64, east: f64) -> Self { Self(Angle::atan2(east, north)) }

    /// Returns the heading in radians in the range `-STRAIGHT < value <= STRAIGHT`.
    #[must_use]
    pub fn radians(self) -> Angle { self.0 }

    /// Northward component of the unit vector along this heading.
    #[must_use]
    pub fn north(self) -> f64 { self.0.cos() }

    /// Eastward component of the unit vector along this heading.
    #[must_use]
    pub fn east(self) -> f64 { self.0.sin() }

    /// Returns the heading as an ordered value.
    ///
    /// # Errors
    /// Returns an error if the heading is NaN.
    pub fn as_ordered(self) -> Result<impl Copy + Ord + Hash, FloatIsNan> {
        NotNan::new(self.0.into_radians())
    }

    /// Radians to turn from `self` to `other` in the given direction.
    /// The output is always in the range [0, FULL) for `Clockwise`,
    /// or (-FULL, 0] for `CounterClockwise`.
    #[must_use]
    pub fn distance(self, other: Heading, dir: TurnDirection) -> Angle {
        let mut output = (other.0 - self.0) % Angle::FULL;
        match dir {
            TurnDirection::Clockwise => {
                if output.is_negative() {
                    output += Angle::FULL;
                }
            }
            TurnDirection::CounterClockwise => {
                if output.is_positive() {
                    output -= Angle::FULL;
                }
            }
        }

        output
    }

    /// Returns the signed angle closest to zero such that
    /// adding it to `self` approximately returns `other`.
    #[must_use]
    pub fn closest_distance(self, other: Heading) -> Angle {
        self.distance(other, self.closer_direction_to(other))
    }

    /// Returns the closer direction to turn towards `other`.
    ///
    /// The result is unspecified if the headings are exactly opposite or equal.
    #[must_use]
    pub fn closer_direction_to(self, other: Heading) -> TurnDirection {
        if self.distance(other, TurnDirection::Clockwise) < Angle::STRAIGHT {
            TurnDirection::Clockwise
        } else {
            TurnDirection::CounterClockwise
        }
    }

    /// Rotate by `delta` radians in the direction of `dir`.
    #[must_use]
    pub fn add_direction(self, dir: TurnDirection, delta: Angle) -> Self {
        match dir {
            TurnDirection::CounterClockwise => self - delta,
            TurnDirection::Clockwise => self + delta,
        }
    }

    /// Checks whether `self` is in the non-reflex angle between `a` and `b`.
    ///
    /// The result is unspecified if `a` and `b` are exactly opposite.
    #[must_use]
    pub fn is_between(self, a: Heading, b: Heading) -> bool {
        let ab_dir = a.closer_direction_to(b);
        let ab_dist = a.distance(b, ab_dir);
        let a_self_dist = a.distance(self, ab_dir);

        a_self_dist.abs() < ab_dist * a_self_dist.signum()
    }

    /// Returns the opposite direction of this heading.
    #[must_use]
    pub fn opposite(self) -> Self { self + Angle::STRAIGHT }

    /// Turns towards the desired heading, but does not exceed the maximum turn angle.
    ///
    /// `max_turn` must be non-negative.
    #[must_use]
    pub fn restricted_turn(self, desired: Heading, max_turn: Angle) -> Self {
        self + self.closest_distance(desired).clamp(-max_turn, max_turn)
    }

    /// Returns the midpoint of the non-reflex angle between the receiver and `other`.
    #[must_use]
    pub fn closest_midpoint(self, other: Heading) -> Heading {
        self + self.closest_distance(other) * 0.5
    }

    /// Checks that the heading is within `tolerance` of `expected`,
    /// for assertions in tests.
    ///
    /// # Errors
    /// Returns a human-readable message when the check fails.
    pub fn assert_near(self, expected: Heading, tolerance: Angle) -> Result<(), String> {
        if self.closest_distance(expected).abs() <= tolerance.abs() {
            Ok(())
        } else {
            Err(format!(
                "{self:?} is not within {tolerance:?} of expected {expected:?}"
            ))
        }
    }
}

impl fmt::Debug for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heading").field("degrees", &self.degrees()).finish()
    }
}

/// Returns the shortest bearing change such that
/// adding the return value to `other` approximately yields `self`.
impl ops::Sub for Heading {
    type Output = Angle;
    fn sub(self, other: Self) -> Angle {
        if (self.0 - other.0).abs() <= Angle::STRAIGHT {
            self.0 - other.0
        } else if self.0 > other.0 {
            self.0 - (other.0 + Angle::FULL)
        } else {
            self.0 + Angle::FULL - other.0
        }
    }
}

impl ops::Add<Angle> for Heading {
    type Output = Self;
    /// Offsets `self` by `angle` clockwise.
    fn add(self, angle: Angle) -> Self { Self((self.0 + angle).normalized()) }
}

impl ops::AddAssign<Angle> for Heading {
    /// Offsets `self` by `angle` clockwise.
    fn add_assign(&mut self, angle: Angle) { *self = *self + angle; }
}

impl ops::Sub<Angle> for Heading {
    type Output = Self;
    /// Offsets `self` by `angle` counter-clockwise.
    fn sub(self, angle: Angle) -> Self { self + (-angle) }
}

impl ops::SubAssign<Angle> for Heading {
    fn sub_assign(&mut self, angle: Angle) { *self = *self - angle; }
}

/// The direction for yaw change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TurnDirection {
    /// A left, counter-clockwise turn generating negative yaw speed.
    CounterClockwise,
    /// A right, clockwise turn generating positive yaw speed.
    Clockwise,
}

impl ops::Neg for TurnDirection {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            TurnDirection::CounterClockwise => TurnDirection::Clockwise,
            TurnDirection::Clockwise => TurnDirection::CounterClockwise,
        }
    }
}

macro_rules! impl_angle_mul_dir {
    ($ty:ty) => {
        impl ops::Mul<TurnDirection> for $ty {
            type Output = Self;

            fn mul(self, dir: TurnDirection) -> Self {
                if dir == TurnDirection::CounterClockwise { -self } else { self }
            }
        }
    };
}

impl_angle_mul_dir!(Angle);
impl_angle_mul_dir!(super::AngularSpeed);
impl_angle_mul_dir!(super::AngularAccel);
