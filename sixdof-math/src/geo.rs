//! Spherical-earth geodesy used by waypoint navigation.

use std::fmt;

use bevy_math::DVec2;

use crate::{Angle, EARTH_RADIUS_FT, Heading, Length};

#[cfg(test)]
mod tests;

/// A geodetic position: latitude/longitude on a spherical earth plus
/// altitude above mean sea level.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    /// Latitude, positive north.
    pub lat: Angle,
    /// Longitude, positive east.
    pub lon: Angle,
    /// Altitude above mean sea level.
    pub alt: Length,
}

impl GeoPoint {
    #[must_use]
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt: Length) -> Self {
        Self { lat: Angle::from_degrees(lat_deg), lon: Angle::from_degrees(lon_deg), alt }
    }

    /// Great-circle initial bearing from `self` towards `other`.
    ///
    /// Returns north when the two points are horizontally coincident.
    #[must_use]
    pub fn initial_bearing(self, other: GeoPoint) -> Heading {
        let dlon = (other.lon - self.lon).into_radians();
        let (lat1, lat2) = (self.lat.into_radians(), other.lat.into_radians());

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        if y == 0.0 && x == 0.0 {
            Heading::NORTH
        } else {
            Heading::from_north_east(x, y)
        }
    }

    /// Great-circle ground range to `other` (haversine).
    #[must_use]
    pub fn ground_range(self, other: GeoPoint) -> Length {
        let dlat = (other.lat - self.lat).into_radians();
        let dlon = (other.lon - self.lon).into_radians();

        let a = (dlat * 0.5).sin().powi(2)
            + self.lat.into_radians().cos()
                * other.lat.into_radians().cos()
                * (dlon * 0.5).sin().powi(2);
        let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();
        Length::from_feet(EARTH_RADIUS_FT * c)
    }

    /// Straight-line range to `other` including the altitude difference.
    #[must_use]
    pub fn slant_range(self, other: GeoPoint) -> Length {
        let ground = self.ground_range(other).into_feet();
        let dalt = (other.alt - self.alt).into_feet();
        Length::from_feet(ground.hypot(dalt))
    }

    /// Elevation angle of the line from `self` to `other`.
    #[must_use]
    pub fn slope_to(self, other: GeoPoint) -> Angle {
        Angle::atan2((other.alt - self.alt).into_feet(), self.ground_range(other).into_feet())
    }

    /// Destination point after traveling `distance` along `bearing`.
    ///
    /// The altitude of the result is the altitude of the receiver.
    #[must_use]
    pub fn offset(self, bearing: Heading, distance: Length) -> GeoPoint {
        let delta = distance.into_feet() / EARTH_RADIUS_FT;
        let theta = bearing.radians().into_radians();
        let lat1 = self.lat.into_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = self.lon.into_radians()
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        GeoPoint {
            lat: Angle::from_radians(lat2),
            lon: Angle::from_radians(lon2).normalized(),
            alt: self.alt,
        }
    }

    /// Local flat-earth displacement of `other` relative to `self`
    /// as (north, east) feet. Valid for short ranges only.
    #[must_use]
    pub fn local_offset_ft(self, other: GeoPoint) -> DVec2 {
        let north = (other.lat - self.lat).into_radians() * EARTH_RADIUS_FT;
        let east =
            (other.lon - self.lon).into_radians() * EARTH_RADIUS_FT * self.lat.into_radians().cos();
        DVec2::new(north, east)
    }

    /// Signed cross-track distance of the receiver from the great-circle track
    /// `start -> end`. Positive when the receiver is right of the track.
    #[must_use]
    pub fn cross_track_distance(self, start: GeoPoint, end: GeoPoint) -> Length {
        let d13 = start.ground_range(self).into_feet() / EARTH_RADIUS_FT;
        let theta13 = start.initial_bearing(self).radians().into_radians();
        let theta12 = start.initial_bearing(end).radians().into_radians();

        let xt = (d13.sin() * (theta13 - theta12).sin()).asin();
        Length::from_feet(xt * EARTH_RADIUS_FT)
    }
}

impl fmt::Debug for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoPoint")
            .field("lat_deg", &self.lat.into_degrees())
            .field("lon_deg", &self.lon.into_degrees())
            .field("alt_ft", &self.alt.into_feet())
            .finish()
    }
}
