use std::ops::{Add, Sub};

use serde::Serialize;

use crate::telemetry::GeodeticCoordinate;

/// Mean radius for the spherical-earth approximation, metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// North/east/down offset in metres. In the base-relative frame the axes are
/// forward/right/down instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LocalOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocalOffset {
    pub const ZERO: LocalOffset = LocalOffset {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Rotates the horizontal plane by `angle_rad`, leaving `z` alone.
    pub fn rotated(&self, angle_rad: f64) -> Self {
        let (sin, cos) = angle_rad.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            z: self.z,
        }
    }
}

impl Sub for LocalOffset {
    type Output = LocalOffset;

    fn sub(self, rhs: LocalOffset) -> LocalOffset {
        LocalOffset::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add for LocalOffset {
    type Output = LocalOffset;

    fn add(self, rhs: LocalOffset) -> LocalOffset {
        LocalOffset::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Great-circle distance in metres (haversine).
pub fn greatcircle(from: &GeodeticCoordinate, to: &GeodeticCoordinate) -> f64 {
    let (lat1, lat2) = (from.lat_rad(), to.lat_rad());
    let dlat = lat2 - lat1;
    let dlon = to.lon_rad() - from.lon_rad();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).max(0.0).sqrt())
}

/// Initial bearing from `from` to `to`, radians clockwise from north.
pub fn initial_bearing(from: &GeodeticCoordinate, to: &GeodeticCoordinate) -> f64 {
    let (lat1, lat2) = (from.lat_rad(), to.lat_rad());
    let dlon = to.lon_rad() - from.lon_rad();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Offset of `point` from a fixed `origin`. `z` is positive when the point is
/// below the origin.
pub fn local_offset(point: &GeodeticCoordinate, origin: &GeodeticCoordinate) -> LocalOffset {
    let distance = greatcircle(origin, point);
    let bearing = if distance > 0.0 {
        initial_bearing(origin, point)
    } else {
        0.0
    };
    LocalOffset {
        x: distance * bearing.cos(),
        y: distance * bearing.sin(),
        z: origin.altitude - point.altitude,
    }
}

/// Moves `v` into a frame centred on `base` and rotated by `rotation_rad`.
/// Passing the negated ground track of the base aligns `x` with its direction
/// of travel and `y` with its right-hand side.
pub fn base_relative(v: LocalOffset, base: LocalOffset, rotation_rad: f64) -> LocalOffset {
    (v - base).rotated(rotation_rad)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn metres_to_degrees(metres: f64) -> f64 {
        (metres / EARTH_RADIUS_M).to_degrees()
    }

    fn assert_offset(actual: LocalOffset, expected: LocalOffset, tolerance: f64) {
        assert!(
            (actual - expected).norm() < tolerance,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_self_transform_is_zero() {
        for point in [
            GeodeticCoordinate::new(0.0, 0.0, 0.0),
            GeodeticCoordinate::new(47.3, 8.5, 4200.0),
            GeodeticCoordinate::new(-33.9, 151.2, 12.0),
            GeodeticCoordinate::new(89.9, -179.9, 1000.0),
        ] {
            assert_eq!(local_offset(&point, &point), LocalOffset::ZERO);
        }
    }

    #[test]
    fn test_pure_north_displacement() {
        let origin = GeodeticCoordinate::new(47.0, 8.0, 3000.0);
        let point = GeodeticCoordinate::new(47.0 + metres_to_degrees(250.0), 8.0, 3000.0);
        assert_offset(local_offset(&point, &origin), LocalOffset::new(250.0, 0.0, 0.0), 1e-3);
    }

    #[test]
    fn test_pure_east_displacement() {
        let origin = GeodeticCoordinate::new(0.0, 8.0, 3000.0);
        let point = GeodeticCoordinate::new(0.0, 8.0 + metres_to_degrees(250.0), 3000.0);
        assert_offset(local_offset(&point, &origin), LocalOffset::new(0.0, 250.0, 0.0), 1e-3);
    }

    #[test]
    fn test_east_displacement_at_latitude() {
        let origin = GeodeticCoordinate::new(47.0, 8.0, 0.0);
        let dlon = metres_to_degrees(100.0) / 47.0_f64.to_radians().cos();
        let point = GeodeticCoordinate::new(47.0, 8.0 + dlon, 0.0);
        let offset = local_offset(&point, &origin);
        assert!((offset.y - 100.0).abs() < 0.01);
        assert!(offset.x.abs() < 0.1);
    }

    #[test]
    fn test_altitude_increase_is_negative_down() {
        let origin = GeodeticCoordinate::new(47.0, 8.0, 3000.0);
        let point = GeodeticCoordinate::new(47.0, 8.0, 3120.0);
        let offset = local_offset(&point, &origin);
        assert_offset(offset, LocalOffset::new(0.0, 0.0, -120.0), EPSILON);
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let v = LocalOffset::new(12.5, -3.0, 7.0);
        assert_eq!(base_relative(v, LocalOffset::ZERO, 0.0), v);
    }

    #[test]
    fn test_quarter_turn() {
        let v = LocalOffset::new(10.0, 0.0, 0.0);
        let rotated = base_relative(v, LocalOffset::ZERO, 90f64.to_radians());
        assert_offset(rotated, LocalOffset::new(0.0, 10.0, 0.0), 1e-12);
    }

    #[test]
    fn test_base_is_subtracted_before_rotation() {
        let v = LocalOffset::new(15.0, 5.0, 2.0);
        let base = LocalOffset::new(5.0, 5.0, 1.0);
        let rotated = base_relative(v, base, -90f64.to_radians());
        assert_offset(rotated, LocalOffset::new(0.0, -10.0, 1.0), 1e-12);
    }

    #[test]
    fn test_greatcircle_london_paris() {
        let london = GeodeticCoordinate::new(51.5074, -0.1278, 0.0);
        let paris = GeodeticCoordinate::new(48.8566, 2.3522, 0.0);
        let distance = greatcircle(&london, &paris);
        assert!((distance - 344_000.0).abs() < 5000.0, "distance {}", distance);
    }
}
