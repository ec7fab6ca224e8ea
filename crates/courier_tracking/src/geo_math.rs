//! Great-circle helpers used by the ETA engine and the session aggregator.
//!
//! All functions are pure and deterministic. Distances use a spherical earth
//! of radius [`EARTH_RADIUS`].

use serde::Serialize;

use crate::{
    geopoint::{EARTH_RADIUS, GeoPoint},
    meters::Meters,
};

/// Haversine distance between two points.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> Meters {
    Meters::new(a.haversine_distance(b))
}

/// Initial bearing from `a` towards `b`, in `[0, 360)` degrees.
pub fn bearing_degrees(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Point reached after travelling `distance` from `origin` along the great
/// circle leaving at `bearing` degrees.
pub fn destination_point(origin: &GeoPoint, bearing: f64, distance: Meters) -> GeoPoint {
    let angular = distance.value() / EARTH_RADIUS;
    let theta = bearing.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lng2 = lng1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(
        lat2.to_degrees(),
        (lng2.to_degrees() + 540.0) % 360.0 - 180.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentProjection {
    /// Position of the closest point along the segment, 0 at `a` and 1 at `b`.
    pub fraction: f64,
    pub closest: GeoPoint,
    pub distance: Meters,
}

/// Projects `p` onto the segment `a`-`b`.
///
/// Works on a local equirectangular plane centred on the segment, which is
/// accurate for the short segments of a delivery route. Segments crossing the
/// antimeridian are not handled.
pub fn project_onto_segment(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> SegmentProjection {
    let scale = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lng - a.lng) * scale;
    let dy = b.lat - a.lat;
    let px = (p.lng - a.lng) * scale;
    let py = p.lat - a.lat;

    let length_squared = dx * dx + dy * dy;
    let fraction = if length_squared > 0.0 {
        ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let closest = GeoPoint::new(
        a.lat + fraction * (b.lat - a.lat),
        a.lng + fraction * (b.lng - a.lng),
    );

    SegmentProjection {
        fraction,
        closest,
        distance: distance_meters(p, &closest),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathProjection {
    pub segment_index: usize,
    pub projection: SegmentProjection,
}

/// Closest projection of `p` onto a polyline. `None` when the path has fewer
/// than two points.
pub fn distance_to_path(p: &GeoPoint, path: &[GeoPoint]) -> Option<PathProjection> {
    path.windows(2)
        .enumerate()
        .map(|(segment_index, segment)| PathProjection {
            segment_index,
            projection: project_onto_segment(p, &segment[0], &segment[1]),
        })
        .min_by(|first, second| {
            first
                .projection
                .distance
                .cmp(&second.projection.distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAN_FRANCISCO: GeoPoint = GeoPoint::new(37.7749, -122.4194);
    const OAKLAND: GeoPoint = GeoPoint::new(37.8044, -122.2712);

    #[test]
    fn distance_to_itself_is_zero() {
        assert_eq!(distance_meters(&SAN_FRANCISCO, &SAN_FRANCISCO), Meters::ZERO);
        assert_eq!(distance_meters(&OAKLAND, &OAKLAND), Meters::ZERO);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_meters(&SAN_FRANCISCO, &OAKLAND);
        let back = distance_meters(&OAKLAND, &SAN_FRANCISCO);
        assert!((there.value() - back.value()).abs() < 1e-9);
    }

    #[test]
    fn distance_matches_known_value() {
        // One degree of latitude on a 6371 km sphere.
        let distance = distance_meters(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((distance.value() - 111_194.93).abs() < 0.5);
    }

    #[test]
    fn antipodal_distance_is_half_the_circumference() {
        let half = std::f64::consts::PI * EARTH_RADIUS;
        let pairs = [
            (GeoPoint::new(-87.5, -180.0), GeoPoint::new(87.5, 0.0)),
            (GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0)),
            (GeoPoint::new(90.0, 0.0), GeoPoint::new(-90.0, 0.0)),
            (GeoPoint::new(45.0, 90.0), GeoPoint::new(-45.0, -90.0)),
        ];

        for (a, b) in pairs {
            let distance = distance_meters(&a, &b);
            assert!(distance.is_finite(), "{a:?} -> {b:?}");
            assert!((distance.value() - half).abs() < 1.0, "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn bearing_points_to_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((bearing_degrees(&origin, &GeoPoint::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_stays_in_range() {
        let bearing = bearing_degrees(&OAKLAND, &SAN_FRANCISCO);
        assert!((0.0..360.0).contains(&bearing));
    }

    #[test]
    fn destination_point_travels_requested_distance() {
        let bearing = bearing_degrees(&SAN_FRANCISCO, &OAKLAND);
        let reached = destination_point(&SAN_FRANCISCO, bearing, Meters::new(2500.0));

        let travelled = distance_meters(&SAN_FRANCISCO, &reached);
        assert!((travelled.value() - 2500.0).abs() < 0.01);

        let remaining = distance_meters(&reached, &OAKLAND).value();
        let total = distance_meters(&SAN_FRANCISCO, &OAKLAND).value();
        assert!((remaining + 2500.0 - total).abs() < 1.0);
    }

    #[test]
    fn projection_clamps_to_segment_ends() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.01);

        let before = project_onto_segment(&GeoPoint::new(0.0, -0.01), &a, &b);
        assert_eq!(before.fraction, 0.0);
        assert_eq!(before.closest, a);

        let after = project_onto_segment(&GeoPoint::new(0.0, 0.02), &a, &b);
        assert_eq!(after.fraction, 1.0);
        assert_eq!(after.closest, b);
    }

    #[test]
    fn projection_measures_perpendicular_offset() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.02);
        let p = GeoPoint::new(0.001, 0.01);

        let projection = project_onto_segment(&p, &a, &b);
        assert!((projection.fraction - 0.5).abs() < 1e-9);
        assert!((projection.distance.value() - 111.19).abs() < 0.1);
    }

    #[test]
    fn projection_on_degenerate_segment_returns_start() {
        let a = GeoPoint::new(10.0, 10.0);
        let projection = project_onto_segment(&GeoPoint::new(10.001, 10.0), &a, &a);
        assert_eq!(projection.fraction, 0.0);
        assert_eq!(projection.closest, a);
    }

    #[test]
    fn path_projection_picks_closest_segment() {
        let path = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.01),
            GeoPoint::new(0.01, 0.01),
        ];

        let projection = distance_to_path(&GeoPoint::new(0.005, 0.0101), &path).unwrap();
        assert_eq!(projection.segment_index, 1);
        assert!(projection.projection.distance.value() < 20.0);

        assert!(distance_to_path(&GeoPoint::new(0.0, 0.0), &path[..1]).is_none());
    }
}
