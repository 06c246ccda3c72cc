use crate::directory::Stop;
use crate::report::LatLon;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance in kilometers.
pub fn haversine_km(a: LatLon, b: LatLon) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Nearest candidate to `position`, as `(index, distance_km)`. Ties go to
/// the lowest index, so the earliest stop in the candidate list wins.
pub fn nearest_stop(position: LatLon, candidates: &[Stop]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, stop) in candidates.iter().enumerate() {
        let dist = haversine_km(position, stop.position);
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((idx, dist)),
        }
    }
    best
}

/// Total length of a point sequence in kilometers.
pub fn path_km(points: &[LatLon]) -> f64 {
    points.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stop(id: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: id.to_string(),
            code: id.to_string(),
            position: LatLon::new(lat, lon),
        }
    }

    #[test]
    fn zero_distance_to_self() {
        let p = LatLon::new(33.6568, -117.7328);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn one_millidegree_of_latitude() {
        let a = LatLon::new(51.5074, -0.1278);
        let b = LatLon::new(51.5084, -0.1278);
        // ~111.2 m per 0.001 degrees of latitude
        assert_relative_eq!(haversine_km(a, b), 0.1112, max_relative = 0.01);
    }

    #[test]
    fn nearest_stop_prefers_lowest_index_on_tie() {
        let stops = vec![
            stop("a", 0.0, 0.0),
            stop("b", 0.02, 0.0),
            stop("c", 0.02, 0.0),
        ];
        let (idx, dist) = nearest_stop(LatLon::new(0.02, 0.0), &stops).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn path_sums_segments() {
        let points = vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.01, 0.0),
            LatLon::new(0.02, 0.0),
        ];
        let expected = haversine_km(points[0], points[1]) + haversine_km(points[1], points[2]);
        assert_relative_eq!(path_km(&points), expected);
        assert_eq!(path_km(&points[..1]), 0.0);
    }
}
