mod router;

pub use router::{HttpRouter, RoadRouter, RoutedLeg};

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::report::LatLon;

/// Each failed segment gets one retry before falling back, to bound
/// latency for a live view.
const SEGMENT_RETRIES: usize = 1;

/// A road-following point sequence through an ordered set of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadPolyline {
    pub points: Vec<LatLon>,
    pub total_distance_km: f64,
    /// True when at least one segment fell back to a straight line.
    pub degraded: bool,
}

/// Builds road polylines one consecutive waypoint pair at a time.
///
/// A single multi-waypoint request to a generic router may reorder or
/// shortcut waypoints to minimize total path length, which would draw a
/// route that skips a stop or runs backward. Per-pair fetching guarantees
/// the path visits the waypoints in exactly the given order.
pub struct RouteSegmenter {
    router: Arc<dyn RoadRouter>,
}

impl RouteSegmenter {
    pub fn new(router: Arc<dyn RoadRouter>) -> Self {
        Self { router }
    }

    /// One independent shortest-path request per consecutive pair,
    /// concatenated in order. A segment whose request fails (after the
    /// retry) degrades to the straight line between its endpoints; one
    /// segment's fallback never blocks the others.
    pub async fn build_road_polyline(&self, waypoints: &[LatLon]) -> RoadPolyline {
        if waypoints.len() < 2 {
            return RoadPolyline {
                points: waypoints.to_vec(),
                total_distance_km: 0.0,
                degraded: false,
            };
        }

        let mut points: Vec<LatLon> = Vec::new();
        let mut total_distance_km = 0.0;
        let mut degraded = false;

        for pair in waypoints.windows(2) {
            let (leg_points, leg_km, fell_back) = self.fetch_segment(pair[0], pair[1]).await;
            total_distance_km += leg_km;
            degraded |= fell_back;

            for point in leg_points {
                if points.last() != Some(&point) {
                    points.push(point);
                }
            }
        }

        RoadPolyline {
            points,
            total_distance_km,
            degraded,
        }
    }

    async fn fetch_segment(&self, from: LatLon, to: LatLon) -> (Vec<LatLon>, f64, bool) {
        for attempt in 0..=SEGMENT_RETRIES {
            match self.router.shortest_path(from, to).await {
                Ok(leg) if !leg.points.is_empty() => {
                    return (leg.points, leg.distance_m / 1000.0, false);
                }
                Ok(_) => {
                    warn!("router returned empty path (attempt {})", attempt + 1);
                }
                Err(e) => {
                    warn!("segment routing failed (attempt {}): {}", attempt + 1, e);
                }
            }
        }

        (vec![from, to], geo::haversine_km(from, to), true)
    }
}
