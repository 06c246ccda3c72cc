use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::geo;

use super::state::{RiderWatch, TrackPhase, VehicleTrackState};

/// A vehicle closer than this to the rider's stop (and not past it) is
/// "approaching". Fixed by design; see the tuning notes in TrackerConfig.
const APPROACHING_RADIUS_KM: f64 = 1.0;
/// Below this speed the vehicle counts as stopped and its ETA is not
/// meaningfully time-bound.
const STOPPED_SPEED_KMH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Approaching,
    Passed,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eta {
    Minutes(u32),
    /// Computed arrival is under a minute out.
    ArrivingNow,
    /// The vehicle is not moving; no numeric estimate is honest.
    Stopped,
}

/// Rider-facing classification of one vehicle against one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderStatus {
    pub status: Status,
    pub eta: Option<Eta>,
    pub distance_km: Option<f64>,
    /// Set when the distance is a straight-line estimate (or a partially
    /// degraded road estimate) rather than a full road route.
    pub road_route_unavailable: bool,
}

/// Classify a vehicle's state against a rider's stop.
///
/// Distance prefers the road estimate when one is available and the stop
/// is still ahead; otherwise straight-line. While direction is Unknown
/// (or the vehicle is offline) the answer is `Far` with straight-line
/// distance only — that is not an error state.
pub fn classify(
    state: &VehicleTrackState,
    watch: &RiderWatch,
    config: &TrackerConfig,
) -> RiderStatus {
    let rider_pos = state
        .route
        .as_ref()
        .and_then(|r| r.stops().iter().find(|s| s.id == watch.stop_id))
        .map(|s| s.position);

    let straight_km = match (state.current_position(), rider_pos) {
        (Some(cur), Some(rp)) => Some(geo::haversine_km(cur, rp)),
        _ => None,
    };

    let status = match state.phase {
        TrackPhase::Uninitialized | TrackPhase::Offline => {
            return RiderStatus {
                status: Status::Far,
                eta: straight_km.map(|d| compute_eta(state, d, config)),
                distance_km: straight_km,
                road_route_unavailable: true,
            };
        }
        TrackPhase::Completed => Status::Passed,
        TrackPhase::Tracking => {
            let rider_idx = state
                .ordered_stops
                .iter()
                .position(|s| s.id == watch.stop_id);
            match rider_idx {
                Some(idx) if idx < state.next_stop_index => Status::Passed,
                Some(_) => Status::Far, // refined below once distance is known
                None => Status::Far,
            }
        }
    };

    // Road estimates lead to the rider's stop, so they only describe a
    // stop that is still ahead.
    let (distance_km, road_route_unavailable) = if status == Status::Passed {
        (straight_km, true)
    } else {
        match &watch.road {
            Some(road) => (Some(road.total_distance_km), road.degraded),
            None => (straight_km, true),
        }
    };

    let status = if status == Status::Far {
        match distance_km {
            Some(d) if d <= APPROACHING_RADIUS_KM => Status::Approaching,
            _ => Status::Far,
        }
    } else {
        status
    };

    RiderStatus {
        status,
        eta: distance_km.map(|d| compute_eta(state, d, config)),
        distance_km,
        road_route_unavailable,
    }
}

fn compute_eta(state: &VehicleTrackState, distance_km: f64, config: &TrackerConfig) -> Eta {
    let speed = match state.speed_kmh {
        Some(s) => Some(s),
        None => state.derived_speed_kmh().filter(|s| *s > 0.0),
    };

    match speed {
        Some(s) if s < STOPPED_SPEED_KMH => Eta::Stopped,
        Some(s) => minutes(distance_km, s),
        None => minutes(distance_km, config.default_cruising_speed_kmh),
    }
}

fn minutes(distance_km: f64, speed_kmh: f64) -> Eta {
    let rounded = (distance_km / speed_kmh * 60.0).round();
    if rounded < 1.0 {
        Eta::ArrivingNow
    } else {
        Eta::Minutes(rounded as u32)
    }
}
