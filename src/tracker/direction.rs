use serde::{Deserialize, Serialize};

use crate::directory::Stop;
use crate::geo::haversine_km;
use crate::report::LatLon;

/// Travel direction along a route's fixed stop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Unknown,
    /// First terminus toward last.
    Forward,
    /// Last terminus toward first.
    Reverse,
}

impl Direction {
    pub fn is_known(self) -> bool {
        self != Direction::Unknown
    }
}

/// Infer travel direction along `stops` (fixed route order).
///
/// Primary signal: between the previous and current position, did the
/// vehicle move toward the last terminus and away from the first
/// (Forward), or the opposite (Reverse)? `epsilon_km` is a deadband so
/// jitter smaller than the fix accuracy never flips the answer.
///
/// When the deltas disagree and the rider's stop sits strictly between
/// the termini, the rider's stop breaks the tie: a vehicle moving toward
/// that stop is Forward if it is currently closer to the stop's earlier
/// neighbor in route order, Reverse if closer to the later one.
///
/// Last resort, also used when there is no previous position: whichever
/// terminus is nearer decides — nearer to the last stop reads Forward,
/// nearer to the first reads Reverse. This is a heuristic: a vehicle
/// idling near the midpoint gives it nothing to work with, so
/// equidistant-within-epsilon returns Unknown instead of a guess.
pub fn infer_direction(
    current: LatLon,
    previous: Option<LatLon>,
    stops: &[Stop],
    rider_stop_id: Option<&str>,
    epsilon_km: f64,
) -> Direction {
    if stops.len() < 2 {
        return Direction::Unknown;
    }
    let first = stops[0].position;
    let last = stops[stops.len() - 1].position;

    if let Some(prev) = previous {
        let d_prev_first = haversine_km(prev, first);
        let d_cur_first = haversine_km(current, first);
        let d_prev_last = haversine_km(prev, last);
        let d_cur_last = haversine_km(current, last);

        let toward_last = d_cur_last < d_prev_last - epsilon_km;
        let away_from_first = d_cur_first > d_prev_first + epsilon_km;
        let toward_first = d_cur_first < d_prev_first - epsilon_km;
        let away_from_last = d_cur_last > d_prev_last + epsilon_km;

        if toward_last && away_from_first {
            return Direction::Forward;
        }
        if toward_first && away_from_last {
            return Direction::Reverse;
        }

        if let Some(direction) =
            disambiguate_by_rider_stop(current, prev, stops, rider_stop_id, epsilon_km)
        {
            return direction;
        }
    }

    nearest_terminus_fallback(current, first, last, epsilon_km)
}

fn disambiguate_by_rider_stop(
    current: LatLon,
    previous: LatLon,
    stops: &[Stop],
    rider_stop_id: Option<&str>,
    epsilon_km: f64,
) -> Option<Direction> {
    let stop_id = rider_stop_id?;
    let idx = stops.iter().position(|s| s.id == stop_id)?;
    // Only a stop strictly between the termini has two neighbors to
    // compare against.
    if idx == 0 || idx == stops.len() - 1 {
        return None;
    }

    let rider_pos = stops[idx].position;
    let moving_toward =
        haversine_km(current, rider_pos) < haversine_km(previous, rider_pos) - epsilon_km;
    if !moving_toward {
        return None;
    }

    let d_earlier = haversine_km(current, stops[idx - 1].position);
    let d_later = haversine_km(current, stops[idx + 1].position);
    if d_earlier < d_later {
        Some(Direction::Forward)
    } else if d_later < d_earlier {
        Some(Direction::Reverse)
    } else {
        None
    }
}

fn nearest_terminus_fallback(
    current: LatLon,
    first: LatLon,
    last: LatLon,
    epsilon_km: f64,
) -> Direction {
    let d_first = haversine_km(current, first);
    let d_last = haversine_km(current, last);
    if (d_first - d_last).abs() <= epsilon_km {
        return Direction::Unknown;
    }
    if d_last < d_first {
        Direction::Forward
    } else {
        Direction::Reverse
    }
}
