use std::collections::HashMap;

use serde::Serialize;

use crate::directory::{Route, Stop};
use crate::geo;
use crate::report::LatLon;
use crate::segmenter::RoadPolyline;

use super::direction::Direction;
use super::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    Uninitialized,
    Tracking,
    Completed,
    Offline,
}

/// One rider's interest in a vehicle: the stop they are waiting at, the
/// notification edge state, and the asynchronously maintained road
/// estimate toward that stop.
#[derive(Debug)]
pub struct RiderWatch {
    pub stop_id: String,
    pub last_status: Option<Status>,
    pub last_notified_status: Option<Status>,
    pub road: Option<RoadPolyline>,
    pub road_in_flight: bool,
    /// Vehicle position the current road estimate was built from.
    pub road_anchor: Option<LatLon>,
}

impl RiderWatch {
    pub fn new(stop_id: String) -> Self {
        Self {
            stop_id,
            last_status: None,
            last_notified_status: None,
            road: None,
            road_in_flight: false,
            road_anchor: None,
        }
    }
}

/// Per-vehicle tracking state. Owned by the engine's registry; every
/// mutation happens under that vehicle's lock, in report-arrival order.
#[derive(Debug)]
pub struct VehicleTrackState {
    pub vehicle_id: String,
    /// None until the directory resolves; positions are still buffered.
    pub route: Option<Route>,
    pub phase: TrackPhase,
    pub direction: Direction,
    /// (position, unix seconds) of the last applied report.
    pub current: Option<(LatLon, u64)>,
    pub previous: Option<(LatLon, u64)>,
    pub speed_kmh: Option<f64>,
    /// Route stops in travel direction: always the route's stop list or
    /// its exact reverse, never a re-sorted or filtered subset.
    pub ordered_stops: Vec<Stop>,
    /// Index of the next not-yet-passed stop in `ordered_stops`; equal to
    /// `ordered_stops.len()` once the route is complete.
    pub next_stop_index: usize,
    /// Count of applied reports; in-flight road results compare against
    /// it so a stale result is discarded instead of installed.
    pub report_seq: u64,
    /// Direction-inference hint: the most recently started session's stop.
    pub hint_stop_id: Option<String>,
    pub watches: HashMap<String, RiderWatch>,
}

impl VehicleTrackState {
    pub fn new(vehicle_id: String, route: Option<Route>) -> Self {
        Self {
            vehicle_id,
            route,
            phase: TrackPhase::Uninitialized,
            direction: Direction::Unknown,
            current: None,
            previous: None,
            speed_kmh: None,
            ordered_stops: Vec::new(),
            next_stop_index: 0,
            report_seq: 0,
            hint_stop_id: None,
            watches: HashMap::new(),
        }
    }

    pub fn current_position(&self) -> Option<LatLon> {
        self.current.map(|(p, _)| p)
    }

    pub fn previous_position(&self) -> Option<LatLon> {
        self.previous.map(|(p, _)| p)
    }

    pub fn record_position(&mut self, position: LatLon, timestamp: u64, speed_kmh: Option<f64>) {
        self.previous = self.current.take();
        self.current = Some((position, timestamp));
        self.speed_kmh = speed_kmh;
        self.report_seq += 1;
    }

    /// Speed derived from the last two applied reports, in km/h.
    pub fn derived_speed_kmh(&self) -> Option<f64> {
        let (cur, t1) = self.current?;
        let (prev, t0) = self.previous?;
        if t1 <= t0 {
            return None;
        }
        let hours = (t1 - t0) as f64 / 3600.0;
        Some(geo::haversine_km(prev, cur) / hours)
    }

    /// O(1) view of maintained progress state; nothing is recomputed here.
    pub fn current_progress(&self) -> Progress {
        let split = self.next_stop_index.min(self.ordered_stops.len());
        Progress {
            next_stop: self.ordered_stops.get(self.next_stop_index).cloned(),
            passed_stops: self.ordered_stops[..split].to_vec(),
            remaining_stops: self.ordered_stops[split..].to_vec(),
            direction: self.direction,
        }
    }

    /// A direction inferred before the gap is not trusted across it; the
    /// next report starts from scratch. Watches survive.
    pub fn reset_after_offline(&mut self) {
        self.phase = TrackPhase::Uninitialized;
        self.direction = Direction::Unknown;
        self.current = None;
        self.previous = None;
        self.speed_kmh = None;
        self.ordered_stops.clear();
        self.next_stop_index = 0;
        for watch in self.watches.values_mut() {
            watch.road = None;
            watch.road_anchor = None;
        }
    }
}

/// Snapshot of a vehicle's progress along its route.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub next_stop: Option<Stop>,
    pub passed_stops: Vec<Stop>,
    pub remaining_stops: Vec<Stop>,
    pub direction: Direction,
}
