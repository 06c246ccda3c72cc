use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::config::TrackerConfig;
use crate::directory::{Route, RouteDirectory, Stop};
use crate::error::EngineError;
use crate::geo;
use crate::report::{LatLon, PositionReport};
use crate::segmenter::{RoadRouter, RouteSegmenter};
use crate::tracker::{
    progress, status, Direction, Eta, NotificationGate, RiderWatch, Status, StatusEvent,
    TrackPhase, VehicleTrackState,
};

type Registry = RwLock<HashMap<String, Arc<Mutex<VehicleTrackState>>>>;

/// Everything a rider-facing surface needs about one vehicle/stop session.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: Status,
    pub eta: Option<Eta>,
    pub distance_km: Option<f64>,
    pub next_stop: Option<Stop>,
    pub direction: Direction,
    pub road_polyline: Option<Vec<LatLon>>,
    pub road_route_unavailable: bool,
}

/// The position-interpretation engine.
///
/// Owns one `VehicleTrackState` per tracked vehicle. Vehicles update in
/// parallel; within a vehicle, reports apply strictly in arrival order
/// under that vehicle's lock. Road routing never runs on the report path:
/// status and ETA update synchronously, polyline recomputation is spawned,
/// debounced, and discarded when it comes back stale.
pub struct TrackingEngine {
    directory: Arc<dyn RouteDirectory>,
    segmenter: Arc<RouteSegmenter>,
    registry: Registry,
    gate: Arc<NotificationGate>,
    config: TrackerConfig,
}

impl TrackingEngine {
    pub fn new(
        directory: Arc<dyn RouteDirectory>,
        router: Arc<dyn RoadRouter>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            directory,
            segmenter: Arc::new(RouteSegmenter::new(router)),
            registry: RwLock::new(HashMap::new()),
            gate: Arc::new(NotificationGate::new(config.event_capacity)),
            config,
        }
    }

    /// Notification events for all tracked vehicles, edge-triggered.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.gate.subscribe()
    }

    /// Begin a tracking session for one vehicle/rider-stop pair.
    ///
    /// Fails without creating any state when the directory has no route
    /// for the vehicle or the stop is not on that route.
    pub async fn start_tracking(
        &self,
        vehicle_id: &str,
        rider_stop_id: &str,
    ) -> Result<StatusSnapshot, EngineError> {
        let route = self
            .directory
            .route_for_vehicle(vehicle_id)
            .await
            .map_err(|e| {
                warn!("directory lookup failed for vehicle {}: {}", vehicle_id, e);
                EngineError::VehicleNotConfigured(vehicle_id.to_string())
            })?;

        if route.stop_index(rider_stop_id).is_none() {
            return Err(EngineError::StopNotOnRoute {
                vehicle_id: vehicle_id.to_string(),
                stop_id: rider_stop_id.to_string(),
            });
        }

        let entry = self.entry_or_create(vehicle_id, Some(route.clone())).await;
        let mut state = entry.lock().await;
        if state.route.is_none() {
            state.route = Some(route);
        }
        state.hint_stop_id = Some(rider_stop_id.to_string());
        state
            .watches
            .entry(rider_stop_id.to_string())
            .or_insert_with(|| RiderWatch::new(rider_stop_id.to_string()));
        info!(
            "tracking vehicle {} for rider at stop {}",
            vehicle_id, rider_stop_id
        );

        self.maybe_spawn_polyline(&entry, &mut state, rider_stop_id, false);
        self.snapshot(&state, rider_stop_id)
    }

    /// Feed one position report. Malformed, out-of-range, or
    /// out-of-order reports are rejected and logged; they never mutate
    /// state. A first-ever report for an unknown vehicle creates a fresh
    /// Uninitialized state.
    pub async fn on_position_report(&self, report: PositionReport) {
        if !report.position().is_valid() {
            warn!(
                "rejected report for vehicle {}: coordinates ({}, {}) out of range",
                report.vehicle_id, report.lat, report.lon
            );
            return;
        }

        let entry = match self.entry(&report.vehicle_id).await {
            Some(entry) => entry,
            None => {
                let route = match self.directory.route_for_vehicle(&report.vehicle_id).await {
                    Ok(route) => Some(route),
                    Err(e) => {
                        warn!("no route for vehicle {}: {}", report.vehicle_id, e);
                        None
                    }
                };
                self.entry_or_create(&report.vehicle_id, route).await
            }
        };
        let mut state = entry.lock().await;

        if state.route.is_none() {
            if let Ok(route) = self.directory.route_for_vehicle(&report.vehicle_id).await {
                debug!("route resolved late for vehicle {}", report.vehicle_id);
                state.route = Some(route);
            }
        }

        if state.phase == TrackPhase::Offline {
            info!(
                "vehicle {} back online, resetting track state",
                state.vehicle_id
            );
            state.reset_after_offline();
        }

        if let Some((_, last_ts)) = state.current {
            if report.timestamp < last_ts {
                warn!(
                    "rejected stale report for vehicle {} ({} < {})",
                    report.vehicle_id, report.timestamp, last_ts
                );
                return;
            }
            if report.timestamp == last_ts {
                debug!(
                    "duplicate report for vehicle {} at {} ignored",
                    report.vehicle_id, last_ts
                );
                return;
            }
        }

        state.record_position(report.position(), report.timestamp, report.speed_kmh);
        let update = progress::apply_position(&mut state, &self.config);

        let stop_ids: Vec<String> = state.watches.keys().cloned().collect();
        for stop_id in &stop_ids {
            let computed = match state.watches.get(stop_id) {
                Some(watch) => status::classify(&state, watch, &self.config),
                None => continue,
            };
            let vehicle_id = state.vehicle_id.clone();
            if let Some(watch) = state.watches.get_mut(stop_id) {
                self.gate.on_status_computed(&vehicle_id, watch, &computed);
            }
            self.maybe_spawn_polyline(&entry, &mut state, stop_id, update.direction_changed);
        }
    }

    /// Current status for an existing session. O(1) against maintained
    /// state; nothing is recomputed from scratch.
    pub async fn current_status(
        &self,
        vehicle_id: &str,
        rider_stop_id: &str,
    ) -> Result<StatusSnapshot, EngineError> {
        let entry = self
            .entry(vehicle_id)
            .await
            .ok_or_else(|| EngineError::UnknownVehicle(vehicle_id.to_string()))?;
        let state = entry.lock().await;
        self.snapshot(&state, rider_stop_id)
    }

    /// Release one session. The vehicle's state is dropped entirely once
    /// its last watch is gone.
    pub async fn stop_tracking(&self, vehicle_id: &str, rider_stop_id: &str) {
        let mut remove_vehicle = false;
        if let Some(entry) = self.entry(vehicle_id).await {
            let mut state = entry.lock().await;
            state.watches.remove(rider_stop_id);
            if state.hint_stop_id.as_deref() == Some(rider_stop_id) {
                state.hint_stop_id = state.watches.keys().next().cloned();
            }
            remove_vehicle = state.watches.is_empty();
        }
        if remove_vehicle {
            self.registry.write().await.remove(vehicle_id);
            debug!("vehicle {} released", vehicle_id);
        }
    }

    /// Called by the external feed watchdog when a vehicle has gone
    /// silent. Watched vehicles keep their sessions and reset on the next
    /// report; unwatched vehicles are dropped outright.
    pub async fn mark_offline(&self, vehicle_id: &str) {
        let Some(entry) = self.entry(vehicle_id).await else {
            return;
        };
        let mut state = entry.lock().await;
        if state.watches.is_empty() {
            drop(state);
            self.registry.write().await.remove(vehicle_id);
            info!("vehicle {} offline, state released", vehicle_id);
        } else {
            state.phase = TrackPhase::Offline;
            info!("vehicle {} marked offline", vehicle_id);
        }
    }

    async fn entry(&self, vehicle_id: &str) -> Option<Arc<Mutex<VehicleTrackState>>> {
        self.registry.read().await.get(vehicle_id).cloned()
    }

    async fn entry_or_create(
        &self,
        vehicle_id: &str,
        route: Option<Route>,
    ) -> Arc<Mutex<VehicleTrackState>> {
        let mut registry = self.registry.write().await;
        registry
            .entry(vehicle_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(VehicleTrackState::new(
                    vehicle_id.to_string(),
                    route,
                )))
            })
            .clone()
    }

    fn snapshot(
        &self,
        state: &VehicleTrackState,
        rider_stop_id: &str,
    ) -> Result<StatusSnapshot, EngineError> {
        let watch =
            state
                .watches
                .get(rider_stop_id)
                .ok_or_else(|| EngineError::NoSuchSession {
                    vehicle_id: state.vehicle_id.clone(),
                    stop_id: rider_stop_id.to_string(),
                })?;
        let computed = status::classify(state, watch, &self.config);
        let progress = state.current_progress();
        Ok(StatusSnapshot {
            status: computed.status,
            eta: computed.eta,
            distance_km: computed.distance_km,
            next_stop: progress.next_stop,
            direction: progress.direction,
            road_polyline: watch.road.as_ref().map(|r| r.points.clone()),
            road_route_unavailable: computed.road_route_unavailable,
        })
    }

    /// Kick off road-polyline recomputation for one watch when it is
    /// worth doing: direction changed, no estimate yet, or the vehicle
    /// moved beyond the refresh distance since the current estimate's
    /// anchor. At most one request per watch is in flight; a result that
    /// arrives after a newer report has been applied is discarded.
    fn maybe_spawn_polyline(
        &self,
        entry: &Arc<Mutex<VehicleTrackState>>,
        state: &mut VehicleTrackState,
        stop_id: &str,
        direction_changed: bool,
    ) {
        if state.phase != TrackPhase::Tracking {
            return;
        }
        let current = match state.current_position() {
            Some(p) => p,
            None => return,
        };
        let waypoints = match polyline_waypoints(state, stop_id, current) {
            Some(w) => w,
            None => return,
        };

        let refresh_km = self.config.polyline_refresh_km;
        let watch = match state.watches.get_mut(stop_id) {
            Some(w) => w,
            None => return,
        };
        if watch.road_in_flight {
            return;
        }
        let moved_enough = watch
            .road_anchor
            .map(|anchor| geo::haversine_km(anchor, current) >= refresh_km)
            .unwrap_or(true);
        if !(direction_changed || watch.road.is_none() || moved_enough) {
            return;
        }
        watch.road_in_flight = true;

        let seq = state.report_seq;
        let direction = state.direction;
        let segmenter = self.segmenter.clone();
        let entry = entry.clone();
        let stop_id = stop_id.to_string();
        tokio::spawn(async move {
            let polyline = segmenter.build_road_polyline(&waypoints).await;
            let mut state = entry.lock().await;
            let fresh = state.report_seq == seq && state.direction == direction;
            let vehicle_id = state.vehicle_id.clone();
            if let Some(watch) = state.watches.get_mut(&stop_id) {
                watch.road_in_flight = false;
                if fresh {
                    watch.road = Some(polyline);
                    watch.road_anchor = Some(current);
                } else {
                    debug!(
                        "discarding stale road estimate for vehicle {} stop {}",
                        vehicle_id, stop_id
                    );
                }
            }
        });
    }
}

/// Waypoints for the road path from the vehicle to the rider's stop: the
/// current position, then every not-yet-passed stop up to and including
/// the rider's. None when the stop is already behind the vehicle.
fn polyline_waypoints(
    state: &VehicleTrackState,
    stop_id: &str,
    current: LatLon,
) -> Option<Vec<LatLon>> {
    let rider_idx = state.ordered_stops.iter().position(|s| s.id == stop_id)?;
    if rider_idx < state.next_stop_index {
        return None;
    }
    let mut waypoints = vec![current];
    waypoints.extend(
        state.ordered_stops[state.next_stop_index..=rider_idx]
            .iter()
            .map(|s| s.position),
    );
    Some(waypoints)
}
