/// Tuning knobs for the tracking engine.
///
/// The rider-facing thresholds that are deliberately fixed (1 km
/// approaching radius, 5 km/h stopped cutoff) live as constants next to
/// the status classifier; this struct carries only the knobs that vary by
/// deployment.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Assumed cruising speed for the ETA when neither a live nor a
    /// derived speed is available. Default: 30 km/h.
    pub default_cruising_speed_kmh: f64,

    /// How close to the final stop in travel direction counts as having
    /// reached it. Default: 60 meters.
    pub arrival_threshold_km: f64,

    /// Deadband applied to the terminus-distance deltas so GPS jitter
    /// below the fix accuracy never flips the inferred direction.
    /// Default: 15 meters.
    pub direction_epsilon_km: f64,

    /// How far the vehicle must move from the last road-estimate anchor
    /// before the polyline is recomputed. Default: 250 meters.
    pub polyline_refresh_km: f64,

    /// Buffered capacity of the notification broadcast channel.
    /// Default: 64.
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_cruising_speed_kmh: 30.0,
            arrival_threshold_km: 0.06,
            direction_epsilon_km: 0.015,
            polyline_refresh_km: 0.25,
            event_capacity: 64,
        }
    }
}
