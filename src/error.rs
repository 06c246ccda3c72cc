use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The directory has no route assigned to this vehicle; no session
    /// state is created.
    #[error("vehicle {0} is not configured with a route")]
    VehicleNotConfigured(String),

    #[error("vehicle {0} is not currently tracked")]
    UnknownVehicle(String),

    #[error("stop {stop_id} is not on the route assigned to vehicle {vehicle_id}")]
    StopNotOnRoute { vehicle_id: String, stop_id: String },

    #[error("no tracking session for vehicle {vehicle_id} at stop {stop_id}")]
    NoSuchSession { vehicle_id: String, stop_id: String },
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("no route assigned to vehicle {0}")]
    NotFound(String),

    #[error("route {0} needs at least two stops")]
    TooFewStops(String),
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("router returned no path")]
    NoPath,

    #[error("unexpected router response: {0}")]
    BadResponse(String),
}
