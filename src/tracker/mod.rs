pub mod direction;
pub mod notify;
pub mod progress;
pub mod state;
pub mod status;

pub use direction::Direction;
pub use notify::{NotificationGate, StatusEvent};
pub use state::{Progress, RiderWatch, TrackPhase, VehicleTrackState};
pub use status::{Eta, RiderStatus, Status};
