//! Realtime position-interpretation engine for transit vehicles.
//!
//! Feed it raw, irregularly-sampled GPS reports for vehicles travelling
//! an ordered stop sequence and it maintains, per vehicle: travel
//! direction along the route, the next stop ahead, approach/passed
//! status against a rider's stop, an ETA, and a road-following polyline
//! assembled one stop pair at a time so the drawn path never reorders
//! stops.
//!
//! Feed delivery, route/stop administration, and rendering live outside
//! the crate: reports come in through [`TrackingEngine::on_position_report`],
//! routes resolve through a [`RouteDirectory`], road paths through a
//! [`RoadRouter`], and status transitions go out through
//! [`TrackingEngine::subscribe`].

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod geo;
pub mod report;
pub mod segmenter;
pub mod tracker;

pub use config::TrackerConfig;
pub use directory::{Route, RouteDirectory, StaticDirectory, Stop};
pub use engine::{StatusSnapshot, TrackingEngine};
pub use error::{DirectoryError, EngineError, RouterError};
pub use report::{LatLon, PositionReport};
pub use segmenter::{HttpRouter, RoadPolyline, RoadRouter, RoutedLeg, RouteSegmenter};
pub use tracker::{Direction, Eta, Progress, Status, StatusEvent};
