use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::report::LatLon;

/// A transit stop. Immutable once created; owned by a route's ordered
/// sequence and referenced everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub code: String,
    pub position: LatLon,
}

/// An ordered, bidirectionally-traversable stop sequence. The order is
/// significant and fixed; the first and last stops are the termini.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    stops: Vec<Stop>,
}

impl Route {
    /// Direction and segmenting logic need at least two stops.
    pub fn new(id: impl Into<String>, stops: Vec<Stop>) -> Result<Self, DirectoryError> {
        let id = id.into();
        if stops.len() < 2 {
            return Err(DirectoryError::TooFewStops(id));
        }
        Ok(Self { id, stops })
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn first_stop(&self) -> &Stop {
        &self.stops[0]
    }

    pub fn last_stop(&self) -> &Stop {
        &self.stops[self.stops.len() - 1]
    }

    /// Index of a stop in the fixed (un-reversed) order.
    pub fn stop_index(&self, stop_id: &str) -> Option<usize> {
        self.stops.iter().position(|s| s.id == stop_id)
    }
}

/// The external Route/Stop system of record: resolves the route a vehicle
/// is assigned to.
pub trait RouteDirectory: Send + Sync {
    fn route_for_vehicle<'a>(
        &'a self,
        vehicle_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Route, DirectoryError>> + Send + 'a>>;
}

/// In-memory directory for embedders and tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    assignments: HashMap<String, Route>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, vehicle_id: impl Into<String>, route: Route) {
        self.assignments.insert(vehicle_id.into(), route);
    }
}

impl RouteDirectory for StaticDirectory {
    fn route_for_vehicle<'a>(
        &'a self,
        vehicle_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Route, DirectoryError>> + Send + 'a>> {
        Box::pin(async move {
            self.assignments
                .get(vehicle_id)
                .cloned()
                .ok_or_else(|| DirectoryError::NotFound(vehicle_id.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, lat: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            code: id.to_string(),
            position: LatLon::new(lat, 0.0),
        }
    }

    #[test]
    fn route_requires_two_stops() {
        assert!(Route::new("r1", vec![stop("a", 0.0)]).is_err());
        assert!(Route::new("r1", vec![stop("a", 0.0), stop("b", 0.01)]).is_ok());
    }

    #[test]
    fn stop_index_uses_fixed_order() {
        let route =
            Route::new("r1", vec![stop("a", 0.0), stop("b", 0.01), stop("c", 0.02)]).unwrap();
        assert_eq!(route.stop_index("b"), Some(1));
        assert_eq!(route.stop_index("zzz"), None);
        assert_eq!(route.first_stop().id, "a");
        assert_eq!(route.last_stop().id, "c");
    }

    #[tokio::test]
    async fn static_directory_lookup() {
        let route = Route::new("r1", vec![stop("a", 0.0), stop("b", 0.01)]).unwrap();
        let mut directory = StaticDirectory::new();
        directory.assign("bus-7", route);

        assert!(directory.route_for_vehicle("bus-7").await.is_ok());
        assert!(matches!(
            directory.route_for_vehicle("bus-8").await,
            Err(DirectoryError::NotFound(_))
        ));
    }
}
