use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::error::RouterError;
use crate::report::LatLon;

/// One routed leg between two points, as returned by the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedLeg {
    pub points: Vec<LatLon>,
    pub distance_m: f64,
}

/// External shortest-path collaborator. Implementations are queried one
/// stop pair at a time, never with multiple waypoints.
pub trait RoadRouter: Send + Sync {
    fn shortest_path<'a>(
        &'a self,
        from: LatLon,
        to: LatLon,
    ) -> Pin<Box<dyn Future<Output = Result<RoutedLeg, RouterError>> + Send + 'a>>;
}

/// Road router speaking the OSRM `route/v1` JSON dialect.
pub struct HttpRouter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRouter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn request(&self, from: LatLon, to: LatLon) -> Result<RoutedLeg, RouterError> {
        let url = format!(
            "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson",
            self.base_url.trim_end_matches('/'),
            from.lon,
            from.lat,
            to.lon,
            to.lat,
        );

        let response = self.client.get(&url).send().await?;
        let body: OsrmResponse = response.json().await?;

        if body.code != "Ok" {
            return Err(RouterError::BadResponse(body.code));
        }

        let route = body.routes.into_iter().next().ok_or(RouterError::NoPath)?;
        let points: Vec<LatLon> = route
            .geometry
            .coordinates
            .iter()
            // GeoJSON is (lon, lat)
            .map(|c| LatLon::new(c[1], c[0]))
            .collect();

        if points.is_empty() {
            return Err(RouterError::NoPath);
        }

        Ok(RoutedLeg {
            points,
            distance_m: route.distance,
        })
    }
}

impl RoadRouter for HttpRouter {
    fn shortest_path<'a>(
        &'a self,
        from: LatLon,
        to: LatLon,
    ) -> Pin<Box<dyn Future<Output = Result<RoutedLeg, RouterError>> + Send + 'a>> {
        Box::pin(self.request(from, to))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}
