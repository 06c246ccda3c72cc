use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use super::state::RiderWatch;
use super::status::{Eta, RiderStatus, Status};

/// A status transition worth surfacing to a rider.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub vehicle_id: String,
    pub stop_id: String,
    pub status: Status,
    pub eta: Option<Eta>,
    pub distance_km: Option<f64>,
}

/// Edge-triggered gate between computed statuses and subscribers.
///
/// Compares each computed status to the last one notified for that watch
/// and emits at most one event: only on change, and only for transitions
/// into `Approaching` or `Passed` (going `Far` is not independently
/// newsworthy). Repeated identical statuses emit nothing.
pub struct NotificationGate {
    events: broadcast::Sender<StatusEvent>,
}

impl NotificationGate {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    pub fn on_status_computed(
        &self,
        vehicle_id: &str,
        watch: &mut RiderWatch,
        computed: &RiderStatus,
    ) {
        let newsworthy = matches!(computed.status, Status::Approaching | Status::Passed);
        if newsworthy && watch.last_notified_status != Some(computed.status) {
            watch.last_notified_status = Some(computed.status);
            let event = StatusEvent {
                vehicle_id: vehicle_id.to_string(),
                stop_id: watch.stop_id.clone(),
                status: computed.status,
                eta: computed.eta,
                distance_km: computed.distance_km,
            };
            // A send only fails when nobody is subscribed.
            if self.events.send(event).is_err() {
                debug!(
                    "no subscribers for {} status change at stop {}",
                    vehicle_id, watch.stop_id
                );
            }
        }
        watch.last_status = Some(computed.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: Status) -> RiderStatus {
        RiderStatus {
            status,
            eta: Some(Eta::Minutes(3)),
            distance_km: Some(1.5),
            road_route_unavailable: false,
        }
    }

    #[test]
    fn emits_once_per_transition_into_approaching() {
        let gate = NotificationGate::new(8);
        let mut rx = gate.subscribe();
        let mut watch = RiderWatch::new("c".to_string());

        gate.on_status_computed("bus-1", &mut watch, &status(Status::Approaching));
        gate.on_status_computed("bus-1", &mut watch, &status(Status::Approaching));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, Status::Approaching);
        assert_eq!(event.stop_id, "c");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn transition_into_far_is_silent() {
        let gate = NotificationGate::new(8);
        let mut rx = gate.subscribe();
        let mut watch = RiderWatch::new("c".to_string());

        gate.on_status_computed("bus-1", &mut watch, &status(Status::Far));
        assert!(rx.try_recv().is_err());
        assert_eq!(watch.last_status, Some(Status::Far));
        assert_eq!(watch.last_notified_status, None);
    }

    #[test]
    fn approaching_then_passed_emits_both_edges() {
        let gate = NotificationGate::new(8);
        let mut rx = gate.subscribe();
        let mut watch = RiderWatch::new("c".to_string());

        gate.on_status_computed("bus-1", &mut watch, &status(Status::Approaching));
        gate.on_status_computed("bus-1", &mut watch, &status(Status::Passed));

        assert_eq!(rx.try_recv().unwrap().status, Status::Approaching);
        assert_eq!(rx.try_recv().unwrap().status, Status::Passed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_subscriber_does_not_panic() {
        let gate = NotificationGate::new(8);
        let mut watch = RiderWatch::new("c".to_string());
        gate.on_status_computed("bus-1", &mut watch, &status(Status::Approaching));
        assert_eq!(watch.last_notified_status, Some(Status::Approaching));
    }
}
