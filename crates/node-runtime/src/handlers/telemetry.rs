//! Folds bus events into the Prometheus registry.

use p44_telemetry::record_event;
use shared_bus::{EventFilter, InMemoryEventBus, Subscription, ValidatorEvent};
use tokio::sync::watch;
use tracing::{debug, error};

pub struct TelemetryHandler {
    subscription: Subscription,
}

impl TelemetryHandler {
    /// Subscribe before any component publishes so nothing is missed.
    pub fn new(bus: &InMemoryEventBus) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
        }
    }

    /// Record events until shutdown or until the bus is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut recorded = 0u64;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = self.subscription.recv() => match event {
                    Some(event) => {
                        Self::handle(&event);
                        recorded += 1;
                    }
                    None => break,
                },
            }
        }
        debug!(recorded, "Telemetry handler stopped");
        recorded
    }

    fn handle(event: &ValidatorEvent) {
        if let ValidatorEvent::CriticalError { component, error } = event {
            error!(component = %component, error = %error, "Critical error reported");
        }
        record_event(event);
    }
}
