// Event dispatch and liveness.
//
// Every event in a batch is dispatched independently. Every handler for an
// event runs even when an earlier one fails or panics. The batch is
// "active" when at least one event reached at least one handler, failed
// or not.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::event::{PushEvent, parse_batch};
use super::registry::{HandlerRegistry, PushHandler};
use super::topic::{TopicKind, Unroutable, routing_key};
use crate::error::CoreError;
use crate::model::DeviceId;

/// A handler that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("handler '{handler}' failed: {message}")]
pub struct HandlerFault {
    pub handler: String,
    pub message: String,
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// At least one handler ran.
    Delivered {
        kind: TopicKind,
        device_id: DeviceId,
        handlers: usize,
        faults: Vec<HandlerFault>,
    },
    /// Routed to a device nobody listens for.
    NoHandlers { kind: TopicKind, device_id: DeviceId },
    /// Could not be routed at all.
    Unroutable { topic: String, error: Unroutable },
}

impl EventOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn verdict(&self) -> LivenessVerdict {
        LivenessVerdict::from_delivered(self.is_delivered())
    }
}

/// Whether the monitor should be reported as still wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LivenessVerdict {
    /// Someone is listening; keep delivering.
    Active,
    /// Nobody is listening; let the cloud back off.
    Inactive,
}

impl LivenessVerdict {
    pub fn from_delivered(delivered: bool) -> Self {
        if delivered { Self::Active } else { Self::Inactive }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// HTTP status to answer the push callback with. Anything above 3xx
    /// counts as a delivery failure on the cloud side.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Active => 200,
            Self::Inactive => 503,
        }
    }
}

/// Per-event outcomes of one callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<EventOutcome>,
}

impl DispatchReport {
    pub fn verdict(&self) -> LivenessVerdict {
        LivenessVerdict::from_delivered(self.outcomes.iter().any(EventOutcome::is_delivered))
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    pub fn faults(&self) -> impl Iterator<Item = &HandlerFault> {
        self.outcomes.iter().flat_map(|o| match o {
            EventOutcome::Delivered { faults, .. } => faults.as_slice(),
            _ => &[],
        })
    }
}

/// Deliver one routed event to every handler registered for its device.
pub fn dispatch(
    kind: &TopicKind,
    subtopic: &str,
    event: &PushEvent,
    registry: &HandlerRegistry,
) -> EventOutcome {
    let device_id = match routing_key(kind, subtopic, &event.body) {
        Ok(id) => id,
        Err(error) => {
            warn!(topic = %event.topic, %error, "unroutable push event");
            return EventOutcome::Unroutable {
                topic: event.topic.clone(),
                error,
            };
        }
    };

    let handlers = registry.handlers_for(kind, &device_id);
    if handlers.is_empty() {
        debug!(%kind, device = %device_id, "no handlers registered");
        return EventOutcome::NoHandlers {
            kind: kind.clone(),
            device_id,
        };
    }

    debug!(%kind, device = %device_id, count = handlers.len(), "delivering push event");
    let faults: Vec<HandlerFault> = handlers
        .iter()
        .filter_map(|handler| run_handler(handler.as_ref(), &device_id, event))
        .collect();

    EventOutcome::Delivered {
        kind: kind.clone(),
        device_id,
        handlers: handlers.len(),
        faults,
    }
}

/// Run one handler, turning an `Err` or an unwinding panic into a fault.
fn run_handler(
    handler: &dyn PushHandler,
    device_id: &DeviceId,
    event: &PushEvent,
) -> Option<HandlerFault> {
    let message = match catch_unwind(AssertUnwindSafe(|| handler.handle(device_id, event))) {
        Ok(Ok(())) => return None,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            format!("panicked: {reason}")
        }
    };
    let fault = HandlerFault {
        handler: handler.name().to_owned(),
        message,
    };
    warn!(device = %device_id, %fault, "push handler failed");
    Some(fault)
}

/// Route and deliver a single event.
pub fn dispatch_event(event: &PushEvent, registry: &HandlerRegistry) -> EventOutcome {
    match event.route() {
        Ok((kind, subtopic)) => dispatch(&kind, &subtopic, event, registry),
        Err(error) => {
            warn!(topic = %event.topic, %error, "unroutable push event");
            EventOutcome::Unroutable {
                topic: event.topic.clone(),
                error,
            }
        }
    }
}

/// Parse a callback body and deliver every event in it.
///
/// Only a malformed envelope fails; routing problems and handler errors
/// are recorded in the report.
pub fn dispatch_batch(body: &Value, registry: &HandlerRegistry) -> Result<DispatchReport, CoreError> {
    let events = parse_batch(body)?;
    let report = DispatchReport {
        outcomes: events
            .iter()
            .map(|event| dispatch_event(event, registry))
            .collect(),
    };

    let verdict = report.verdict();
    info!(
        events = report.outcomes.len(),
        delivered = report.delivered(),
        %verdict,
        "push callback handled"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::push::registry::{HandlerError, Named};
    use serde_json::json;

    const DEVICE: &str = "00000000-00000000-00409DFF-FF5E1F2A";

    fn counter(hits: &Arc<AtomicUsize>) -> impl Fn(&DeviceId, &PushEvent) -> Result<(), HandlerError> + use<> {
        let hits = Arc::clone(hits);
        move |_: &DeviceId, _: &PushEvent| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn failing(_: &DeviceId, _: &PushEvent) -> Result<(), HandlerError> {
        Err("sensor table locked".into())
    }

    fn data_point(subtopic: &str) -> Value {
        json!({"topic": format!("/57639/DataPoint/{subtopic}"), "DataPoint": {"data": "1"}})
    }

    #[test]
    fn one_matching_event_keeps_the_batch_active() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(TopicKind::DataPoint, DEVICE, counter(&hits));

        let body = json!({"Document": {"Msg": [
            data_point("blah-00-11-22-33-44-55-66-77"),
            data_point(&format!("{DEVICE}/xbee.digitalIn/[00:13:A2:00:40:9F:6F:CB]!/DIO0")),
        ]}});
        let report = dispatch_batch(&body, &registry).unwrap();

        assert!(matches!(report.outcomes[0], EventOutcome::Unroutable { .. }));
        assert!(report.outcomes[1].is_delivered());
        assert_eq!(report.verdict(), LivenessVerdict::Active);
        assert_eq!(report.verdict().status_code(), 200);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_listeners_means_inactive() {
        let registry = HandlerRegistry::new();
        let body = json!({"Document": {"Msg": data_point(DEVICE)}});
        let report = dispatch_batch(&body, &registry).unwrap();

        assert!(matches!(report.outcomes[0], EventOutcome::NoHandlers { .. }));
        assert_eq!(report.verdict(), LivenessVerdict::Inactive);
        assert_eq!(report.verdict().status_code(), 503);
    }

    #[test]
    fn failing_handlers_do_not_stop_siblings() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .register(TopicKind::DataPoint, DEVICE, Named::new("broken", failing))
            .register(TopicKind::DataPoint, DEVICE, counter(&hits));

        let body = json!({"Document": {"Msg": [data_point(DEVICE), data_point(DEVICE)]}});
        let report = dispatch_batch(&body, &registry).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(report.delivered(), 2);
        let faults: Vec<_> = report.faults().collect();
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].handler, "broken");
        assert_eq!(faults[0].message, "sensor table locked");
        // A faulted delivery still counts as delivered.
        assert!(report.verdict().is_active());
    }

    #[test]
    fn device_core_events_route_by_body() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut registry = HandlerRegistry::new();
        registry.register(
            TopicKind::DeviceCore,
            DEVICE,
            move |id: &DeviceId, event: &PushEvent| -> Result<(), HandlerError> {
                sink.lock().unwrap().push((id.clone(), event.body["DeviceCore"]["dpConnectionStatus"].clone()));
                Ok(())
            },
        );

        let body = json!({"Document": {"Msg": {
            "topic": "/57639/DeviceCore/1234/7",
            "DeviceCore": {"devConnectwareId": DEVICE, "dpConnectionStatus": 1}
        }}});
        let report = dispatch_batch(&body, &registry).unwrap();

        assert!(report.verdict().is_active());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_str(), DEVICE);
        assert_eq!(seen[0].1, json!(1));
    }

    #[test]
    fn handlers_only_see_their_topic_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(TopicKind::DeviceCore, DEVICE, counter(&hits));

        let body = json!({"Document": {"Msg": data_point(DEVICE)}});
        let report = dispatch_batch(&body, &registry).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(report.verdict(), LivenessVerdict::Inactive);
    }

    #[test]
    fn malformed_callbacks_fail_before_dispatch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(TopicKind::DataPoint, DEVICE, counter(&hits));

        let body = json!({"Document": {"Msg": [data_point(DEVICE), {"no": "topic"}]}});
        let err = dispatch_batch(&body, &registry).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_handlers_do_not_drop_the_batch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                TopicKind::DataPoint,
                DEVICE,
                Named::new(
                    "explodes",
                    |_: &DeviceId, _: &PushEvent| -> Result<(), HandlerError> {
                        panic!("sensor index out of range")
                    },
                ),
            )
            .register(TopicKind::DeviceCore, DEVICE, counter(&hits));

        let body = json!({"Document": {"Msg": [
            data_point(DEVICE),
            {
                "topic": "/57639/DeviceCore/1234/7",
                "DeviceCore": {"devConnectwareId": DEVICE, "dpConnectionStatus": 0}
            }
        ]}});
        let report = dispatch_batch(&body, &registry).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(report.delivered(), 2);
        let faults: Vec<_> = report.faults().collect();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].handler, "explodes");
        assert_eq!(faults[0].message, "panicked: sensor index out of range");
        assert!(report.verdict().is_active());
    }
}
