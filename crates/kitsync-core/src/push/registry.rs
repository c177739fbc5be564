// Handler registry.
//
// Populated once at setup and only read during dispatch. Handlers are
// keyed by topic kind and device, matching how events are routed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::event::PushEvent;
use super::topic::TopicKind;
use crate::model::DeviceId;

/// Error type handlers report back. Any error will do.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives push events for one device.
///
/// Report failures by returning `Err`. A panic is caught and recorded as a
/// fault only where panics unwind; the release profile aborts on panic, so
/// a panicking handler there takes the process down with it.
pub trait PushHandler: Send + Sync {
    /// Label used in logs and fault reports.
    fn name(&self) -> &str {
        "handler"
    }

    fn handle(&self, device_id: &DeviceId, event: &PushEvent) -> Result<(), HandlerError>;
}

impl<F> PushHandler for F
where
    F: Fn(&DeviceId, &PushEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, device_id: &DeviceId, event: &PushEvent) -> Result<(), HandlerError> {
        self(device_id, event)
    }
}

/// Attach a name to a closure handler.
pub struct Named<H> {
    name: String,
    inner: H,
}

impl<H: PushHandler> Named<H> {
    pub fn new(name: impl Into<String>, inner: H) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<H: PushHandler> PushHandler for Named<H> {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, device_id: &DeviceId, event: &PushEvent) -> Result<(), HandlerError> {
        self.inner.handle(device_id, event)
    }
}

/// Handlers by (topic kind, device).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(TopicKind, DeviceId), Vec<Arc<dyn PushHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for events of `kind` from `device_id`.
    pub fn register(
        &mut self,
        kind: TopicKind,
        device_id: impl Into<DeviceId>,
        handler: impl PushHandler + 'static,
    ) -> &mut Self {
        self.handlers
            .entry((kind, device_id.into()))
            .or_default()
            .push(Arc::new(handler));
        self
    }

    pub fn handlers_for(&self, kind: &TopicKind, device_id: &DeviceId) -> &[Arc<dyn PushHandler>] {
        self.handlers
            .get(&(kind.clone(), device_id.clone()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Total registered handlers across all keys.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for ((kind, device), handlers) in &self.handlers {
            let names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
            map.entry(&format_args!("{kind}/{device}"), &names);
        }
        map.finish()
    }
}
