// ── Push routing ──
//
// Turns device-cloud push callbacks into handler calls and a liveness
// verdict. Nothing here is async: handlers are plain functions and the
// registry is read-only while dispatching.

mod dispatch;
mod event;
mod registry;
mod topic;

pub use dispatch::{
    DispatchReport, EventOutcome, HandlerFault, LivenessVerdict, dispatch, dispatch_batch,
    dispatch_event,
};
pub use event::{PushEvent, parse_batch};
pub use registry::{HandlerError, HandlerRegistry, Named, PushHandler};
pub use topic::{TopicKind, Unroutable, route, routing_key};
