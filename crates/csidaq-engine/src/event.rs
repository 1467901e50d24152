use std::net::Ipv4Addr;
use std::sync::mpsc;

use serde::Serialize;

/// Events emitted by background workers toward the controlling context.
///
/// Delivery preserves per-producer emission order; events from distinct
/// workers may interleave arbitrarily. The consumer drains all pending
/// events before rendering a consistent view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A node announced itself during discovery.
    Discovered { addr: Ipv4Addr },
    /// Discovery ended without finding a node.
    DiscoveryFailed { reason: String },
    /// A provisioning datagram was handed to the transport.
    ProvisionSent,
    /// A provisioning datagram could not be sent.
    ProvisionFailed { reason: String },
    /// A raw CSI record arrived and was buffered.
    Frame { raw: String },
    /// The acquisition loop hit an unrecoverable error.
    SessionError { reason: String },
    /// The acquisition session terminated. Emitted exactly once per
    /// session, on every termination path.
    Finished,
}

/// Sending half of the event bus, cloned into each worker.
pub type EventSender = mpsc::Sender<Event>;

/// Receiving half of the event bus, owned by the controlling context.
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create the ordered multi-producer/single-consumer event bus.
pub fn event_bus() -> (EventSender, EventReceiver) {
    mpsc::channel()
}
