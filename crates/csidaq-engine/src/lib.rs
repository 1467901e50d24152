//! The CSI acquisition core.
//!
//! Discovery, provisioning, and the start/retry + ingestion session each
//! run on their own thread and report back through a typed event bus.
//! Errors never cross a thread boundary as panics; they become events and
//! the worker either keeps polling (timeouts) or terminates cleanly.

pub mod cancel;
pub mod discovery;
pub mod event;
pub mod provision;
pub mod session;

pub use cancel::CancelFlag;
pub use discovery::{DiscoveryConfig, DiscoveryService, DEFAULT_DISCOVERY_WINDOW};
pub use event::{event_bus, Event, EventReceiver, EventSender};
pub use provision::ProvisioningClient;
pub use session::{AcquisitionSession, SessionConfig, START_RETRY_INTERVAL};
