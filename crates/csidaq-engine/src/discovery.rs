use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use csidaq_transport::UdpEndpoint;
use csidaq_wire::{DiscoveryAnnouncement, DISCOVERY_PORT};
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::event::{Event, EventSender};

/// Default search window. The node re-announces every few seconds while
/// unclaimed, so this covers several announce cycles plus association lag.
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(75);

/// Configuration for one discovery attempt.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Port to listen on for announcements.
    pub port: u16,
    /// How long to listen before giving up.
    pub window: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            window: DEFAULT_DISCOVERY_WINDOW,
        }
    }
}

/// Listens for a node's broadcast self-announcement and reports the
/// discovered address through the event bus.
pub struct DiscoveryService;

impl DiscoveryService {
    /// Run one discovery attempt on the calling thread.
    ///
    /// Emits `Event::Discovered` for the first matching announcement, or
    /// `Event::DiscoveryFailed` when the window elapses, the attempt is
    /// cancelled, or the bind fails. Bind failure is fatal to the attempt
    /// and is not retried.
    pub fn run(config: &DiscoveryConfig, bus: &EventSender, cancel: &CancelFlag) {
        let endpoint = match UdpEndpoint::bind_broadcast(config.port) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(%err, "discovery bind failed");
                let _ = bus.send(Event::DiscoveryFailed {
                    reason: format!("could not listen for announcements: {err}"),
                });
                return;
            }
        };

        info!(
            port = config.port,
            window_secs = config.window.as_secs(),
            "listening for node announcements"
        );
        Self::listen(&endpoint, config.window, bus, cancel);
    }

    fn listen(endpoint: &UdpEndpoint, window: Duration, bus: &EventSender, cancel: &CancelFlag) {
        let deadline = Instant::now() + window;
        while !cancel.is_cancelled() && Instant::now() < deadline {
            let text = match endpoint.recv_text() {
                Ok(Some((text, from))) => {
                    debug!(%from, "datagram received");
                    text
                }
                // Poll timeout: re-check cancellation and the deadline.
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, "discovery receive error");
                    continue;
                }
            };

            match DiscoveryAnnouncement::parse(&text) {
                Ok(announcement) => {
                    info!(addr = %announcement.source_addr, "node discovered");
                    let _ = bus.send(Event::Discovered {
                        addr: announcement.source_addr,
                    });
                    return;
                }
                Err(_) => debug!("ignoring non-announcement datagram"),
            }
        }

        info!("discovery window closed without an announcement");
        let _ = bus.send(Event::DiscoveryFailed {
            reason: "no node announced itself within the search window".to_string(),
        });
    }

    /// Spawn [`Self::run`] on its own thread.
    pub fn spawn(config: DiscoveryConfig, bus: EventSender, cancel: CancelFlag) -> JoinHandle<()> {
        thread::spawn(move || Self::run(&config, &bus, &cancel))
    }
}
