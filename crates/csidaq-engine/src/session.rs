use std::net::{IpAddr, SocketAddr};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use csidaq_transport::UdpEndpoint;
use csidaq_wire::{StartCommand, DATA_PREFIX, DEFAULT_DATA_PORT, NODE_CONTROL_PORT};
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::event::{Event, EventSender};

/// Interval between `start` retransmissions, measured from the previous
/// transmission, until the first data frame arrives.
pub const START_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Session lifecycle. Terminal state is reached by explicit stop, by an
/// unrecoverable socket error, or by the remote stream ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Bound, no start command sent yet.
    Starting,
    /// Start command sent at least once, no data yet.
    AwaitingFirstFrame,
    /// First CSI record received; retransmission disabled.
    Streaming,
    Finished,
}

/// Configuration for one acquisition session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address of the node (from discovery or operator input).
    pub target: IpAddr,
    /// Requested capture duration, forwarded to the node.
    pub duration_secs: u32,
    /// Local port the node streams CSI records to.
    pub listen_port: u16,
    /// Node-side control port. Fixed on current firmware.
    pub control_port: u16,
}

impl SessionConfig {
    pub fn new(target: IpAddr, duration_secs: u32) -> Self {
        Self {
            target,
            duration_secs,
            listen_port: DEFAULT_DATA_PORT,
            control_port: NODE_CONTROL_PORT,
        }
    }
}

/// One run of the start/retry + ingestion loop.
///
/// The session owns its capture buffer for its whole lifetime. Raw
/// records are appended by the ingestion loop and the buffer is handed
/// back to the caller once the session has finished; it is never read
/// concurrently. A new session always starts from an empty buffer.
///
/// The retry-until-first-packet protocol tolerates the unreliable
/// delivery of the one control datagram that matters (session start)
/// without a bidirectional handshake. Once streaming begins, per-frame
/// loss is inherent to the transport and is not retried.
pub struct AcquisitionSession {
    config: SessionConfig,
    state: SessionState,
    buffer: Vec<String>,
}

impl AcquisitionSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Starting,
            buffer: Vec::new(),
        }
    }

    /// Run the session on the calling thread until the remote stream
    /// errors or `cancel` is raised, then return the capture buffer.
    ///
    /// `Event::Finished` is emitted exactly once on every termination
    /// path, including bind failure.
    pub fn run(mut self, bus: &EventSender, cancel: &CancelFlag) -> Vec<String> {
        info!(port = self.config.listen_port, "starting acquisition listener");

        let sockets = UdpEndpoint::bind(self.config.listen_port)
            .and_then(|listener| Ok((listener, UdpEndpoint::sender()?)));
        let (listener, command) = match sockets {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "acquisition socket setup failed");
                let _ = bus.send(Event::SessionError {
                    reason: format!(
                        "error binding to port {}: {err}",
                        self.config.listen_port
                    ),
                });
                self.finish(bus);
                return self.buffer;
            }
        };

        self.ingest(&listener, &command, bus, cancel);
        self.finish(bus);
        self.buffer
    }

    fn ingest(
        &mut self,
        listener: &UdpEndpoint,
        command: &UdpEndpoint,
        bus: &EventSender,
        cancel: &CancelFlag,
    ) {
        let target = SocketAddr::from((self.config.target, self.config.control_port));
        let start = StartCommand {
            duration_secs: self.config.duration_secs,
        }
        .to_wire();

        info!(%target, "awaiting CSI data from node");
        let mut last_send: Option<Instant> = None;

        while !cancel.is_cancelled() {
            // Keep nudging the node until its first record arrives; that
            // arrival is the implicit acknowledgment.
            if self.state != SessionState::Streaming
                && last_send.is_none_or(|at| at.elapsed() >= START_RETRY_INTERVAL)
            {
                match command.send_text(&start, target) {
                    Ok(()) => debug!(%target, command = %start, "start command dispatched"),
                    // Send failure is not fatal; the next interval retries.
                    Err(err) => warn!(%err, "start command send failed"),
                }
                last_send = Some(Instant::now());
                self.transition(SessionState::AwaitingFirstFrame);
            }

            match listener.recv_text() {
                Ok(Some((text, from))) => {
                    if !text.starts_with(DATA_PREFIX) {
                        debug!(%from, "ignoring unrelated datagram");
                        continue;
                    }
                    if self.state != SessionState::Streaming {
                        info!(%from, "first CSI record received, halting start retransmission");
                        self.transition(SessionState::Streaming);
                    }
                    // Buffered verbatim; structural validation is deferred
                    // to persistence time.
                    let _ = bus.send(Event::Frame { raw: text.clone() });
                    self.buffer.push(text);
                }
                // Poll timeout: re-check cancellation and the retry clock.
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, "acquisition receive error");
                    let _ = bus.send(Event::SessionError {
                        reason: format!("error receiving data: {err}"),
                    });
                    return;
                }
            }
        }
    }

    fn finish(&mut self, bus: &EventSender) {
        self.transition(SessionState::Finished);
        let _ = bus.send(Event::Finished);
        info!(frames = self.buffer.len(), "acquisition finished");
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "session state change");
            self.state = next;
        }
    }

    /// Spawn [`Self::run`] on its own thread. Join the handle to recover
    /// the capture buffer once the session has finished.
    pub fn spawn(self, bus: EventSender, cancel: CancelFlag) -> JoinHandle<Vec<String>> {
        thread::spawn(move || self.run(&bus, &cancel))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::event::{event_bus, EventReceiver};

    /// A fake node: a control socket the session sends `start,...` to,
    /// plus the session's own pre-known listener address to stream
    /// records back at.
    struct Harness {
        node: UdpEndpoint,
        session_addr: SocketAddr,
        events: EventReceiver,
        cancel: CancelFlag,
        handle: JoinHandle<Vec<String>>,
    }

    fn start_session(duration_secs: u32) -> Harness {
        let node = UdpEndpoint::bind(0).expect("node control socket should bind");
        let control_port = node.local_addr().expect("addr").port();

        // Bind the session's listener first so the test knows its port.
        let listen_port = {
            let probe = UdpEndpoint::bind(0).expect("probe should bind");
            probe.local_addr().expect("addr").port()
        };
        let session_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, listen_port));

        let config = SessionConfig {
            target: IpAddr::V4(Ipv4Addr::LOCALHOST),
            duration_secs,
            listen_port,
            control_port,
        };

        let (bus, events) = event_bus();
        let cancel = CancelFlag::new();
        let handle = AcquisitionSession::new(config).spawn(bus, cancel.clone());

        Harness {
            node,
            session_addr,
            events,
            cancel,
            handle,
        }
    }

    fn recv_start(node: &UdpEndpoint, within: Duration) -> Option<(String, Instant)> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if let Some((text, _)) = node.recv_text().expect("node receive should not error") {
                return Some((text, Instant::now()));
            }
        }
        None
    }

    #[test]
    fn retransmits_start_until_first_frame() {
        let h = start_session(5);

        let (first, first_at) =
            recv_start(&h.node, Duration::from_secs(3)).expect("initial start command");
        assert_eq!(first, "start,5");

        let (second, second_at) =
            recv_start(&h.node, Duration::from_secs(6)).expect("retried start command");
        assert_eq!(second, "start,5");
        let gap = second_at.duration_since(first_at);
        assert!(gap >= Duration::from_millis(2500), "retry too early: {gap:?}");
        assert!(gap <= Duration::from_millis(5500), "retry too late: {gap:?}");

        h.cancel.cancel();
        h.handle.join().expect("session thread should finish");
    }

    #[test]
    fn first_frame_stops_retransmission_and_is_buffered() {
        let h = start_session(5);

        recv_start(&h.node, Duration::from_secs(3)).expect("initial start command");
        h.node
            .send_text("CSI_DATA,1,AA:BB:CC:DD:EE:FF,-40,rest", h.session_addr)
            .expect("node send should succeed");

        let frame = h
            .events
            .recv_timeout(Duration::from_secs(5))
            .expect("frame event should arrive");
        assert_eq!(
            frame,
            Event::Frame {
                raw: "CSI_DATA,1,AA:BB:CC:DD:EE:FF,-40,rest".to_string()
            }
        );

        // Retransmission is disabled once streaming; nothing more should
        // reach the control socket past the retry interval.
        assert!(
            recv_start(&h.node, Duration::from_secs(4)).is_none(),
            "start command sent after first frame"
        );

        h.cancel.cancel();
        let buffer = h.handle.join().expect("session thread should finish");
        assert_eq!(buffer, vec!["CSI_DATA,1,AA:BB:CC:DD:EE:FF,-40,rest".to_string()]);
    }

    #[test]
    fn non_data_datagrams_are_ignored() {
        let h = start_session(5);

        recv_start(&h.node, Duration::from_secs(3)).expect("initial start command");
        h.node
            .send_text("CSI_IP,10.0.0.9", h.session_addr)
            .expect("node send should succeed");
        h.node
            .send_text("CSI_DATA,2,mac,-1,x", h.session_addr)
            .expect("node send should succeed");

        let frame = h
            .events
            .recv_timeout(Duration::from_secs(5))
            .expect("frame event should arrive");
        assert_eq!(
            frame,
            Event::Frame {
                raw: "CSI_DATA,2,mac,-1,x".to_string()
            }
        );

        h.cancel.cancel();
        let buffer = h.handle.join().expect("session thread should finish");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn cancellation_finishes_within_one_poll_interval() {
        let h = start_session(5);

        let cancelled_at = Instant::now();
        h.cancel.cancel();
        let buffer = h.handle.join().expect("session thread should finish");
        assert!(cancelled_at.elapsed() <= Duration::from_millis(1500));
        assert!(buffer.is_empty());

        let finished: Vec<Event> = h
            .events
            .iter()
            .filter(|event| *event == Event::Finished)
            .collect();
        assert_eq!(finished.len(), 1, "finished must be emitted exactly once");
    }

    #[test]
    fn bind_failure_emits_error_then_finished() {
        let occupied = UdpEndpoint::bind(0).expect("bind should succeed");
        let listen_port = occupied.local_addr().expect("addr").port();

        let config = SessionConfig {
            listen_port,
            ..SessionConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5)
        };
        let (bus, events) = event_bus();
        let buffer = AcquisitionSession::new(config).run(&bus, &CancelFlag::new());
        assert!(buffer.is_empty());

        let received: Vec<Event> = events.try_iter().collect();
        assert!(matches!(received[0], Event::SessionError { .. }));
        assert_eq!(received[1], Event::Finished);
        assert_eq!(received.len(), 2);
    }
}
