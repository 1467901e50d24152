use std::net::IpAddr;

use csidaq_engine::{event_bus, AcquisitionSession, CancelFlag, Event, SessionConfig};
use csidaq_store::CsiStore;
use tracing::warn;

use crate::cmd::{install_ctrlc_handler, AcquireArgs};
use crate::exit::{store_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_frame, print_summary, OutputFormat};

pub fn run(args: AcquireArgs, format: OutputFormat) -> CliResult<i32> {
    // Open the store before touching the network, so a bad database path
    // fails fast instead of after a capture.
    let mut store = CsiStore::open(&args.db).map_err(|err| store_error("open database failed", err))?;

    let (bus, events) = event_bus();
    let cancel = CancelFlag::new();
    install_ctrlc_handler(cancel.clone())?;

    let config = SessionConfig {
        listen_port: args.port,
        ..SessionConfig::new(IpAddr::V4(args.target), args.duration)
    };
    let handle = AcquisitionSession::new(config).spawn(bus, cancel);

    let mut session_failure = None;
    for event in events {
        match event {
            Event::Frame { raw } => print_frame(&raw, format),
            Event::SessionError { reason } => session_failure = Some(reason),
            _ => {}
        }
    }

    let mut buffer = handle
        .join()
        .map_err(|_| CliError::new(INTERNAL, "session thread panicked"))?;

    if buffer.is_empty() {
        if let Some(reason) = session_failure {
            return Err(CliError::new(TRANSPORT_ERROR, reason));
        }
        print_summary(0, 0, &args.db, format);
        return Ok(SUCCESS);
    }
    if let Some(reason) = session_failure {
        // Frames captured before the error still get persisted.
        warn!(%reason, "session ended on an error");
    }

    let captured = buffer.len();
    let written = store
        .persist(&mut buffer, &args.scenario)
        .map_err(|err| store_error("persist failed", err))?;
    print_summary(written, captured, &args.db, format);
    Ok(SUCCESS)
}
