use csidaq_engine::{event_bus, CancelFlag, DiscoveryConfig, DiscoveryService, Event};

use crate::cmd::{install_ctrlc_handler, parse_duration, DiscoverArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_discovered, OutputFormat};

pub fn run(args: DiscoverArgs, format: OutputFormat) -> CliResult<i32> {
    let window = parse_duration(&args.window)?;

    let (bus, events) = event_bus();
    let cancel = CancelFlag::new();
    install_ctrlc_handler(cancel.clone())?;

    let config = DiscoveryConfig {
        port: args.port,
        window,
    };
    let handle = DiscoveryService::spawn(config, bus, cancel);

    let mut outcome = Err(CliError::new(INTERNAL, "discovery ended without a result"));
    for event in events {
        match event {
            Event::Discovered { addr } => {
                print_discovered(addr, format);
                outcome = Ok(SUCCESS);
            }
            Event::DiscoveryFailed { reason } => {
                outcome = Err(CliError::new(TIMEOUT, reason));
            }
            _ => {}
        }
    }

    handle
        .join()
        .map_err(|_| CliError::new(INTERNAL, "discovery thread panicked"))?;
    outcome
}
