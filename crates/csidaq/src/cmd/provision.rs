use std::net::SocketAddrV4;

use csidaq_engine::{event_bus, Event, ProvisioningClient};
use csidaq_transport::local_ip;
use csidaq_wire::ProvisionCommand;

use crate::cmd::{AuthProtocol, ProvisionArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::output::OutputFormat;

pub fn run(args: ProvisionArgs, format: OutputFormat) -> CliResult<i32> {
    let server_ip = args.server_ip.unwrap_or_else(local_ip);
    let server_addr = SocketAddrV4::new(server_ip, args.server_port);

    let command = match args.auth {
        AuthProtocol::Wpa2psk => ProvisionCommand::Psk {
            ssid: args.ssid,
            passphrase: args.passphrase,
            server_addr,
        },
        AuthProtocol::Peap => {
            let identity = args
                .identity
                .ok_or_else(|| CliError::new(USAGE, "--auth peap requires --identity"))?;
            ProvisionCommand::Enterprise {
                ssid: args.ssid,
                identity,
                passphrase: args.passphrase,
                server_addr,
            }
        }
    };

    let (bus, events) = event_bus();
    ProvisioningClient::send(&command, &bus);
    drop(bus);

    for event in events {
        match event {
            Event::ProvisionSent => {
                match format {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({ "event": "provision_sent", "server": server_addr })
                    ),
                    _ => println!(
                        "configuration submitted; the node will restart into station mode"
                    ),
                }
                return Ok(SUCCESS);
            }
            Event::ProvisionFailed { reason } => {
                return Err(CliError::new(TRANSPORT_ERROR, reason));
            }
            _ => {}
        }
    }

    Err(CliError::new(TRANSPORT_ERROR, "no provisioning result"))
}
