use std::io::IsTerminal;
use std::net::Ipv4Addr;
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use csidaq_wire::CsiFrame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mac: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rssi: Option<i32>,
}

/// Print one live CSI record.
///
/// Records are displayed before structural validation, so the parsed
/// columns are best-effort and the raw line is always available.
pub fn print_frame(raw: &str, format: OutputFormat) {
    let frame = CsiFrame::parse(raw).ok();
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                raw,
                seq: frame.as_ref().map(|f| f.seq),
                mac: frame.as_ref().map(|f| f.mac.as_str()),
                rssi: frame.as_ref().map(|f| f.rssi),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => match &frame {
            Some(frame) => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["SEQ", "MAC", "RSSI", "CHANNEL", "LEN"])
                    .add_row(vec![
                        frame.seq.to_string(),
                        frame.mac.clone(),
                        frame.rssi.to_string(),
                        frame.channel.to_string(),
                        frame.len.to_string(),
                    ]);
                println!("{table}");
            }
            None => println!("{raw}"),
        },
        OutputFormat::Pretty => match &frame {
            Some(frame) => println!(
                "seq={} mac={} rssi={} channel={} len={}",
                frame.seq, frame.mac, frame.rssi, frame.channel, frame.len
            ),
            None => println!("{raw}"),
        },
        OutputFormat::Raw => println!("{raw}"),
    }
}

pub fn print_discovered(addr: Ipv4Addr, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "event": "discovered", "addr": addr }));
        }
        _ => println!("{addr}"),
    }
}

pub fn print_summary(written: usize, captured: usize, db: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "event": "persisted",
                    "written": written,
                    "captured": captured,
                    "db": db,
                })
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CAPTURED", "WRITTEN", "DATABASE"])
                .add_row(vec![
                    captured.to_string(),
                    written.to_string(),
                    db.display().to_string(),
                ]);
            println!("{table}");
        }
        _ => println!("{written} of {captured} records written to {}", db.display()),
    }
}
