//! Input and output event traces exchanged with the execution collaborator.
//!
//! Inputs are a JSON document with an ordered event list; outputs come back
//! as JSON-lines of the same event shape, one event per emitted packet.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packet::Packet;

/// Default simulation horizon for generated input traces.
pub const DEFAULT_MAX_TIME: u64 = 9_999_999_999;

/// Event name used for injected packets.
pub const PKT_EVENT: &str = "ip_pkt";

/// The program-input artifact consumed by the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputTrace {
    #[serde(rename = "max time")]
    pub max_time: u64,
    pub events: Vec<TraceEvent>,
}

/// One event: a name, positional address arguments, a location tag encoding
/// a port (`"<id>:<port>"`), and a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceEvent {
    pub name: String,
    pub args: Vec<u64>,
    pub locations: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("output line {line} is not a valid event")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("output event at line {line} is missing address arguments")]
    MissingArgs { line: usize },
    #[error("output event at line {line} has no location tag")]
    MissingLocation { line: usize },
    #[error("output event at line {line} has malformed location tag '{tag}'")]
    BadLocation { line: usize, tag: String },
    #[error("output event at line {line} carries value {value} outside the field width")]
    OutOfRange { line: usize, value: u64 },
}

impl InputTrace {
    /// Build the input artifact for an ordered packet stream.
    pub fn from_packets(packets: &[Packet]) -> InputTrace {
        InputTrace {
            max_time: DEFAULT_MAX_TIME,
            events: packets
                .iter()
                .enumerate()
                .map(|(i, pkt)| TraceEvent {
                    name: PKT_EVENT.to_string(),
                    args: vec![pkt.src_addr as u64, pkt.dst_addr as u64],
                    locations: vec![format!("0:{}", pkt.port)],
                    timestamp: i as u64,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a program's stdout (JSON-lines of events) into its output packets.
pub fn parse_output_events(raw: &str) -> Result<Vec<Packet>, TraceError> {
    let mut packets = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(trimmed).map_err(|source| {
            TraceError::Decode {
                line: line_no,
                source,
            }
        })?;
        packets.push(event_to_packet(&event, line_no)?);
    }
    Ok(packets)
}

fn event_to_packet(event: &TraceEvent, line: usize) -> Result<Packet, TraceError> {
    let (src, dst) = match event.args.as_slice() {
        [src, dst, ..] => (*src, *dst),
        _ => return Err(TraceError::MissingArgs { line }),
    };
    let tag = event
        .locations
        .first()
        .ok_or(TraceError::MissingLocation { line })?;
    let port_text = tag
        .split_once(':')
        .map(|(_, port)| port)
        .ok_or_else(|| TraceError::BadLocation {
            line,
            tag: tag.clone(),
        })?;
    let port: u16 = port_text.parse().map_err(|_| TraceError::BadLocation {
        line,
        tag: tag.clone(),
    })?;

    Ok(Packet {
        src_addr: narrow(src, line)?,
        dst_addr: narrow(dst, line)?,
        port,
    })
}

fn narrow(value: u64, line: usize) -> Result<u32, TraceError> {
    u32::try_from(value).map_err(|_| TraceError::OutOfRange { line, value })
}
