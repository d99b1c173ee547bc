// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the EVENT frame.

use super::*;
use std::{
    net::SocketAddr,
    str::FromStr,
};

/// An event pushed by the server on stream id -1. A client only receives
/// events for the types it registered with a REGISTER frame, and should
/// consume them from a dedicated read path rather than mid-request.
#[derive(Clone, Debug)]
pub struct EventFrame {
    /// The event carried by the frame.
    pub event: Event,
}

impl EventFrame {
    /// Get the event.
    pub fn event(&self) -> &Event {
        &self.event
    }
}

impl FromPayload for EventFrame {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            event: Event::from_payload(start, payload)?,
        })
    }
}

/// Server-pushed event kinds.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum Event {
    TopologyChange {
        change_type: TopologyChangeType,
        address: SocketAddr,
    },
    StatusChange {
        change_type: StatusChangeType,
        address: SocketAddr,
    },
    SchemaChange(SchemaChange),
}

impl FromPayload for Event {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(match read_str(start, payload)? {
            "TOPOLOGY_CHANGE" => Self::TopologyChange {
                change_type: TopologyChangeType::from_payload(start, payload)?,
                address: read_inet(start, payload)?,
            },
            "STATUS_CHANGE" => Self::StatusChange {
                change_type: StatusChangeType::from_payload(start, payload)?,
                address: read_inet(start, payload)?,
            },
            "SCHEMA_CHANGE" => Self::SchemaChange(SchemaChange::from_payload(start, payload)?),
            e => anyhow::bail!("Unknown event type: {}", e),
        })
    }
}

/// Events related to change in the cluster topology. Events are sent when
/// nodes are added to or removed from the cluster.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TopologyChangeType {
    NewNode,
    RemovedNode,
}

impl FromStr for TopologyChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NEW_NODE" => TopologyChangeType::NewNode,
            "REMOVED_NODE" => TopologyChangeType::RemovedNode,
            _ => return Err(anyhow::anyhow!("Invalid topology change type: {}", s)),
        })
    }
}

impl FromPayload for TopologyChangeType {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        TopologyChangeType::from_str(read_str(start, payload)?)
    }
}

/// Events related to change of node status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StatusChangeType {
    Up,
    Down,
}

impl FromStr for StatusChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "UP" => StatusChangeType::Up,
            "DOWN" => StatusChangeType::Down,
            _ => return Err(anyhow::anyhow!("Invalid status change type: {}", s)),
        })
    }
}

impl FromPayload for StatusChangeType {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        StatusChangeType::from_str(read_str(start, payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_change_event_parses() {
        let mut payload = Vec::new();
        write_string("STATUS_CHANGE", &mut payload);
        write_string("DOWN", &mut payload);
        write_inet("10.0.0.1:9042".parse().unwrap(), &mut payload);
        let mut start = 0;
        let frame = EventFrame::from_payload(&mut start, &payload).unwrap();
        match frame.event() {
            Event::StatusChange { change_type, address } => {
                assert_eq!(*change_type, StatusChangeType::Down);
                assert_eq!(*address, "10.0.0.1:9042".parse().unwrap());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(start, payload.len());
    }

    #[test]
    fn schema_change_event_parses() {
        let mut payload = Vec::new();
        write_string("SCHEMA_CHANGE", &mut payload);
        write_string("DROPPED", &mut payload);
        write_string("ks", &mut payload);
        write_string("t", &mut payload);
        let frame = EventFrame::from_payload(&mut 0, &payload).unwrap();
        match frame.event() {
            Event::SchemaChange(change) => {
                assert_eq!(change.change, SchemaChangeType::Dropped);
                assert_eq!(change.keyspace, "ks");
                assert_eq!(change.table, "t");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
