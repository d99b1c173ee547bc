// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the REGISTER frame.

use super::*;
use std::fmt::Display;

/**
   Register this connection to receive some types of events. The body of the
   message is a `[string list]` representing the event types to register for.

   The response to a REGISTER message will be a READY frame. Registered
   events then arrive as server-initiated EVENT frames on stream id -1.
*/
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned")]
pub struct RegisterFrame {
    /// The event types to request
    pub(crate) event_types: Vec<RegisterEventType>,
}

impl RegisterFrame {
    /// Get the requested event types.
    pub fn event_types(&self) -> &[RegisterEventType] {
        &self.event_types
    }
}

impl ToPayload for RegisterFrame {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_list(self.event_types, payload);
    }
}

impl RegisterFrameBuilder {
    /// Add an event type to the list of event types to request.
    pub fn with_event_type(mut self, event_type: RegisterEventType) -> Self {
        self.event_types.get_or_insert_with(Vec::new).push(event_type);
        self
    }
}

/// Event types
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RegisterEventType {
    TopologyChange,
    StatusChange,
    SchemaChange,
}

impl Display for RegisterEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterEventType::TopologyChange => write!(f, "TOPOLOGY_CHANGE"),
            RegisterEventType::StatusChange => write!(f, "STATUS_CHANGE"),
            RegisterEventType::SchemaChange => write!(f, "SCHEMA_CHANGE"),
        }
    }
}

impl FromPayload for RegisterEventType {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(match read_str(start, payload)? {
            "TOPOLOGY_CHANGE" => RegisterEventType::TopologyChange,
            "STATUS_CHANGE" => RegisterEventType::StatusChange,
            "SCHEMA_CHANGE" => RegisterEventType::SchemaChange,
            e => anyhow::bail!("Unknown event type: {}", e),
        })
    }
}

impl ToPayload for RegisterEventType {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_string(&self.to_string(), payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_body_is_a_string_list() {
        let mut payload = Vec::new();
        RegisterFrameBuilder::default()
            .with_event_type(RegisterEventType::SchemaChange)
            .build()
            .unwrap()
            .to_payload(&mut payload);
        let mut expected = vec![0x00, 0x01, 0x00, 0x0D];
        expected.extend(b"SCHEMA_CHANGE");
        assert_eq!(payload, expected);
    }
}
