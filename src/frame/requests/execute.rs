// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the EXECUTE frame.

use super::*;
use crate::frame::value::CqlValue;

/**
   Executes a prepared query. In protocol v1 the body is:

   `<id><n><value_1>...<value_n><consistency>`

   where `<id>` is the `[short bytes]` prepared query ID returned by a
   PREPARE response, followed by the bound `[bytes]` values and the
   `[consistency]`.

   In protocol v2 the body is `<id>` followed by the same
   `<query_parameters>` block as [`QueryFrame`].

   The response from the server will be a RESULT message.
*/
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned", setter(strip_option))]
pub struct ExecuteFrame {
    /// The query's prepared ID
    pub(crate) id: Vec<u8>,
    /// The consistency level
    pub(crate) consistency: Consistency,
    #[builder(default)]
    /// The bound values list
    pub(crate) values: Vec<CqlValue>,
    #[builder(default)]
    /// The page size (v2)
    pub(crate) page_size: Option<i32>,
    #[builder(default)]
    /// The paging state (v2)
    pub(crate) paging_state: Option<Vec<u8>>,
    #[builder(default)]
    /// The serial consistency level (v2)
    pub(crate) serial_consistency: Option<Consistency>,
}

impl ExecuteFrame {
    /// Get the prepared ID.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Get the consistency level.
    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    /// Get the bound values.
    pub fn values(&self) -> &[CqlValue] {
        &self.values
    }

    /// Get the page size.
    pub fn page_size(&self) -> Option<i32> {
        self.page_size
    }

    /// Get the paging state.
    pub fn paging_state(&self) -> &Option<Vec<u8>> {
        &self.paging_state
    }

    /// Get the serial consistency level.
    pub fn serial_consistency(&self) -> Option<Consistency> {
        self.serial_consistency
    }

    pub(crate) fn validate(&self, version: ProtocolVersion) -> anyhow::Result<()> {
        anyhow::ensure!(!self.id.is_empty(), "Prepared id must not be empty");
        anyhow::ensure!(self.id.len() <= u16::MAX as usize, "Prepared id too long");
        query::validate_parameters(
            version,
            self.consistency,
            self.page_size,
            &self.paging_state,
            self.serial_consistency,
        )
    }

    pub(crate) fn to_payload(self, version: ProtocolVersion, payload: &mut Vec<u8>) {
        write_short_bytes(&self.id, payload);
        match version {
            ProtocolVersion::V1 => {
                query::write_value_list(&self.values, payload);
                write_short(self.consistency as u16, payload);
            }
            ProtocolVersion::V2 => query::write_query_parameters(
                self.consistency,
                &self.values,
                self.page_size,
                self.paging_state.as_deref(),
                self.serial_consistency,
                payload,
            ),
        }
    }
}

impl ExecuteFrameBuilder {
    /// Bind the next value of the prepared statement.
    pub fn bind(mut self, value: impl Into<CqlValue>) -> Self {
        self.values.get_or_insert_with(Vec::new).push(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_execute_body() {
        let frame = ExecuteFrameBuilder::default()
            .id(vec![0xB1, 0xB2])
            .consistency(Consistency::One)
            .bind("y")
            .bind(7i32)
            .build()
            .unwrap();
        frame.validate(ProtocolVersion::V1).unwrap();
        let mut payload = Vec::new();
        frame.to_payload(ProtocolVersion::V1, &mut payload);
        let mut expected = vec![0x00, 0x02, 0xB1, 0xB2];
        expected.extend([0x00, 0x02]);
        expected.extend((1i32).to_be_bytes());
        expected.extend(b"y");
        expected.extend((4i32).to_be_bytes());
        expected.extend((7i32).to_be_bytes());
        expected.extend([0x00, 0x01]);
        assert_eq!(payload, expected);
    }

    #[test]
    fn v2_execute_body_uses_the_parameters_block() {
        let frame = ExecuteFrameBuilder::default()
            .id(vec![0xB1])
            .consistency(Consistency::Any)
            .build()
            .unwrap();
        frame.validate(ProtocolVersion::V2).unwrap();
        let mut payload = Vec::new();
        frame.to_payload(ProtocolVersion::V2, &mut payload);
        // id, consistency, empty flags
        assert_eq!(payload, vec![0x00, 0x01, 0xB1, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn empty_id_is_rejected() {
        let frame = ExecuteFrameBuilder::default()
            .id(vec![])
            .consistency(Consistency::One)
            .build()
            .unwrap();
        assert!(frame.validate(ProtocolVersion::V2).is_err());
    }
}
