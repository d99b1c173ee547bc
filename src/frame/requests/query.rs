// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the QUERY frame.

use super::*;
use crate::frame::value::CqlValue;

/**
    Performs a CQL query. In protocol v1 the body is:

    `<query><consistency>`

    In protocol v2 the body grows a flags byte and optional tails:

    `<query><consistency><flags>[<n><value_1>...<value_n>][<result_page_size>][<paging_state>][<serial_consistency>]`

    where `<query>` is a `[long string]` and `<flags>` is a `[byte]` whose
    bits announce which tails follow. See [`QueryFlags`].

    Note that the consistency is ignored by some queries (USE, CREATE, ALTER,
    TRUNCATE, ...).

    The server will respond to a QUERY message with a RESULT message, the
    content of which depends on the query.
*/
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned", setter(strip_option))]
pub struct QueryFrame {
    /// The query statement
    pub(crate) statement: String,
    /// The consistency level
    pub(crate) consistency: Consistency,
    #[builder(default)]
    /// The bound values list (v2)
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

impl QueryFrame {
    /// Get the query statement.
    pub fn statement(&self) -> &String {
        &self.statement
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

    /// The flags byte derived from the populated tails.
    pub fn flags(&self) -> QueryFlags {
        derive_flags(
            &self.values,
            self.page_size,
            &self.paging_state,
            self.serial_consistency,
        )
    }

    pub(crate) fn validate(&self, version: ProtocolVersion) -> anyhow::Result<()> {
        // a v1 QUERY body has no values block; only EXECUTE binds values there
        anyhow::ensure!(
            version == ProtocolVersion::V2 || self.values.is_empty(),
            "Bound query values require protocol v2"
        );
        validate_parameters(
            version,
            self.consistency,
            self.page_size,
            &self.paging_state,
            self.serial_consistency,
        )
    }

    pub(crate) fn to_payload(self, version: ProtocolVersion, payload: &mut Vec<u8>) {
        payload.reserve(self.statement.len() + 16);
        write_long_string(&self.statement, payload);
        match version {
            ProtocolVersion::V1 => write_short(self.consistency as u16, payload),
            ProtocolVersion::V2 => write_query_parameters(
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

impl QueryFrameBuilder {
    /// Bind the next value of the statement.
    pub fn bind(mut self, value: impl Into<CqlValue>) -> Self {
        self.values.get_or_insert_with(Vec::new).push(value.into());
        self
    }
}

pub(crate) fn derive_flags(
    values: &[CqlValue],
    page_size: Option<i32>,
    paging_state: &Option<Vec<u8>>,
    serial_consistency: Option<Consistency>,
) -> QueryFlags {
    let mut flags = QueryFlags::default();
    flags.set_values(!values.is_empty());
    flags.set_page_size(page_size.is_some());
    flags.set_paging_state(paging_state.is_some());
    flags.set_serial_consistency(serial_consistency.is_some());
    flags
}

pub(crate) fn validate_parameters(
    version: ProtocolVersion,
    consistency: Consistency,
    page_size: Option<i32>,
    paging_state: &Option<Vec<u8>>,
    serial_consistency: Option<Consistency>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        consistency.in_dialect(version),
        "Consistency {} does not exist in protocol v{}",
        consistency,
        version as u8
    );
    if version == ProtocolVersion::V1 {
        anyhow::ensure!(
            page_size.is_none() && paging_state.is_none() && serial_consistency.is_none(),
            "Query parameters require protocol v2"
        );
    }
    if let Some(serial) = serial_consistency {
        anyhow::ensure!(
            serial.is_serial(),
            "Serial consistency must be SERIAL or LOCAL_SERIAL, got {}",
            serial
        );
    }
    Ok(())
}

/// Write the v2 `<query_parameters>` block shared by QUERY and EXECUTE.
pub(crate) fn write_query_parameters(
    consistency: Consistency,
    values: &[CqlValue],
    page_size: Option<i32>,
    paging_state: Option<&[u8]>,
    serial_consistency: Option<Consistency>,
    payload: &mut Vec<u8>,
) {
    write_short(consistency as u16, payload);
    let mut flags = QueryFlags::default();
    flags.set_values(!values.is_empty());
    flags.set_page_size(page_size.is_some());
    flags.set_paging_state(paging_state.is_some());
    flags.set_serial_consistency(serial_consistency.is_some());
    write_byte(flags.0, payload);
    if flags.values() {
        write_short(values.len() as u16, payload);
        for value in values {
            value.encode(payload);
        }
    }
    if let Some(page_size) = page_size {
        write_int(page_size, payload);
    }
    if let Some(paging_state) = paging_state {
        write_bytes(paging_state, payload);
    }
    if let Some(serial) = serial_consistency {
        write_short(serial as u16, payload);
    }
}

/// Write the v1 bound-values block used by EXECUTE: a `[short]` count
/// followed by `[bytes]` values.
pub(crate) fn write_value_list(values: &[CqlValue], payload: &mut Vec<u8>) {
    write_short(values.len() as u16, payload);
    for value in values {
        value.encode(payload);
    }
}
