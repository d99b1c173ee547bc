// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the PREPARE frame.

use super::*;

/// Prepare a query for later execution (through EXECUTE). The body consists of
/// the CQL query to prepare as a `[long string]`.
///
/// The server will respond with a RESULT message with a `prepared` kind.
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned")]
pub struct PrepareFrame {
    #[allow(missing_docs)]
    pub(crate) statement: String,
}

impl PrepareFrame {
    /// Create a prepare frame from a statement.
    pub fn new(statement: String) -> Self {
        Self { statement }
    }

    /// Get the statement to be prepared.
    pub fn statement(&self) -> &String {
        &self.statement
    }
}

impl ToPayload for PrepareFrame {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_long_string(&self.statement, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_body_is_a_long_string() {
        let mut payload = Vec::new();
        PrepareFrame::new("SELECT k FROM t".to_owned()).to_payload(&mut payload);
        assert_eq!(&payload[..4], &(15i32).to_be_bytes());
        assert_eq!(&payload[4..], b"SELECT k FROM t");
    }
}
