// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the SUPPORTED frame.

use super::*;
use std::collections::HashMap;

/// Indicates which startup options are supported by the server. Sent in
/// answer to an OPTIONS frame. The body is a `[string multimap]`, keyed by
/// option name (`CQL_VERSION`, `COMPRESSION`, ...).
#[derive(Clone, Debug)]
pub struct SupportedFrame {
    pub(crate) options: HashMap<String, Vec<String>>,
}

impl SupportedFrame {
    /// Get the supported options.
    pub fn options(&self) -> &HashMap<String, Vec<String>> {
        &self.options
    }

    /// Get the compression algorithms the server advertises.
    pub fn compression(&self) -> &[String] {
        self.options.get("COMPRESSION").map(Vec::as_slice).unwrap_or(&[])
    }
}

impl FromPayload for SupportedFrame {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            options: read_string_multimap(start, payload)?,
        })
    }
}
