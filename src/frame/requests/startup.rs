// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the STARTUP frame.

use super::*;
use std::collections::HashMap;

/// The only CQL version either dialect accepts at startup.
pub const CQL_VERSION: &str = "3.0.0";
/// The startup option naming the CQL version.
pub const CQL_VERSION_KEY: &str = "CQL_VERSION";
/// The startup option naming the body compression algorithm.
pub const COMPRESSION_KEY: &str = "COMPRESSION";

/**
    Initialize the connection. The server will respond by either a READY
    message (in which case the connection is ready for queries) or an
    AUTHENTICATE message (in which case credentials will need to be provided).

    The body is a `[string map]` of startup options; `CQL_VERSION` is
    mandatory and fixed to `"3.0.0"`, `COMPRESSION` is optional.
*/
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned")]
pub struct StartupFrame {
    pub(crate) options: HashMap<String, String>,
}

impl StartupFrame {
    /// Create a startup frame with the mandatory CQL version and an optional
    /// compression algorithm.
    pub fn new(compression: Option<&str>) -> Self {
        let mut options = HashMap::new();
        options.insert(CQL_VERSION_KEY.to_owned(), CQL_VERSION.to_owned());
        if let Some(algorithm) = compression {
            options.insert(COMPRESSION_KEY.to_owned(), algorithm.to_owned());
        }
        Self { options }
    }

    /// Get the startup options.
    pub fn options(&self) -> &HashMap<String, String> {
        &self.options
    }
}

impl ToPayload for StartupFrame {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_string_map(&self.options, payload);
    }
}

impl StartupFrameBuilder {
    /// Insert a single startup option.
    pub fn with_option(mut self, key: String, value: String) -> Self {
        match self.options {
            Some(ref mut options) => {
                options.insert(key, value);
            }
            None => {
                let mut options = HashMap::new();
                options.insert(key, value);
                self.options = Some(options);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_body_bytes() {
        let mut payload = Vec::new();
        StartupFrame::new(None).to_payload(&mut payload);
        let mut expected = vec![0x00, 0x01, 0x00, 0x0B];
        expected.extend(b"CQL_VERSION");
        expected.extend([0x00, 0x05]);
        expected.extend(b"3.0.0");
        assert_eq!(payload, expected);
    }

    #[test]
    fn startup_builder() {
        let frame = StartupFrameBuilder::default()
            .with_option(CQL_VERSION_KEY.to_string(), CQL_VERSION.to_string())
            .with_option(COMPRESSION_KEY.to_string(), "snappy".to_string())
            .build()
            .unwrap();
        assert_eq!(frame.options().len(), 2);
    }
}
