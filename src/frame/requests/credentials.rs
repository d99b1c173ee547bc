// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the CREDENTIALS frame, the v1 answer to an
//! AUTHENTICATE challenge. Protocol v2 replaced it with AUTH_RESPONSE.

use super::*;
use std::collections::HashMap;

/// Provides credentials information to the server. The body is a
/// `[string map]` of credential entries, typically `username` and
/// `password`. The server responds with READY on success.
#[derive(Clone, Debug, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned")]
pub struct CredentialsFrame {
    pub(crate) credentials: HashMap<String, String>,
}

impl CredentialsFrame {
    /// Create a credentials frame.
    pub fn new(credentials: HashMap<String, String>) -> Self {
        Self { credentials }
    }

    /// Get the credential entries.
    pub fn credentials(&self) -> &HashMap<String, String> {
        &self.credentials
    }
}

impl ToPayload for CredentialsFrame {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_string_map(&self.credentials, payload);
    }
}
