// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTHENTICATE frame.

use super::*;

/// Indicates that the server requires authentication. The body is a
/// `[string]` naming the authenticator class configured on the server.
/// A v1 client answers with CREDENTIALS, a v2 client with AUTH_RESPONSE.
#[derive(Clone, Debug)]
pub struct AuthenticateFrame {
    /// The authenticator class name.
    pub(crate) authenticator: String,
}

impl AuthenticateFrame {
    /// Get the authenticator class name.
    pub fn authenticator(&self) -> &String {
        &self.authenticator
    }
}

impl FromPayload for AuthenticateFrame {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            authenticator: read_string(start, payload)?,
        })
    }
}
