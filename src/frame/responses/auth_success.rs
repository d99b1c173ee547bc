// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTH_SUCCESS frame (protocol v2).

use super::*;

/// Indicates the success of the authentication phase. The body is a single
/// `[bytes]` token of final information from the server, possibly null.
#[derive(Clone, Debug)]
pub struct AuthSuccessFrame {
    pub(crate) token: Option<Vec<u8>>,
}

impl AuthSuccessFrame {
    /// Get the final token, if any.
    pub fn token(&self) -> Option<&[u8]> {
        self.token.as_deref()
    }
}

impl FromPayload for AuthSuccessFrame {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            token: read_bytes(start, payload)?.map(<[u8]>::to_vec),
        })
    }
}
