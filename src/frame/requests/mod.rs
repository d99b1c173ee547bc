// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the request frames of protocol versions 1 and 2.

pub mod auth_response;
pub mod credentials;
pub mod execute;
pub mod options;
pub mod prepare;
pub mod query;
pub mod query_flags;
pub mod register;
pub mod startup;

use super::*;
use derive_builder::Builder;
use derive_more::From;
use header::{
    Flags,
    Header,
    ProtocolVersion,
    MAX_BODY_LEN,
};

/// Possible request frame bodies.
#[derive(Clone, Debug, From)]
#[allow(missing_docs)]
pub enum RequestBody {
    Startup(StartupFrame),
    Credentials(CredentialsFrame),
    Options(OptionsFrame),
    Query(QueryFrame),
    Prepare(PrepareFrame),
    Execute(ExecuteFrame),
    Register(RegisterFrame),
    AuthResponse(AuthResponseFrame),
}

impl RequestBody {
    /// Get the frame type's opcode.
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Startup(_) => OpCode::Startup,
            Self::Credentials(_) => OpCode::Credentials,
            Self::Options(_) => OpCode::Options,
            Self::Query(_) => OpCode::Query,
            Self::Prepare(_) => OpCode::Prepare,
            Self::Execute(_) => OpCode::Execute,
            Self::Register(_) => OpCode::Register,
            Self::AuthResponse(_) => OpCode::AuthResponse,
        }
    }

    /// Check that this body can be expressed in the given dialect.
    pub fn validate(&self, version: ProtocolVersion) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.opcode().in_dialect(version),
            "{:?} frames do not exist in protocol v{}",
            self.opcode(),
            version as u8
        );
        match self {
            Self::Query(frame) => frame.validate(version),
            Self::Execute(frame) => frame.validate(version),
            _ => Ok(()),
        }
    }

    fn to_payload(self, version: ProtocolVersion, payload: &mut Vec<u8>) {
        match self {
            Self::Startup(frame) => frame.to_payload(payload),
            Self::Credentials(frame) => frame.to_payload(payload),
            Self::Query(frame) => frame.to_payload(version, payload),
            Self::Prepare(frame) => frame.to_payload(payload),
            Self::Execute(frame) => frame.to_payload(version, payload),
            Self::Register(frame) => frame.to_payload(payload),
            Self::AuthResponse(frame) => frame.to_payload(payload),
            Self::Options(_) => (),
        }
    }
}

/// A request frame: a [`Header`] plus a [`RequestBody`].
#[derive(Clone, Debug)]
pub struct RequestFrame {
    pub(crate) header: Header,
    pub(crate) body: RequestBody,
}

impl RequestFrame {
    /// Assemble a request frame for the given dialect, flags and stream id.
    pub fn new(version: ProtocolVersion, flags: Flags, stream: i8, body: impl Into<RequestBody>) -> Self {
        let body = body.into();
        Self {
            header: Header::for_request(version, flags, stream, body.opcode()),
            body,
        }
    }

    /// Get the frame header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the frame body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Serialize the frame: body first to learn its length, then the header.
    pub fn build_payload(mut self) -> anyhow::Result<Vec<u8>> {
        let version = self.header.version()?;
        self.body.validate(version)?;
        let mut body_buf = Vec::new();
        self.body.to_payload(version, &mut body_buf);
        anyhow::ensure!(
            body_buf.len() <= MAX_BODY_LEN as usize,
            "Request body too large: {}",
            body_buf.len()
        );
        self.header.set_body_len(body_buf.len() as u32);
        let mut payload = Vec::with_capacity(body_buf.len() + 8);
        payload.extend(self.header.to_bytes());
        payload.extend(body_buf);
        Ok(payload)
    }
}
