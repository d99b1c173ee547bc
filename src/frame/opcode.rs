// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the opcode dialects of protocol versions 1 and 2.
//!
//! The numbering is shared where the opcodes exist in both dialects:
//! `CREDENTIALS` (0x04) exists only on the v1 wire, while `BATCH` and the
//! `AUTH_*` opcodes (0x0D..0x10) exist only on the v2 wire.

use super::header::ProtocolVersion;

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Credentials = 0x04,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Event = 0x0C,
    Batch = 0x0D,
    AuthChallenge = 0x0E,
    AuthResponse = 0x0F,
    AuthSuccess = 0x10,
}

impl OpCode {
    /// Get the wire byte of this opcode.
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Decode an opcode byte under the given dialect.
    pub fn decode(value: u8, version: ProtocolVersion) -> anyhow::Result<Self> {
        let opcode = match value {
            0x00 => Self::Error,
            0x01 => Self::Startup,
            0x02 => Self::Ready,
            0x03 => Self::Authenticate,
            0x04 => Self::Credentials,
            0x05 => Self::Options,
            0x06 => Self::Supported,
            0x07 => Self::Query,
            0x08 => Self::Result,
            0x09 => Self::Prepare,
            0x0A => Self::Execute,
            0x0B => Self::Register,
            0x0C => Self::Event,
            0x0D => Self::Batch,
            0x0E => Self::AuthChallenge,
            0x0F => Self::AuthResponse,
            0x10 => Self::AuthSuccess,
            _ => anyhow::bail!("Invalid opcode: {:#04x}", value),
        };
        anyhow::ensure!(
            opcode.in_dialect(version),
            "Opcode {:#04x} does not exist in protocol v{}",
            value,
            version as u8
        );
        Ok(opcode)
    }

    /// Whether this opcode exists in the given dialect.
    pub fn in_dialect(&self, version: ProtocolVersion) -> bool {
        match self {
            Self::Credentials => version == ProtocolVersion::V1,
            Self::Batch | Self::AuthChallenge | Self::AuthResponse | Self::AuthSuccess => {
                version == ProtocolVersion::V2
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_is_v1_only() {
        assert_eq!(
            OpCode::decode(0x04, ProtocolVersion::V1).unwrap(),
            OpCode::Credentials
        );
        assert!(OpCode::decode(0x04, ProtocolVersion::V2).is_err());
    }

    #[test]
    fn auth_opcodes_are_v2_only() {
        for byte in [0x0D, 0x0E, 0x0F, 0x10] {
            assert!(OpCode::decode(byte, ProtocolVersion::V1).is_err());
            assert!(OpCode::decode(byte, ProtocolVersion::V2).is_ok());
        }
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(OpCode::decode(0x42, ProtocolVersion::V2).is_err());
    }
}
