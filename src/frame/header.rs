// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the 8-byte frame header shared by protocol versions 1 and 2.

use super::opcode::OpCode;
use std::convert::TryInto;

/// The compression flag.
pub const COMPRESSION: u8 = 0x01;
/// The tracing flag.
pub const TRACING: u8 = 0x02;

/// The length of the fixed frame header.
pub const HEADER_LEN: usize = 8;
/// The maximum accepted frame body length (256 MiB).
pub const MAX_BODY_LEN: u32 = 256 * 1024 * 1024;

/// The stream id the server uses for pushed event frames.
pub const EVENT_STREAM_ID: i8 = -1;

/// The negotiated dialect of the binary protocol. The opcode table, the
/// `QUERY`/`EXECUTE` body layout, the consistency range, and the column type
/// table all branch on this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ProtocolVersion {
    V1 = 1,
    V2 = 2,
}

impl ProtocolVersion {
    /// The version byte carried by request frames of this dialect.
    pub fn request_byte(&self) -> u8 {
        *self as u8
    }

    /// The version byte carried by response frames of this dialect.
    pub fn response_byte(&self) -> u8 {
        *self as u8 | 0x80
    }
}

/// The direction bit of the version byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Direction {
    Request = 0,
    Response = 1,
}

/// The raw version byte: direction bit plus 7-bit protocol version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Version(pub u8);

impl Version {
    /// Get the direction encoded in the high bit.
    pub fn direction(&self) -> Direction {
        match self.0 & 0x80 {
            0 => Direction::Request,
            _ => Direction::Response,
        }
    }

    /// Get the protocol version encoded in the low seven bits.
    pub fn version(&self) -> anyhow::Result<ProtocolVersion> {
        match self.0 & 0x7F {
            1 => Ok(ProtocolVersion::V1),
            2 => Ok(ProtocolVersion::V2),
            v => anyhow::bail!("Unsupported protocol version: {}", v),
        }
    }
}

/// The frame header flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    /// Whether the frame body is compressed. The header itself never is.
    pub fn compression(&self) -> bool {
        self.0 & COMPRESSION != 0
    }

    /// Set the compression flag.
    pub fn set_compression(&mut self, value: bool) {
        if value {
            self.0 |= COMPRESSION;
        } else {
            self.0 &= !COMPRESSION;
        }
    }

    /// Whether tracing was requested (request) or a tracing id precedes the body (response).
    pub fn tracing(&self) -> bool {
        self.0 & TRACING != 0
    }

    /// Set the tracing flag.
    pub fn set_tracing(&mut self, value: bool) {
        if value {
            self.0 |= TRACING;
        } else {
            self.0 &= !TRACING;
        }
    }
}

/// The fixed frame header: version, flags, a signed one-byte stream id, the
/// opcode and the body length.
#[derive(Copy, Clone, Debug)]
pub struct Header {
    pub(crate) version: Version,
    pub(crate) flags: Flags,
    pub(crate) stream: i8,
    pub(crate) opcode: OpCode,
    pub(crate) body_len: u32,
}

impl Header {
    /// Create a request header for the given dialect.
    pub fn for_request(version: ProtocolVersion, flags: Flags, stream: i8, opcode: OpCode) -> Self {
        Self {
            version: Version(version.request_byte()),
            flags,
            stream,
            opcode,
            body_len: 0,
        }
    }

    /// Get the direction encoded in the version byte.
    pub fn direction(&self) -> Direction {
        self.version.direction()
    }

    /// Get the protocol version.
    pub fn version(&self) -> anyhow::Result<ProtocolVersion> {
        self.version.version()
    }

    /// Get the header flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Get the stream id. Non-negative ids belong to client streams, -1 to server pushed events.
    pub fn stream(&self) -> i8 {
        self.stream
    }

    /// Get the opcode.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Get the declared body length.
    pub fn body_len(&self) -> u32 {
        self.body_len
    }

    /// Set the declared body length.
    pub fn set_body_len(&mut self, body_len: u32) {
        self.body_len = body_len;
    }

    /// Parse a response header of the expected dialect. A request direction
    /// bit, a version mismatch, an unknown opcode, or an oversized body
    /// length are all protocol violations.
    pub fn parse_response(bytes: &[u8], expected: ProtocolVersion) -> anyhow::Result<Self> {
        anyhow::ensure!(bytes.len() == HEADER_LEN, "Invalid header length: {}", bytes.len());
        let version = Version(bytes[0]);
        anyhow::ensure!(
            version.direction() == Direction::Response,
            "Response frame carries a request direction bit"
        );
        let actual = version.version()?;
        anyhow::ensure!(
            actual == expected,
            "Response version mismatch: expected v{}, got v{}",
            expected as u8,
            actual as u8
        );
        let opcode = OpCode::decode(bytes[3], expected)?;
        let body_len = u32::from_be_bytes(bytes[4..8].try_into()?);
        anyhow::ensure!(body_len <= MAX_BODY_LEN, "Frame body too large: {}", body_len);
        Ok(Header {
            version,
            flags: Flags(bytes[1]),
            stream: bytes[2] as i8,
            opcode,
            body_len,
        })
    }
}

impl Header {
    /// Serialize the header into its wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let len = self.body_len.to_be_bytes();
        [
            self.version.0,
            self.flags.0,
            self.stream as u8,
            self.opcode.as_byte(),
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_wire_form() {
        let mut header = Header::for_request(ProtocolVersion::V1, Flags::default(), 0, OpCode::Startup);
        header.set_body_len(0x16);
        assert_eq!(header.to_bytes(), [0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x16]);
    }

    #[test]
    fn response_header_parses() {
        let header = Header::parse_response(&[0x81, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00], ProtocolVersion::V1)
            .unwrap();
        assert_eq!(header.opcode(), OpCode::Ready);
        assert_eq!(header.stream(), 0);
        assert_eq!(header.body_len(), 0);
    }

    #[test]
    fn direction_bit_mismatch_is_rejected() {
        // request direction bit on a response header
        assert!(Header::parse_response(&[0x02, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00], ProtocolVersion::V2).is_err());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        assert!(Header::parse_response(&[0x82, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00], ProtocolVersion::V1).is_err());
    }

    #[test]
    fn event_stream_id_parses_negative() {
        let header = Header::parse_response(&[0x82, 0x00, 0xFF, 0x0C, 0x00, 0x00, 0x00, 0x00], ProtocolVersion::V2)
            .unwrap();
        assert_eq!(header.stream(), EVENT_STREAM_ID);
    }
}
