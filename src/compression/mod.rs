// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the uncompressed, LZ4, and snappy body transforms
//! negotiated at STARTUP. The 8-byte frame header is never compressed.

use crate::frame::header::{
    ProtocolVersion,
    COMPRESSION,
    HEADER_LEN,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::convert::TryInto;
use thiserror::Error;

/// The buffer compression/decompression seam. Implementations transform the
/// frame body; flag handling and length fixup are shared.
pub trait Compression: Sync {
    /// The `COMPRESSION` startup-option value, or `None` for no transform.
    const KIND: Option<&'static str>;

    /// Accepts a whole frame buffer and compresses its body in place,
    /// setting the compression flag and fixing the declared length.
    fn compress(mut buffer: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        if buffer.len() < HEADER_LEN {
            return Err(CompressionError::SmallBuffer);
        }
        if Self::KIND.is_none() {
            return Ok(buffer);
        }
        let body = Self::compress_body(&buffer[HEADER_LEN..])?;
        buffer[1] |= COMPRESSION;
        buffer[4..HEADER_LEN].copy_from_slice(&(body.len() as u32).to_be_bytes());
        buffer.truncate(HEADER_LEN);
        buffer.extend(body);
        Ok(buffer)
    }

    /// Accepts a whole frame buffer and decompresses its body in place when
    /// the compression flag is set, fixing the declared length.
    fn decompress(mut buffer: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        if buffer.len() < HEADER_LEN {
            return Err(CompressionError::SmallBuffer);
        }
        if buffer[1] & COMPRESSION == 0 {
            return Ok(buffer);
        }
        let body = Self::decompress_body(&buffer[HEADER_LEN..])?;
        buffer[1] &= !COMPRESSION;
        buffer[4..HEADER_LEN].copy_from_slice(&(body.len() as u32).to_be_bytes());
        buffer.truncate(HEADER_LEN);
        buffer.extend(body);
        Ok(buffer)
    }

    /// Compress a raw frame body.
    fn compress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError>;
    /// Decompress a raw frame body.
    fn decompress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// The compression algorithm negotiated for a session, for dispatch at
/// runtime. LZ4 only exists on the v2 wire.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompressionKind {
    /// The snappy raw format.
    #[serde(rename = "snappy")]
    Snappy,
    /// An `[int]` uncompressed length followed by an LZ4 block (v2).
    #[serde(rename = "lz4")]
    Lz4,
}

impl CompressionKind {
    /// The `COMPRESSION` startup-option value of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Lz4 => "lz4",
        }
    }

    /// Whether this algorithm can be negotiated in the given dialect.
    pub fn in_dialect(&self, version: ProtocolVersion) -> bool {
        match self {
            Self::Snappy => true,
            Self::Lz4 => version == ProtocolVersion::V2,
        }
    }

    /// Compress a whole frame buffer with this algorithm.
    pub fn compress(&self, buffer: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        match self {
            Self::Snappy => Snappy::compress(buffer),
            Self::Lz4 => Lz4::compress(buffer),
        }
    }

    /// Decompress a whole frame buffer with this algorithm.
    pub fn decompress(&self, buffer: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        match self {
            Self::Snappy => Snappy::decompress(buffer),
            Self::Lz4 => Lz4::decompress(buffer),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Failed to compress the frame: {0}")]
    BadCompression(anyhow::Error),
    #[error("Failed to decompress the frame: {0}")]
    BadDecompression(anyhow::Error),
    #[error("Buffer is too small")]
    SmallBuffer,
}

/// LZ4 unit structure which implements the compression trait.
#[derive(Debug, Copy, Clone)]
pub struct Lz4;

impl Compression for Lz4 {
    const KIND: Option<&'static str> = Some("lz4");

    fn compress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut out = (body.len() as i32).to_be_bytes().to_vec();
        out.extend(
            lz4::block::compress(body, None, false).map_err(|e| CompressionError::BadCompression(e.into()))?,
        );
        Ok(out)
    }

    fn decompress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if body.len() < 4 {
            return Err(CompressionError::SmallBuffer);
        }
        let size = i32::from_be_bytes(
            body[..4]
                .try_into()
                .map_err(|e: std::array::TryFromSliceError| CompressionError::BadDecompression(e.into()))?,
        );
        // lz4 fails on a zero-sized block, just skip it
        if size == 0 {
            return Ok(Vec::new());
        }
        lz4::block::decompress(&body[4..], Some(size)).map_err(|e| CompressionError::BadDecompression(e.into()))
    }
}

/// Snappy unit structure which implements the compression trait.
#[derive(Debug, Copy, Clone)]
pub struct Snappy;

impl Compression for Snappy {
    const KIND: Option<&'static str> = Some("snappy");

    fn compress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        snap::raw::Encoder::new()
            .compress_vec(body)
            .map_err(|e| CompressionError::BadCompression(e.into()))
    }

    fn decompress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        snap::raw::Decoder::new()
            .decompress_vec(body)
            .map_err(|e| CompressionError::BadDecompression(e.into()))
    }
}

/// Uncompressed unit structure which implements the compression trait.
#[derive(Debug, Copy, Clone)]
pub struct Uncompressed;

impl Compression for Uncompressed {
    const KIND: Option<&'static str> = None;

    fn compress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(body.to_vec())
    }

    fn decompress_body(body: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_body(body: &[u8]) -> Vec<u8> {
        let mut buffer = vec![0x02, 0x00, 0x00, 0x07];
        buffer.extend((body.len() as u32).to_be_bytes());
        buffer.extend(body);
        buffer
    }

    fn roundtrip<C: Compression>(body: &[u8]) {
        let frame = frame_with_body(body);
        let compressed = C::compress(frame.clone()).unwrap();
        let restored = C::decompress(compressed).unwrap();
        assert_eq!(restored, frame);
    }

    #[test]
    fn snappy_roundtrip() {
        roundtrip::<Snappy>(b"SELECT k FROM t WHERE k = 'xxxxxxxxxxxxxxxxxxxx'");
    }

    #[test]
    fn lz4_roundtrip() {
        roundtrip::<Lz4>(b"SELECT k FROM t WHERE k = 'xxxxxxxxxxxxxxxxxxxx'");
        roundtrip::<Lz4>(b"");
    }

    #[test]
    fn uncompressed_is_identity() {
        let frame = frame_with_body(b"abc");
        assert_eq!(Uncompressed::compress(frame.clone()).unwrap(), frame);
    }

    #[test]
    fn compressed_length_field_is_rewritten() {
        let frame = frame_with_body(&[0u8; 1024]);
        let compressed = Snappy::compress(frame).unwrap();
        let declared = u32::from_be_bytes(compressed[4..8].try_into().unwrap()) as usize;
        assert_eq!(declared, compressed.len() - HEADER_LEN);
        assert!(declared < 1024);
    }

    #[test]
    fn lz4_is_v2_only() {
        assert!(!CompressionKind::Lz4.in_dialect(ProtocolVersion::V1));
        assert!(CompressionKind::Snappy.in_dialect(ProtocolVersion::V1));
    }
}
