// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the encoder/decoder for the frames of the CQL
//! binary protocol, versions 1 and 2, and the primitive notations they are
//! built from.

pub mod column_type;
pub mod consistency;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod opcode;
pub mod requests;
pub mod responses;
pub mod rows;
pub mod value;

pub use self::{
    requests::{
        auth_response::*,
        credentials::*,
        execute::*,
        options::*,
        prepare::*,
        query::*,
        query_flags::*,
        register::*,
        startup::*,
        *,
    },
    responses::{
        auth_challenge::*,
        auth_success::*,
        authenticate::*,
        error::*,
        event::*,
        ready::*,
        result::*,
        supported::*,
        *,
    },
};
pub use column_type::ColumnType;
pub use consistency::Consistency;
pub use decoder::{
    ColumnDecoder,
    RowDecoder,
};
pub use encoder::ColumnEncoder;
pub use header::{
    Header,
    ProtocolVersion,
};
pub use opcode::OpCode;
pub use rows::*;
pub use value::CqlValue;

use crate::compression::CompressionError;
use std::{
    collections::HashMap,
    convert::TryInto,
    net::{
        IpAddr,
        SocketAddr,
    },
    ops::{
        Deref,
        DerefMut,
    },
};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid frame opcode. Expected {0:x}, got {1:x}")]
    WrongHeaderOpcode(u8, u8),
    #[error("Invalid frame header: {0}")]
    InvalidHeader(anyhow::Error),
    #[error("Invalid frame body: {0}")]
    InvalidBody(anyhow::Error),
    #[error("Invalid frame: {0}")]
    InvalidFrame(anyhow::Error),
    #[error("Payload is too small")]
    TooSmall,
    #[error(transparent)]
    CompressionError(#[from] CompressionError),
}

/// A wrapper for a `Vec<u8>` that can be used to encode and decode values as the `blob` column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

#[allow(missing_docs)]
impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Blob(data)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Blob {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Blob {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Blob(v)
    }
}

/// Read a `[string]` from a payload into an owned String.
///
/// `[string]`: A `[short]` n, followed by n bytes representing a UTF-8 string.
pub fn read_string(start: &mut usize, payload: &[u8]) -> anyhow::Result<String> {
    let length = read_short(start, payload)? as usize;
    anyhow::ensure!(payload.len() >= *start + length, "Not enough bytes for string");
    let res = String::from_utf8(payload[*start..][..length].to_vec())?;
    *start += length;
    Ok(res)
}

/// Read a `[long string]` from a payload into an owned String.
///
/// `[long string]`: An `[int]` n, followed by n bytes representing a UTF-8 string.
pub fn read_long_string(start: &mut usize, payload: &[u8]) -> anyhow::Result<String> {
    let length = read_int(start, payload)?;
    anyhow::ensure!(length >= 0, "Negative long string length");
    let length = length as usize;
    anyhow::ensure!(payload.len() >= *start + length, "Not enough bytes for string");
    let res = String::from_utf8(payload[*start..][..length].to_vec())?;
    *start += length;
    Ok(res)
}

/// Read a `[string]` from a payload into a borrowed str.
pub fn read_str<'a>(start: &mut usize, payload: &'a [u8]) -> anyhow::Result<&'a str> {
    let length = read_short(start, payload)? as usize;
    anyhow::ensure!(payload.len() >= *start + length, "Not enough bytes for string");
    let res = std::str::from_utf8(&payload[*start..][..length])?;
    *start += length;
    Ok(res)
}

/// Write a `[string]` to a payload.
pub fn write_string(s: &str, payload: &mut Vec<u8>) {
    payload.extend((s.len() as u16).to_be_bytes());
    payload.extend(s.as_bytes());
}

/// Write a `[long string]` to a payload.
pub fn write_long_string(s: &str, payload: &mut Vec<u8>) {
    payload.extend((s.len() as i32).to_be_bytes());
    payload.extend(s.as_bytes());
}

/// Read a `[short]` from a payload into a u16.
///
/// `[short]`: A 2 bytes unsigned integer.
pub fn read_short(start: &mut usize, payload: &[u8]) -> anyhow::Result<u16> {
    anyhow::ensure!(payload.len() >= *start + 2, "Not enough bytes for short");
    let res = u16::from_be_bytes(payload[*start..][..2].try_into()?);
    *start += 2;
    Ok(res)
}

/// Write a `[short]` to a payload.
pub fn write_short(v: u16, payload: &mut Vec<u8>) {
    payload.extend(v.to_be_bytes());
}

/// Read an `[int]` from a payload into an i32.
///
/// `[int]`: A 4 bytes signed integer.
pub fn read_int(start: &mut usize, payload: &[u8]) -> anyhow::Result<i32> {
    anyhow::ensure!(payload.len() >= *start + 4, "Not enough bytes for int");
    let res = i32::from_be_bytes(payload[*start..][..4].try_into()?);
    *start += 4;
    Ok(res)
}

/// Write an `[int]` to a payload.
pub fn write_int(v: i32, payload: &mut Vec<u8>) {
    payload.extend(v.to_be_bytes());
}

/// Read a `[long]` from a payload into an i64.
///
/// `[long]`: An 8 bytes signed integer.
pub fn read_long(start: &mut usize, payload: &[u8]) -> anyhow::Result<i64> {
    anyhow::ensure!(payload.len() >= *start + 8, "Not enough bytes for long");
    let res = i64::from_be_bytes(payload[*start..][..8].try_into()?);
    *start += 8;
    Ok(res)
}

/// Write a `[long]` to a payload.
pub fn write_long(v: i64, payload: &mut Vec<u8>) {
    payload.extend(v.to_be_bytes());
}

/// Read a `[byte]` from a payload into a u8.
pub fn read_byte(start: &mut usize, payload: &[u8]) -> anyhow::Result<u8> {
    anyhow::ensure!(payload.len() > *start, "Not enough bytes");
    let res = payload[*start];
    *start += 1;
    Ok(res)
}

/// Write a `[byte]` to a payload.
pub fn write_byte(b: u8, payload: &mut Vec<u8>) {
    payload.push(b);
}

/// Read a `[bytes]` from a payload into a borrowed slice.
///
/// `[bytes]`: An `[int]` n, followed by n bytes if `n >= 0`. If `n < 0`, no byte follows and the value
/// represented is `null`. A null value is distinct from a present zero-length value.
pub fn read_bytes<'a>(start: &mut usize, payload: &'a [u8]) -> anyhow::Result<Option<&'a [u8]>> {
    let length = read_int(start, payload)?;
    if length < 0 {
        return Ok(None);
    }
    let length = length as usize;
    anyhow::ensure!(payload.len() >= *start + length, "Not enough bytes for bytes value");
    let res = &payload[*start..][..length];
    *start += length;
    Ok(Some(res))
}

/// Write a `[bytes]` to a payload.
pub fn write_bytes(b: &[u8], payload: &mut Vec<u8>) {
    payload.extend((b.len() as i32).to_be_bytes());
    payload.extend(b);
}

/// Write a null `[bytes]` (length -1) to a payload.
pub fn write_null_bytes(payload: &mut Vec<u8>) {
    payload.extend(i32::to_be_bytes(-1));
}

/// Read a `[short bytes]` from a payload into a borrowed slice.
///
/// `[short bytes]`: A `[short]` n, followed by n bytes. There is no null form.
pub fn read_short_bytes<'a>(start: &mut usize, payload: &'a [u8]) -> anyhow::Result<&'a [u8]> {
    let length = read_short(start, payload)? as usize;
    anyhow::ensure!(payload.len() >= *start + length, "Not enough bytes for short bytes");
    let res = &payload[*start..][..length];
    *start += length;
    Ok(res)
}

/// Write a `[short bytes]` to a payload.
pub fn write_short_bytes(b: &[u8], payload: &mut Vec<u8>) {
    payload.extend((b.len() as u16).to_be_bytes());
    payload.extend(b);
}

/// Read a `[string list]` from a payload into a `Vec<String>`.
///
/// `[string list]`: A `[short]` n, followed by n `[string]`.
pub fn read_string_list(start: &mut usize, payload: &[u8]) -> anyhow::Result<Vec<String>> {
    let list_len = read_short(start, payload)? as usize;
    let mut list = Vec::with_capacity(list_len);
    for _ in 0..list_len {
        list.push(read_string(start, payload)?);
    }
    Ok(list)
}

/// Write a `[string list]` to a payload.
pub fn write_string_list(l: &[String], payload: &mut Vec<u8>) {
    payload.extend((l.len() as u16).to_be_bytes());
    for s in l {
        write_string(s, payload);
    }
}

/// Read a list of any type that can be read from a payload into a `Vec<T>`.
/// Uses `[short]` for the length of the list.
pub fn read_list<T: FromPayload>(start: &mut usize, payload: &[u8]) -> anyhow::Result<Vec<T>> {
    let list_len = read_short(start, payload)? as usize;
    let mut list = Vec::with_capacity(list_len);
    for _ in 0..list_len {
        list.push(T::from_payload(start, payload)?);
    }
    Ok(list)
}

/// Write a list of any type that can be written to a payload.
/// Uses `[short]` for the length of the list.
pub fn write_list<T: ToPayload>(l: Vec<T>, payload: &mut Vec<u8>) {
    payload.extend((l.len() as u16).to_be_bytes());
    for v in l {
        T::to_payload(v, payload);
    }
}

/// Read a `[string map]` from a payload into a `HashMap<String, String>`.
///
/// `[string map]`: A `[short]` n, followed by n pair `<k><v>` where `<k>` and `<v>` are `[string]`.
pub fn read_string_map(start: &mut usize, payload: &[u8]) -> anyhow::Result<HashMap<String, String>> {
    let length = read_short(start, payload)? as usize;
    let mut map = HashMap::with_capacity(length);
    for _ in 0..length {
        map.insert(read_string(start, payload)?, read_string(start, payload)?);
    }
    Ok(map)
}

/// Write a `[string map]` to a payload.
pub fn write_string_map(m: &HashMap<String, String>, payload: &mut Vec<u8>) {
    payload.extend((m.len() as u16).to_be_bytes());
    for (k, v) in m {
        write_string(k, payload);
        write_string(v, payload);
    }
}

/// Read a `[string multimap]` from a payload into a `HashMap<String, Vec<String>>`.
///
/// `[string multimap]`: A `[short]` n, followed by n pair `<k><v>` where `<k>` is a `[string]` and
/// `<v>` is a `[string list]`.
pub fn read_string_multimap(start: &mut usize, payload: &[u8]) -> anyhow::Result<HashMap<String, Vec<String>>> {
    let length = read_short(start, payload)? as usize;
    let mut multimap = HashMap::with_capacity(length);
    for _ in 0..length {
        multimap.insert(read_string(start, payload)?, read_string_list(start, payload)?);
    }
    Ok(multimap)
}

/// Write a `[string multimap]` to a payload.
pub fn write_string_multimap(m: &HashMap<String, Vec<String>>, payload: &mut Vec<u8>) {
    payload.extend((m.len() as u16).to_be_bytes());
    for (k, v) in m {
        write_string(k, payload);
        write_string_list(v, payload);
    }
}

/// Read an `[inet]` from a payload into a `SocketAddr`.
///
/// `[inet]`: One `[byte]` n representing the address size, followed by n `[byte]` representing the
/// IP address (n is either 4 or 16), followed by one `[int]` representing the port.
pub fn read_inet(start: &mut usize, payload: &[u8]) -> anyhow::Result<SocketAddr> {
    let address_len = read_byte(start, payload)? as usize;
    anyhow::ensure!(payload.len() >= *start + address_len + 4, "Not enough bytes for inet");
    let ip = match address_len {
        4 => IpAddr::V4(u32::from_be_bytes(payload[*start..][..4].try_into()?).into()),
        16 => IpAddr::V6(u128::from_be_bytes(payload[*start..][..16].try_into()?).into()),
        n => anyhow::bail!("Invalid inet address length: {}", n),
    };
    *start += address_len;
    let port = read_int(start, payload)?;
    Ok(SocketAddr::new(ip, port as u16))
}

/// Write an `[inet]` to a payload.
pub fn write_inet(a: SocketAddr, payload: &mut Vec<u8>) {
    match a {
        SocketAddr::V4(addr) => {
            payload.push(4u8);
            payload.extend(addr.ip().octets());
        }
        SocketAddr::V6(addr) => {
            payload.push(16u8);
            payload.extend(addr.ip().octets());
        }
    }
    payload.extend((a.port() as i32).to_be_bytes());
}

/// Defines a type that can be read from a frame payload.
pub trait FromPayload: Sized {
    /// Read this value from a frame payload. This method should read the payload beginning with the given `start`
    /// index, and update it by adding the number of bytes read.
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self>;
}

impl FromPayload for String {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        read_string(start, payload)
    }
}

impl FromPayload for SocketAddr {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        read_inet(start, payload)
    }
}

/// Defines a type that can be written to a frame payload.
pub trait ToPayload {
    /// Write this value to a frame payload.
    fn to_payload(self, payload: &mut Vec<u8>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let mut payload = Vec::new();
        write_string("keyspace_1", &mut payload);
        assert_eq!(payload[..2], [0, 10]);
        let mut start = 0;
        assert_eq!(read_string(&mut start, &payload).unwrap(), "keyspace_1");
        assert_eq!(start, payload.len());
    }

    #[test]
    fn bytes_null_is_distinct_from_empty() {
        let mut payload = Vec::new();
        write_null_bytes(&mut payload);
        write_bytes(&[], &mut payload);
        let mut start = 0;
        assert_eq!(read_bytes(&mut start, &payload).unwrap(), None);
        assert_eq!(read_bytes(&mut start, &payload).unwrap(), Some(&[][..]));
        assert_eq!(start, payload.len());
    }

    #[test]
    fn short_read_is_an_error() {
        let payload = vec![0u8, 5, b'a', b'b'];
        let mut start = 0;
        assert!(read_string(&mut start, &payload).is_err());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let payload = vec![0u8, 2, 0xFF, 0xFE];
        let mut start = 0;
        assert!(read_string(&mut start, &payload).is_err());
    }

    #[test]
    fn multimap_roundtrip() {
        let m = maplit::hashmap! {
            "COMPRESSION".to_owned() => vec!["lz4".to_owned(), "snappy".to_owned()],
        };
        let mut payload = Vec::new();
        write_string_multimap(&m, &mut payload);
        let mut start = 0;
        assert_eq!(read_string_multimap(&mut start, &payload).unwrap(), m);
        assert_eq!(start, payload.len());
    }

    #[test]
    fn inet_roundtrip() {
        let addr: SocketAddr = "127.0.0.1:9042".parse().unwrap();
        let mut payload = Vec::new();
        write_inet(addr, &mut payload);
        let mut start = 0;
        assert_eq!(read_inet(&mut start, &payload).unwrap(), addr);
        assert_eq!(start, payload.len());
    }
}
