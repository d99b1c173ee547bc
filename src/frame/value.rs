// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the schema-driven value codec: decoding a column
//! payload into a typed value under a [`ColumnType`] descriptor, and the
//! inverse encoding used for `EXECUTE` argument binding.

use super::{
    column_type::ColumnType,
    read_short,
};
use bigdecimal::BigDecimal;
use chrono::{
    DateTime,
    Utc,
};
use num_bigint::BigInt;
use std::{
    convert::TryInto,
    net::{
        IpAddr,
        Ipv4Addr,
        Ipv6Addr,
    },
};
use uuid::Uuid;

/// A single typed column value. `Null` is the canonical decoding of a
/// negative `[bytes]` length and is distinct from a present-but-empty value
/// such as `Text("")`.
#[derive(Clone, Debug, PartialEq)]
pub enum CqlValue {
    /// The null value.
    Null,
    /// `ascii`, `text` and `varchar` payloads.
    Text(String),
    /// `blob` and `custom` payloads.
    Blob(Vec<u8>),
    /// `boolean`.
    Boolean(bool),
    /// `int`.
    Int(i32),
    /// `bigint` and `timestamp`-adjacent 8-byte longs.
    BigInt(i64),
    /// `counter`.
    Counter(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `timestamp`, milliseconds since the Unix epoch in UTC.
    Timestamp(DateTime<Utc>),
    /// `uuid` and `timeuuid`.
    Uuid(Uuid),
    /// `varint`, an arbitrary-precision two's-complement integer.
    VarInt(BigInt),
    /// `decimal`, mantissa scaled by a power of ten.
    Decimal(BigDecimal),
    /// `inet`, a bare 4- or 16-byte address without a port.
    Inet(IpAddr),
    /// `list<E>`.
    List(Vec<CqlValue>),
    /// `set<E>`, kept in wire order.
    Set(Vec<CqlValue>),
    /// `map<K, V>`, kept in wire order.
    Map(Vec<(CqlValue, CqlValue)>),
}

impl CqlValue {
    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, CqlValue::Null)
    }

    /// Decode a column payload under the given type descriptor. The payload
    /// is the inner `[bytes]` value; the caller maps a negative length to
    /// [`CqlValue::Null`] before getting here.
    pub fn decode(slice: &[u8], kind: &ColumnType) -> anyhow::Result<Self> {
        Ok(match kind {
            ColumnType::Ascii | ColumnType::Text | ColumnType::VarChar => {
                CqlValue::Text(String::from_utf8(slice.to_vec())?)
            }
            ColumnType::Blob | ColumnType::Custom(_) => CqlValue::Blob(slice.to_vec()),
            ColumnType::Boolean => {
                // some encoders historically sent booleans 4 bytes wide; take the last byte
                anyhow::ensure!(!slice.is_empty(), "Empty boolean payload");
                CqlValue::Boolean(slice[slice.len() - 1] != 0)
            }
            ColumnType::Int => CqlValue::Int(i32::from_be_bytes(slice.try_into()?)),
            ColumnType::BigInt => CqlValue::BigInt(i64::from_be_bytes(slice.try_into()?)),
            ColumnType::Counter => CqlValue::Counter(i64::from_be_bytes(slice.try_into()?)),
            ColumnType::Float => CqlValue::Float(f32::from_be_bytes(slice.try_into()?)),
            ColumnType::Double => CqlValue::Double(f64::from_be_bytes(slice.try_into()?)),
            ColumnType::Timestamp => {
                let millis = i64::from_be_bytes(slice.try_into()?);
                CqlValue::Timestamp(
                    DateTime::from_timestamp_millis(millis)
                        .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", millis))?,
                )
            }
            ColumnType::Uuid | ColumnType::TimeUuid => CqlValue::Uuid(Uuid::from_slice(slice)?),
            ColumnType::VarInt => {
                anyhow::ensure!(!slice.is_empty(), "Empty varint payload");
                CqlValue::VarInt(BigInt::from_signed_bytes_be(slice))
            }
            ColumnType::Decimal => {
                anyhow::ensure!(slice.len() > 4, "Decimal payload too short");
                let scale = i32::from_be_bytes(slice[..4].try_into()?);
                let mantissa = BigInt::from_signed_bytes_be(&slice[4..]);
                CqlValue::Decimal(BigDecimal::new(mantissa, scale as i64))
            }
            ColumnType::Inet => CqlValue::Inet(match slice.len() {
                4 => IpAddr::V4(Ipv4Addr::new(slice[0], slice[1], slice[2], slice[3])),
                16 => IpAddr::V6(u128::from_be_bytes(slice.try_into()?).into()),
                n => anyhow::bail!("Invalid inet payload length: {}", n),
            }),
            ColumnType::List(element) => CqlValue::List(decode_elements(slice, element)?),
            ColumnType::Set(element) => CqlValue::Set(decode_elements(slice, element)?),
            ColumnType::Map(key, value) => {
                let count = check_collection_count(slice)?;
                let mut start = 2;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let k = decode_element(&mut start, slice, key)?;
                    let v = decode_element(&mut start, slice, value)?;
                    entries.push((k, v));
                }
                CqlValue::Map(entries)
            }
        })
    }

    /// Encode this value as a `[bytes]` argument: an `[int]` length followed
    /// by the payload, or length -1 for null.
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        if self.is_null() {
            buffer.extend(i32::to_be_bytes(-1));
            return;
        }
        let length_idx = buffer.len();
        buffer.extend(i32::to_be_bytes(0));
        self.encode_payload(buffer);
        let length = (buffer.len() - length_idx - 4) as i32;
        buffer[length_idx..][..4].copy_from_slice(&length.to_be_bytes());
    }

    /// Encode this value to a fresh `[bytes]` buffer.
    pub fn encode_new(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer);
        buffer
    }

    // Write the raw inner payload, without any length framing.
    fn encode_payload(&self, buffer: &mut Vec<u8>) {
        match self {
            CqlValue::Null => (),
            CqlValue::Text(s) => buffer.extend(s.as_bytes()),
            CqlValue::Blob(b) => buffer.extend(b),
            CqlValue::Boolean(b) => buffer.push(*b as u8),
            CqlValue::Int(v) => buffer.extend(v.to_be_bytes()),
            CqlValue::BigInt(v) | CqlValue::Counter(v) => buffer.extend(v.to_be_bytes()),
            CqlValue::Float(v) => buffer.extend(v.to_be_bytes()),
            CqlValue::Double(v) => buffer.extend(v.to_be_bytes()),
            CqlValue::Timestamp(t) => buffer.extend(t.timestamp_millis().to_be_bytes()),
            CqlValue::Uuid(u) => buffer.extend(u.as_bytes()),
            CqlValue::VarInt(v) => buffer.extend(v.to_signed_bytes_be()),
            CqlValue::Decimal(d) => {
                let (mantissa, scale) = d.as_bigint_and_exponent();
                buffer.extend((scale as i32).to_be_bytes());
                buffer.extend(mantissa.to_signed_bytes_be());
            }
            CqlValue::Inet(ip) => match ip {
                IpAddr::V4(v4) => buffer.extend(v4.octets()),
                IpAddr::V6(v6) => buffer.extend(v6.octets()),
            },
            CqlValue::List(elements) | CqlValue::Set(elements) => {
                buffer.extend((elements.len() as u16).to_be_bytes());
                for element in elements {
                    encode_element(element, buffer);
                }
            }
            CqlValue::Map(entries) => {
                buffer.extend((entries.len() as u16).to_be_bytes());
                for (k, v) in entries {
                    encode_element(k, buffer);
                    encode_element(v, buffer);
                }
            }
        }
    }
}

// Collection elements are framed as `[short bytes]` in protocol v1/v2.
fn encode_element(element: &CqlValue, buffer: &mut Vec<u8>) {
    let length_idx = buffer.len();
    buffer.extend(u16::to_be_bytes(0));
    element.encode_payload(buffer);
    let length = (buffer.len() - length_idx - 2) as u16;
    buffer[length_idx..][..2].copy_from_slice(&length.to_be_bytes());
}

fn decode_element(start: &mut usize, slice: &[u8], kind: &ColumnType) -> anyhow::Result<CqlValue> {
    let length = read_short(start, slice)? as usize;
    anyhow::ensure!(slice.len() >= *start + length, "Not enough bytes for collection element");
    let value = CqlValue::decode(&slice[*start..][..length], kind)?;
    *start += length;
    Ok(value)
}

fn check_collection_count(slice: &[u8]) -> anyhow::Result<usize> {
    anyhow::ensure!(slice.len() >= 2, "Collection payload too short");
    Ok(u16::from_be_bytes(slice[..2].try_into()?) as usize)
}

fn decode_elements(slice: &[u8], kind: &ColumnType) -> anyhow::Result<Vec<CqlValue>> {
    let count = check_collection_count(slice)?;
    let mut start = 2;
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(decode_element(&mut start, slice, kind)?);
    }
    Ok(elements)
}

impl From<&str> for CqlValue {
    fn from(s: &str) -> Self {
        CqlValue::Text(s.to_owned())
    }
}

impl From<String> for CqlValue {
    fn from(s: String) -> Self {
        CqlValue::Text(s)
    }
}

impl From<i32> for CqlValue {
    fn from(v: i32) -> Self {
        CqlValue::Int(v)
    }
}

impl From<i64> for CqlValue {
    fn from(v: i64) -> Self {
        CqlValue::BigInt(v)
    }
}

impl From<bool> for CqlValue {
    fn from(v: bool) -> Self {
        CqlValue::Boolean(v)
    }
}

impl From<f32> for CqlValue {
    fn from(v: f32) -> Self {
        CqlValue::Float(v)
    }
}

impl From<f64> for CqlValue {
    fn from(v: f64) -> Self {
        CqlValue::Double(v)
    }
}

impl From<Uuid> for CqlValue {
    fn from(v: Uuid) -> Self {
        CqlValue::Uuid(v)
    }
}

impl From<IpAddr> for CqlValue {
    fn from(v: IpAddr) -> Self {
        CqlValue::Inet(v)
    }
}

impl From<DateTime<Utc>> for CqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        CqlValue::Timestamp(v)
    }
}

impl From<BigInt> for CqlValue {
    fn from(v: BigInt) -> Self {
        CqlValue::VarInt(v)
    }
}

impl From<BigDecimal> for CqlValue {
    fn from(v: BigDecimal) -> Self {
        CqlValue::Decimal(v)
    }
}

impl<T: Into<CqlValue>> From<Option<T>> for CqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => CqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: CqlValue, kind: &ColumnType) {
        let bytes = value.encode_new();
        let length = i32::from_be_bytes(bytes[..4].try_into().unwrap());
        assert!(length >= 0);
        let decoded = CqlValue::decode(&bytes[4..], kind).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn scalar_roundtrips() {
        roundtrip(CqlValue::Text("hello".to_owned()), &ColumnType::VarChar);
        roundtrip(CqlValue::Text(String::new()), &ColumnType::Ascii);
        roundtrip(CqlValue::Blob(vec![0, 1, 2, 255]), &ColumnType::Blob);
        roundtrip(CqlValue::Boolean(true), &ColumnType::Boolean);
        roundtrip(CqlValue::Int(-42), &ColumnType::Int);
        roundtrip(CqlValue::BigInt(i64::MIN), &ColumnType::BigInt);
        roundtrip(CqlValue::Counter(7), &ColumnType::Counter);
        roundtrip(CqlValue::Float(1.5), &ColumnType::Float);
        roundtrip(CqlValue::Double(-2.25), &ColumnType::Double);
        roundtrip(
            CqlValue::Timestamp(DateTime::from_timestamp_millis(1_356_048_000_000).unwrap()),
            &ColumnType::Timestamp,
        );
        roundtrip(
            CqlValue::Uuid(Uuid::from_bytes([7; 16])),
            &ColumnType::TimeUuid,
        );
        roundtrip(CqlValue::Inet("10.1.2.3".parse().unwrap()), &ColumnType::Inet);
        roundtrip(CqlValue::Inet("::1".parse().unwrap()), &ColumnType::Inet);
    }

    #[test]
    fn collection_roundtrips() {
        roundtrip(
            CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2), CqlValue::Int(3)]),
            &ColumnType::List(Box::new(ColumnType::Int)),
        );
        roundtrip(
            CqlValue::Set(vec![CqlValue::Text("a".into()), CqlValue::Text("b".into())]),
            &ColumnType::Set(Box::new(ColumnType::VarChar)),
        );
        roundtrip(
            CqlValue::Map(vec![
                (CqlValue::Text("k".into()), CqlValue::BigInt(9)),
                (CqlValue::Text("l".into()), CqlValue::BigInt(10)),
            ]),
            &ColumnType::Map(Box::new(ColumnType::VarChar), Box::new(ColumnType::BigInt)),
        );
        // list<list<int>>
        roundtrip(
            CqlValue::List(vec![CqlValue::List(vec![CqlValue::Int(1)]), CqlValue::List(vec![])]),
            &ColumnType::List(Box::new(ColumnType::List(Box::new(ColumnType::Int)))),
        );
    }

    #[test]
    fn null_encodes_as_negative_length() {
        let bytes = CqlValue::Null.encode_new();
        assert_eq!(bytes, (-1i32).to_be_bytes());
    }

    #[test]
    fn wide_booleans_read_the_last_byte() {
        assert_eq!(
            CqlValue::decode(&[0, 0, 0, 1], &ColumnType::Boolean).unwrap(),
            CqlValue::Boolean(true)
        );
        assert_eq!(
            CqlValue::decode(&[0], &ColumnType::Boolean).unwrap(),
            CqlValue::Boolean(false)
        );
        assert!(CqlValue::decode(&[], &ColumnType::Boolean).is_err());
    }

    #[test]
    fn varint_long_max() {
        let value = CqlValue::VarInt(BigInt::from(i64::MAX));
        let bytes = value.encode_new();
        assert_eq!(&bytes[4..], &[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(CqlValue::decode(&bytes[4..], &ColumnType::VarInt).unwrap(), value);
    }

    #[test]
    fn varint_sign_extension() {
        // a sign-extended negative mantissa decodes to the same integer as the minimal form
        let wide = CqlValue::decode(&[0xFF, 0xFF, 0xCF, 0xC7], &ColumnType::VarInt).unwrap();
        let narrow = CqlValue::decode(&[0xCF, 0xC7], &ColumnType::VarInt).unwrap();
        assert_eq!(wide, CqlValue::VarInt(BigInt::from(-12345)));
        assert_eq!(wide, narrow);
    }

    #[test]
    fn decimal_scale_and_mantissa() {
        // scale 2, mantissa -12345 (sign extended on the wire) == -123.45
        let payload = [0x00, 0x00, 0x00, 0x02, 0xFF, 0xFF, 0xCF, 0xC7];
        let decoded = CqlValue::decode(&payload, &ColumnType::Decimal).unwrap();
        assert_eq!(decoded, CqlValue::Decimal(BigDecimal::new(BigInt::from(-12345), 2)));
        // re-encoding uses the minimum-width mantissa; the logical value round-trips
        let bytes = decoded.encode_new();
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&bytes[8..], &[0xCF, 0xC7]);
        assert_eq!(CqlValue::decode(&bytes[4..], &ColumnType::Decimal).unwrap(), decoded);
    }

    #[test]
    fn uuid_requires_sixteen_bytes() {
        assert!(CqlValue::decode(&[0; 15], &ColumnType::Uuid).is_err());
        assert!(CqlValue::decode(&[0; 16], &ColumnType::Uuid).is_ok());
    }
}
