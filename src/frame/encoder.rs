// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements typed column encoding, used to bind `EXECUTE` and
//! `QUERY` argument values.

use super::Blob;
use bigdecimal::BigDecimal;
use chrono::{
    DateTime,
    Utc,
};
use num_bigint::BigInt;
use std::{
    collections::HashMap,
    net::{
        IpAddr,
        Ipv4Addr,
        Ipv6Addr,
    },
};
use uuid::Uuid;

/// The 16-byte body length.
pub const BE_16_BYTES_LEN: [u8; 4] = [0, 0, 0, 16];
/// The 8-byte body length.
pub const BE_8_BYTES_LEN: [u8; 4] = [0, 0, 0, 8];
/// The 4-byte body length.
pub const BE_4_BYTES_LEN: [u8; 4] = [0, 0, 0, 4];
/// The 2-byte body length.
pub const BE_2_BYTES_LEN: [u8; 4] = [0, 0, 0, 2];
/// The 1-byte body length.
pub const BE_1_BYTES_LEN: [u8; 4] = [0, 0, 0, 1];
/// The 0-byte body length.
pub const BE_0_BYTES_LEN: [u8; 4] = [0, 0, 0, 0];
/// The NULL body length.
pub const BE_NULL_BYTES_LEN: [u8; 4] = [255, 255, 255, 255]; // -1 length
/// The NULL value used to indicate the body length.
pub const NULL_VALUE: Null = Null;
/// The Null unit structure.
pub struct Null;

/// The column encoder trait: write a value as a length-framed `[bytes]`
/// argument. Null is written as length -1.
pub trait ColumnEncoder {
    /// Encode the value into the buffer, including its `[int]` length.
    fn encode(&self, buffer: &mut Vec<u8>);

    /// Encode this value to a new buffer.
    fn encode_new(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

impl<E: ColumnEncoder + ?Sized> ColumnEncoder for &E {
    fn encode(&self, buffer: &mut Vec<u8>) {
        E::encode(*self, buffer)
    }
}

impl<E: ColumnEncoder> ColumnEncoder for Option<E> {
    fn encode(&self, buffer: &mut Vec<u8>) {
        match self {
            Some(value) => value.encode(buffer),
            None => NULL_VALUE.encode(buffer),
        }
    }
}

impl ColumnEncoder for Null {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_NULL_BYTES_LEN);
    }
}

macro_rules! impl_simple_encoder {
    ($t:ty, $len:ident) => {
        impl ColumnEncoder for $t {
            fn encode(&self, buffer: &mut Vec<u8>) {
                buffer.extend(&$len);
                buffer.extend(&<$t>::to_be_bytes(*self));
            }
        }
    };
}

impl_simple_encoder!(i64, BE_8_BYTES_LEN);
impl_simple_encoder!(i32, BE_4_BYTES_LEN);
impl_simple_encoder!(i16, BE_2_BYTES_LEN);
impl_simple_encoder!(i8, BE_1_BYTES_LEN);
impl_simple_encoder!(f64, BE_8_BYTES_LEN);
impl_simple_encoder!(f32, BE_4_BYTES_LEN);

impl ColumnEncoder for bool {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_1_BYTES_LEN);
        buffer.push(*self as u8);
    }
}

impl ColumnEncoder for String {
    fn encode(&self, buffer: &mut Vec<u8>) {
        self.as_str().encode(buffer)
    }
}

impl ColumnEncoder for str {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&i32::to_be_bytes(self.len() as i32));
        buffer.extend(self.bytes());
    }
}

impl ColumnEncoder for Blob {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&i32::to_be_bytes(self.len() as i32));
        buffer.extend(self.as_slice());
    }
}

impl ColumnEncoder for Uuid {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_16_BYTES_LEN);
        buffer.extend(self.as_bytes());
    }
}

impl ColumnEncoder for DateTime<Utc> {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_8_BYTES_LEN);
        buffer.extend(self.timestamp_millis().to_be_bytes());
    }
}

impl ColumnEncoder for BigInt {
    fn encode(&self, buffer: &mut Vec<u8>) {
        let bytes = self.to_signed_bytes_be();
        buffer.extend(&i32::to_be_bytes(bytes.len() as i32));
        buffer.extend(bytes);
    }
}

impl ColumnEncoder for BigDecimal {
    fn encode(&self, buffer: &mut Vec<u8>) {
        let (mantissa, scale) = self.as_bigint_and_exponent();
        let bytes = mantissa.to_signed_bytes_be();
        buffer.extend(&i32::to_be_bytes(bytes.len() as i32 + 4));
        buffer.extend((scale as i32).to_be_bytes());
        buffer.extend(bytes);
    }
}

impl ColumnEncoder for IpAddr {
    fn encode(&self, buffer: &mut Vec<u8>) {
        match *self {
            IpAddr::V4(ip) => ip.encode(buffer),
            IpAddr::V6(ip) => ip.encode(buffer),
        }
    }
}

impl ColumnEncoder for Ipv4Addr {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_4_BYTES_LEN);
        buffer.extend(&self.octets());
    }
}

impl ColumnEncoder for Ipv6Addr {
    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend(&BE_16_BYTES_LEN);
        buffer.extend(&self.octets());
    }
}

// Collections are framed with `[short]` counts and `[short bytes]` elements
// in protocol v1/v2. The inner encoder writes an `[int]` length which gets
// reframed to a `[short]` one.
fn reframe_element<E: ColumnEncoder>(e: &E, buffer: &mut Vec<u8>) {
    let framed = e.encode_new();
    let payload = &framed[4..];
    buffer.extend((payload.len() as u16).to_be_bytes());
    buffer.extend(payload);
}

impl<E: ColumnEncoder> ColumnEncoder for Vec<E> {
    fn encode(&self, buffer: &mut Vec<u8>) {
        let mut buf = Vec::new();
        buf.extend((self.len() as u16).to_be_bytes());
        for e in self {
            reframe_element(e, &mut buf);
        }
        buffer.extend(&i32::to_be_bytes(buf.len() as i32));
        buffer.extend(buf);
    }
}

impl<K: ColumnEncoder, V: ColumnEncoder, S: ::std::hash::BuildHasher> ColumnEncoder for HashMap<K, V, S> {
    fn encode(&self, buffer: &mut Vec<u8>) {
        let mut buf = Vec::new();
        buf.extend((self.len() as u16).to_be_bytes());
        for (k, v) in self {
            reframe_element(k, &mut buf);
            reframe_element(v, &mut buf);
        }
        buffer.extend(&i32::to_be_bytes(buf.len() as i32));
        buffer.extend(buf);
    }
}
