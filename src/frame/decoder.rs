// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements typed column decoding, for callers that know the
//! Rust shape of their rows up front.

use super::Blob;
use bigdecimal::BigDecimal;
use chrono::{
    DateTime,
    Utc,
};
use num_bigint::BigInt;
use std::{
    collections::HashMap,
    convert::TryInto,
    hash::Hash,
    net::{
        IpAddr,
        Ipv4Addr,
        Ipv6Addr,
    },
};
use uuid::Uuid;

/// The column decoder trait: build a Rust value from a raw column payload.
pub trait ColumnDecoder {
    /// Decode the column payload.
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self>
    where
        Self: Sized;
}

impl<T: ColumnDecoder> ColumnDecoder for Option<T> {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        if slice.is_empty() {
            Ok(None)
        } else {
            T::try_decode_column(slice).map(Into::into)
        }
    }
}

impl ColumnDecoder for i64 {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(i64::from_be_bytes(slice.try_into()?))
    }
}

impl ColumnDecoder for i32 {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(i32::from_be_bytes(slice.try_into()?))
    }
}

impl ColumnDecoder for f64 {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(f64::from_be_bytes(slice.try_into()?))
    }
}

impl ColumnDecoder for f32 {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(f32::from_be_bytes(slice.try_into()?))
    }
}

impl ColumnDecoder for bool {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(!slice.is_empty(), "Empty boolean payload");
        Ok(slice[slice.len() - 1] != 0)
    }
}

impl ColumnDecoder for String {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(String::from_utf8(slice.to_vec())?)
    }
}

impl ColumnDecoder for Blob {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(Blob(slice.to_vec()))
    }
}

impl ColumnDecoder for Uuid {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(Uuid::from_slice(slice)?)
    }
}

impl ColumnDecoder for DateTime<Utc> {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        let millis = i64::from_be_bytes(slice.try_into()?);
        DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", millis))
    }
}

impl ColumnDecoder for BigInt {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(!slice.is_empty(), "Empty varint payload");
        Ok(BigInt::from_signed_bytes_be(slice))
    }
}

impl ColumnDecoder for BigDecimal {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(slice.len() > 4, "Decimal payload too short");
        let scale = i32::from_be_bytes(slice[..4].try_into()?);
        Ok(BigDecimal::new(BigInt::from_signed_bytes_be(&slice[4..]), scale as i64))
    }
}

impl ColumnDecoder for IpAddr {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(if slice.len() == 4 {
            IpAddr::V4(Ipv4Addr::try_decode_column(slice)?)
        } else {
            IpAddr::V6(Ipv6Addr::try_decode_column(slice)?)
        })
    }
}

impl ColumnDecoder for Ipv4Addr {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(slice.len() == 4, "Invalid ipv4 payload length: {}", slice.len());
        Ok(Ipv4Addr::new(slice[0], slice[1], slice[2], slice[3]))
    }
}

impl ColumnDecoder for Ipv6Addr {
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        Ok(u128::from_be_bytes(slice.try_into()?).into())
    }
}

// Collections are framed with `[short]` counts and `[short bytes]` elements
// in protocol v1/v2.
impl<E> ColumnDecoder for Vec<E>
where
    E: ColumnDecoder,
{
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(slice.len() >= 2, "Collection payload too short");
        let list_len = u16::from_be_bytes(slice[..2].try_into()?) as usize;
        let mut list = Vec::with_capacity(list_len);
        let mut element_start = 2;
        for _ in 0..list_len {
            let length = u16::from_be_bytes(slice[element_start..][..2].try_into()?) as usize;
            element_start += 2;
            anyhow::ensure!(slice.len() >= element_start + length, "Not enough bytes for element");
            list.push(E::try_decode_column(&slice[element_start..][..length])?);
            element_start += length;
        }
        Ok(list)
    }
}

impl<K, V, S> ColumnDecoder for HashMap<K, V, S>
where
    K: Eq + Hash + ColumnDecoder,
    V: ColumnDecoder,
    S: ::std::hash::BuildHasher + Default,
{
    fn try_decode_column(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(slice.len() >= 2, "Collection payload too short");
        let map_len = u16::from_be_bytes(slice[..2].try_into()?) as usize;
        let mut map: HashMap<K, V, S> = HashMap::default();
        let mut pair_start = 2;
        for _ in 0..map_len {
            let length = u16::from_be_bytes(slice[pair_start..][..2].try_into()?) as usize;
            pair_start += 2;
            anyhow::ensure!(slice.len() >= pair_start + length, "Not enough bytes for map key");
            let k = K::try_decode_column(&slice[pair_start..][..length])?;
            pair_start += length;
            let length = u16::from_be_bytes(slice[pair_start..][..2].try_into()?) as usize;
            pair_start += 2;
            anyhow::ensure!(slice.len() >= pair_start + length, "Not enough bytes for map value");
            let v = V::try_decode_column(&slice[pair_start..][..length])?;
            pair_start += length;
            map.insert(k, v);
        }
        Ok(map)
    }
}

/// Defines a typed result-set row.
pub trait RowDecoder: Sized {
    /// Define how to decode the row.
    fn try_decode_row(row: &mut super::rows::ResultRow) -> anyhow::Result<Self>;
}

impl<T> RowDecoder for T
where
    T: ColumnDecoder,
{
    fn try_decode_row(row: &mut super::rows::ResultRow) -> anyhow::Result<Self> {
        row.decode_column()
    }
}

macro_rules! row {
    ($($t:tt),*) => {
        impl<$($t: ColumnDecoder),*> RowDecoder for ($($t,)*) {
            fn try_decode_row(row: &mut super::rows::ResultRow) -> anyhow::Result<Self> {
                Ok((
                    $(
                        row.decode_column::<$t>()?,
                    )*
                ))
            }
        }
    };
}

// make a pretty staircase
row!(T1, T2);
row!(T1, T2, T3);
row!(T1, T2, T3, T4);
row!(T1, T2, T3, T4, T5);
row!(T1, T2, T3, T4, T5, T6);
row!(T1, T2, T3, T4, T5, T6, T7);
row!(T1, T2, T3, T4, T5, T6, T7, T8);
row!(T1, T2, T3, T4, T5, T6, T7, T8, T9);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_collection_decodes() {
        // [short] 2, then two [short bytes] framed ints
        let payload = [0x00, 0x02, 0x00, 0x04, 0, 0, 0, 1, 0x00, 0x04, 0, 0, 0, 2];
        let list: Vec<i32> = Vec::try_decode_column(&payload).unwrap();
        assert_eq!(list, vec![1, 2]);
    }

    #[test]
    fn option_column_treats_empty_as_none() {
        let value: Option<i64> = Option::try_decode_column(&[]).unwrap();
        assert!(value.is_none());
        let value: Option<i64> = Option::try_decode_column(&[0, 0, 0, 0, 0, 0, 0, 9]).unwrap();
        assert_eq!(value, Some(9));
    }
}
