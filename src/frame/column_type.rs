// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the column type descriptor and its `[option]` codec.

use super::{
    header::ProtocolVersion,
    read_short,
    read_string,
};

/// A column type descriptor as carried in result metadata. The collection
/// variants own their element types, so arbitrary nesting decodes without
/// back-pointers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// A server-defined type, identified by its fully qualified class name.
    Custom(String),
    /// ASCII character string.
    Ascii,
    /// 8-byte signed long.
    BigInt,
    /// Arbitrary bytes.
    Blob,
    /// Boolean.
    Boolean,
    /// Distributed counter, 8-byte signed.
    Counter,
    /// Arbitrary-precision decimal.
    Decimal,
    /// 8-byte IEEE-754 floating point.
    Double,
    /// 4-byte IEEE-754 floating point.
    Float,
    /// 4-byte signed int.
    Int,
    /// UTF-8 string. Exists on the v1 wire only; v2 aliases it to [`ColumnType::VarChar`].
    Text,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// 16-byte UUID.
    Uuid,
    /// UTF-8 string.
    VarChar,
    /// Arbitrary-precision two's-complement integer.
    VarInt,
    /// Version 1 time-based UUID.
    TimeUuid,
    /// IPv4 or IPv6 address.
    Inet,
    /// A list of elements.
    List(Box<ColumnType>),
    /// A map of key/value pairs.
    Map(Box<ColumnType>, Box<ColumnType>),
    /// A set of elements.
    Set(Box<ColumnType>),
}

impl ColumnType {
    /// Read an `[option]` type descriptor: a `[short]` id, followed by a
    /// `[string]` for `Custom` or one/two nested `[option]` for collections.
    pub fn from_payload(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> anyhow::Result<Self> {
        let id = read_short(start, payload)?;
        Ok(match id {
            0x0000 => ColumnType::Custom(read_string(start, payload)?),
            0x0001 => ColumnType::Ascii,
            0x0002 => ColumnType::BigInt,
            0x0003 => ColumnType::Blob,
            0x0004 => ColumnType::Boolean,
            0x0005 => ColumnType::Counter,
            0x0006 => ColumnType::Decimal,
            0x0007 => ColumnType::Double,
            0x0008 => ColumnType::Float,
            0x0009 => ColumnType::Int,
            // 0x0A was removed in v2; a server still sending it means varchar
            0x000A => match version {
                ProtocolVersion::V1 => ColumnType::Text,
                ProtocolVersion::V2 => ColumnType::VarChar,
            },
            0x000B => ColumnType::Timestamp,
            0x000C => ColumnType::Uuid,
            0x000D => ColumnType::VarChar,
            0x000E => ColumnType::VarInt,
            0x000F => ColumnType::TimeUuid,
            0x0010 => ColumnType::Inet,
            0x0020 => ColumnType::List(Box::new(Self::from_payload(start, payload, version)?)),
            0x0021 => ColumnType::Map(
                Box::new(Self::from_payload(start, payload, version)?),
                Box::new(Self::from_payload(start, payload, version)?),
            ),
            0x0022 => ColumnType::Set(Box::new(Self::from_payload(start, payload, version)?)),
            _ => anyhow::bail!("Unknown column type option: {:#06x}", id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_collection_option_parses() {
        // map<varchar, list<int>>
        let payload = [0x00, 0x21, 0x00, 0x0D, 0x00, 0x20, 0x00, 0x09];
        let mut start = 0;
        let kind = ColumnType::from_payload(&mut start, &payload, ProtocolVersion::V2).unwrap();
        assert_eq!(
            kind,
            ColumnType::Map(
                Box::new(ColumnType::VarChar),
                Box::new(ColumnType::List(Box::new(ColumnType::Int)))
            )
        );
        assert_eq!(start, payload.len());
    }

    #[test]
    fn custom_option_carries_a_class_name() {
        let mut payload = vec![0x00, 0x00];
        payload.extend([0x00, 0x03]);
        payload.extend(b"Foo");
        let mut start = 0;
        let kind = ColumnType::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap();
        assert_eq!(kind, ColumnType::Custom("Foo".to_owned()));
    }

    #[test]
    fn text_id_aliases_to_varchar_on_v2() {
        let payload = [0x00, 0x0A];
        let mut start = 0;
        assert_eq!(
            ColumnType::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap(),
            ColumnType::Text
        );
        start = 0;
        assert_eq!(
            ColumnType::from_payload(&mut start, &payload, ProtocolVersion::V2).unwrap(),
            ColumnType::VarChar
        );
    }
}
