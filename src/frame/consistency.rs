// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the consistency enum.

use super::header::ProtocolVersion;
use anyhow::anyhow;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::{
    convert::TryFrom,
    fmt::Display,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
/// The consistency level enum. `Serial` and `LocalSerial` exist on the v2 wire only.
pub enum Consistency {
    /// The any consistency level.
    Any = 0x0,
    /// The one consistency level.
    One = 0x1,
    /// The two consistency level.
    Two = 0x2,
    /// The three consistency level.
    Three = 0x3,
    /// The quorum consistency level.
    Quorum = 0x4,
    /// The all consistency level.
    All = 0x5,
    /// The local quorum consistency level.
    LocalQuorum = 0x6,
    /// The each quorum consistency level.
    EachQuorum = 0x7,
    /// The serial consistency level (v2).
    Serial = 0x8,
    /// The local serial consistency level (v2).
    LocalSerial = 0x9,
}

impl Consistency {
    /// Whether this level exists in the given protocol dialect.
    pub fn in_dialect(&self, version: ProtocolVersion) -> bool {
        match self {
            Self::Serial | Self::LocalSerial => version == ProtocolVersion::V2,
            _ => true,
        }
    }

    /// Whether this level is valid as a serial consistency.
    pub fn is_serial(&self) -> bool {
        matches!(self, Self::Serial | Self::LocalSerial)
    }
}

impl Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "ANY"),
            Self::One => write!(f, "ONE"),
            Self::Two => write!(f, "TWO"),
            Self::Three => write!(f, "THREE"),
            Self::Quorum => write!(f, "QUORUM"),
            Self::All => write!(f, "ALL"),
            Self::LocalQuorum => write!(f, "LOCAL_QUORUM"),
            Self::EachQuorum => write!(f, "EACH_QUORUM"),
            Self::Serial => write!(f, "SERIAL"),
            Self::LocalSerial => write!(f, "LOCAL_SERIAL"),
        }
    }
}

impl TryFrom<u16> for Consistency {
    type Error = anyhow::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Consistency::from_u16(value).ok_or_else(|| anyhow!("Unknown consistency: {:#06x}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_decodes_by_value() {
        assert_eq!(Consistency::try_from(0x4).unwrap(), Consistency::Quorum);
        assert!(Consistency::try_from(0xB).is_err());
    }

    #[test]
    fn serial_levels_are_v2_only() {
        assert!(!Consistency::Serial.in_dialect(ProtocolVersion::V1));
        assert!(Consistency::LocalSerial.in_dialect(ProtocolVersion::V2));
        assert!(Consistency::Quorum.in_dialect(ProtocolVersion::V1));
    }
}
