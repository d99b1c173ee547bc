// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the ERROR frame decoder.

use super::*;
use anyhow::bail;
use std::{
    convert::TryFrom,
    fmt::Display,
};

#[derive(Error, Debug, Clone)]
/// A decoded ERROR frame: an `[int]` code, a `[string]` message and a
/// code-specific tail.
pub struct ErrorFrame {
    /// The error code.
    pub(crate) code: ErrorCode,
    /// The message string.
    pub(crate) message: String,
    /// The additional error information.
    pub(crate) additional: Option<Additional>,
}

impl Display for ErrorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(additional) = &self.additional {
            write!(f, "{} ({})", self.message, additional)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[allow(missing_docs)]
impl ErrorFrame {
    pub fn code(&self) -> ErrorCode {
        self.code
    }
    pub fn message(&self) -> &String {
        &self.message
    }
    pub fn additional(&self) -> &Option<Additional> {
        &self.additional
    }
    pub fn is_server_error(&self) -> bool {
        self.code == ErrorCode::ServerError
    }
    pub fn is_protocol_error(&self) -> bool {
        self.code == ErrorCode::ProtocolError
    }
    pub fn is_bad_credentials(&self) -> bool {
        self.code == ErrorCode::BadCredentials
    }
    pub fn is_unavailable(&self) -> bool {
        self.code == ErrorCode::Unavailable
    }
    pub fn is_overloaded(&self) -> bool {
        self.code == ErrorCode::Overloaded
    }
    pub fn is_bootstrapping(&self) -> bool {
        self.code == ErrorCode::IsBootstrapping
    }
    pub fn is_truncate_error(&self) -> bool {
        self.code == ErrorCode::TruncateError
    }
    pub fn is_write_timeout(&self) -> bool {
        self.code == ErrorCode::WriteTimeout
    }
    pub fn is_read_timeout(&self) -> bool {
        self.code == ErrorCode::ReadTimeout
    }
    pub fn is_syntax_error(&self) -> bool {
        self.code == ErrorCode::SyntaxError
    }
    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized
    }
    pub fn is_invalid(&self) -> bool {
        self.code == ErrorCode::Invalid
    }
    pub fn is_config_error(&self) -> bool {
        self.code == ErrorCode::ConfigError
    }
    pub fn is_already_exists(&self) -> bool {
        self.code == ErrorCode::AlreadyExists
    }
    pub fn is_unprepared(&self) -> bool {
        self.code == ErrorCode::Unprepared
    }
    /// Get the stale statement id when this is an `Unprepared` error. The
    /// caller is expected to re-run PREPARE with it.
    pub fn unprepared_id(&self) -> Option<&[u8]> {
        if let Some(Additional::Unprepared(u)) = &self.additional {
            Some(&u.id)
        } else {
            None
        }
    }
}

impl FromPayload for ErrorFrame {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        let code = ErrorCode::try_from(read_int(start, payload)?)?;
        let message = read_string(start, payload)?;
        let additional = match code {
            ErrorCode::Unavailable => Some(Additional::Unavailable(Unavailable::from_payload(start, payload)?)),
            ErrorCode::WriteTimeout => Some(Additional::WriteTimeout(WriteTimeout::from_payload(start, payload)?)),
            ErrorCode::ReadTimeout => Some(Additional::ReadTimeout(ReadTimeout::from_payload(start, payload)?)),
            ErrorCode::AlreadyExists => Some(Additional::AlreadyExists(AlreadyExists::from_payload(start, payload)?)),
            ErrorCode::Unprepared => Some(Additional::Unprepared(Unprepared::from_payload(start, payload)?)),
            _ => None,
        };
        Ok(ErrorFrame {
            code,
            message,
            additional,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
/// The error code enum.
pub enum ErrorCode {
    /// Something unexpected happened server side.
    ServerError = 0x0000,
    /// A protocol violation noticed by the server.
    ProtocolError = 0x000A,
    /// Authentication was required and failed.
    BadCredentials = 0x0100,
    /// Not enough replicas were alive to achieve the consistency level.
    Unavailable = 0x1000,
    /// The request cannot be processed because the coordinator is overloaded.
    Overloaded = 0x1001,
    /// The coordinator was bootstrapping when it received the request.
    IsBootstrapping = 0x1002,
    /// A truncation error.
    TruncateError = 0x1003,
    /// Timeout during a write request.
    WriteTimeout = 0x1100,
    /// Timeout during a read request.
    ReadTimeout = 0x1200,
    /// The submitted query has a syntax error.
    SyntaxError = 0x2000,
    /// The logged user doesn't have the right to perform the query.
    Unauthorized = 0x2100,
    /// The query is syntactically correct but invalid.
    Invalid = 0x2200,
    /// The query is invalid because of a configuration issue.
    ConfigError = 0x2300,
    /// The query attempted to create something that already exists.
    AlreadyExists = 0x2400,
    /// The prepared statement id is not known to this node.
    Unprepared = 0x2500,
}

impl TryFrom<i32> for ErrorCode {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0000 => ErrorCode::ServerError,
            0x000A => ErrorCode::ProtocolError,
            0x0100 => ErrorCode::BadCredentials,
            0x1000 => ErrorCode::Unavailable,
            0x1001 => ErrorCode::Overloaded,
            0x1002 => ErrorCode::IsBootstrapping,
            0x1003 => ErrorCode::TruncateError,
            0x1100 => ErrorCode::WriteTimeout,
            0x1200 => ErrorCode::ReadTimeout,
            0x2000 => ErrorCode::SyntaxError,
            0x2100 => ErrorCode::Unauthorized,
            0x2200 => ErrorCode::Invalid,
            0x2300 => ErrorCode::ConfigError,
            0x2400 => ErrorCode::AlreadyExists,
            0x2500 => ErrorCode::Unprepared,
            _ => anyhow::bail!("Unknown error code: {:#06x}", value),
        })
    }
}

#[derive(Clone, Error, Debug)]
#[error(transparent)]
/// The additional error information enum.
pub enum Additional {
    /// The additional error information is `Unavailable`.
    Unavailable(Unavailable),
    /// The additional error information is `WriteTimeout`.
    WriteTimeout(WriteTimeout),
    /// The additional error information is `ReadTimeout`.
    ReadTimeout(ReadTimeout),
    /// The additional error information is `AlreadyExists`.
    AlreadyExists(AlreadyExists),
    /// The additional error information is `Unprepared`.
    Unprepared(Unprepared),
}

#[derive(Clone, Error, Debug)]
#[error("Unavailable: consistency level: {cl}, required: {required}, alive: {alive}")]
/// The unavailable exception structure.
pub struct Unavailable {
    /// The consistency level of the failed query.
    pub cl: Consistency,
    /// The number of nodes that should be alive to respect the consistency level.
    pub required: i32,
    /// The number of replicas that were known to be alive when the request was processed.
    pub alive: i32,
}

impl FromPayload for Unavailable {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            cl: Consistency::try_from(read_short(start, payload)?)?,
            required: read_int(start, payload)?,
            alive: read_int(start, payload)?,
        })
    }
}

#[derive(Clone, Error, Debug)]
#[error(
    "WriteTimeout: consistency level: {cl}, received: {received}, block for: {block_for}, write type: {write_type}"
)]
/// The additional error information, `WriteTimeout`, structure.
pub struct WriteTimeout {
    /// The consistency level of the query having triggered the exception.
    pub cl: Consistency,
    /// Representing the number of nodes having acknowledged the request.
    pub received: i32,
    /// Representing the number of replicas whose acknowledgement is required to achieve `cl`.
    pub block_for: i32,
    /// That describes the type of the write that timed out.
    pub write_type: WriteType,
}

impl FromPayload for WriteTimeout {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            cl: Consistency::try_from(read_short(start, payload)?)?,
            received: read_int(start, payload)?,
            block_for: read_int(start, payload)?,
            write_type: WriteType::from_payload(start, payload)?,
        })
    }
}

#[derive(Clone, Error, Debug)]
#[error(
    "ReadTimeout: consistency level: {cl}, received: {received}, block for: {block_for}, data present: {data_present}"
)]
/// The additional error information, `ReadTimeout`, structure.
pub struct ReadTimeout {
    /// The consistency level of the query having triggered the exception.
    pub cl: Consistency,
    /// Representing the number of nodes having answered the request.
    pub received: i32,
    /// Representing the number of replicas whose response is required to achieve `cl`.
    pub block_for: i32,
    /// If its value is 0, it means the replica that was asked for data has not responded.
    pub data_present: u8,
}

impl ReadTimeout {
    /// Check whether the replica that was asked for data had not responded.
    pub fn replica_had_not_responded(&self) -> bool {
        self.data_present == 0
    }
}

impl FromPayload for ReadTimeout {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            cl: Consistency::try_from(read_short(start, payload)?)?,
            received: read_int(start, payload)?,
            block_for: read_int(start, payload)?,
            data_present: read_byte(start, payload)?,
        })
    }
}

#[derive(Clone, Error, Debug)]
#[error("AlreadyExists: keyspace: {keyspace}, table: {table}")]
/// The additional error information, `AlreadyExists`, structure.
pub struct AlreadyExists {
    /// Either the keyspace that already exists, or the keyspace of the table that does.
    pub keyspace: String,
    /// The name of the table that already exists; the empty string when the
    /// query attempted to create a keyspace.
    pub table: String,
}

impl FromPayload for AlreadyExists {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            keyspace: read_string(start, payload)?,
            table: read_string(start, payload)?,
        })
    }
}

#[derive(Clone, Error, Debug)]
#[error("Unprepared: id: {id:?}")]
/// The additional error information, `Unprepared`, structure.
pub struct Unprepared {
    /// The unknown prepared statement id.
    pub id: Vec<u8>,
}

impl FromPayload for Unprepared {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            id: read_short_bytes(start, payload)?.to_vec(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The type of the write that timed out.
pub enum WriteType {
    /// Simple write type.
    Simple,
    /// Batch write type.
    Batch,
    /// UnloggedBatch write type.
    UnloggedBatch,
    /// Counter write type.
    Counter,
    /// BatchLog write type.
    BatchLog,
}

impl Display for WriteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteType::Simple => write!(f, "SIMPLE"),
            WriteType::Batch => write!(f, "BATCH"),
            WriteType::UnloggedBatch => write!(f, "UNLOGGED_BATCH"),
            WriteType::Counter => write!(f, "COUNTER"),
            WriteType::BatchLog => write!(f, "BATCH_LOG"),
        }
    }
}

impl FromPayload for WriteType {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(match read_str(start, payload)? {
            "SIMPLE" => WriteType::Simple,
            "BATCH" => WriteType::Batch,
            "UNLOGGED_BATCH" => WriteType::UnloggedBatch,
            "COUNTER" => WriteType::Counter,
            "BATCH_LOG" => WriteType::BatchLog,
            _ => bail!("unexpected write_type error"),
        })
    }
}
