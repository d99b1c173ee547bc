// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This crate implements a client for versions 1 and 2 of the frame-based
//! CQL binary protocol: the framing layer, the request/response opcode
//! dispatch, the typed value codec for every native column type, the
//! prepared-statement handle lifecycle, and the session state machine that
//! gates it all behind the startup handshake.
//!
//! The query facade, connection pooling and credential sourcing are seams,
//! not residents: see [`connection::SessionPool`] and
//! [`frame::requests::auth_response::Authenticator`].

#![warn(missing_docs)]

pub mod compression;
pub mod connection;
pub mod frame;

pub use compression::{
    Compression,
    CompressionError,
    CompressionKind,
    Lz4,
    Snappy,
    Uncompressed,
};
pub use connection::*;
/// This is the public API of this crate
pub use frame::*;
