// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the connection state machine on top of a duplex
//! byte stream, plus the pooling seam sessions are shared through.

pub mod pool;
pub mod session;

pub use pool::SessionPool;
pub use session::*;
