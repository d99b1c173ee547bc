// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the READY frame.

/// Indicates that the server is ready to process queries. The body is empty.
/// Sent in answer to a STARTUP, a v1 CREDENTIALS, or a REGISTER frame.
#[derive(Copy, Clone, Debug)]
pub struct ReadyFrame;
