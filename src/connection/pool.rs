// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the pooling seam. The codec itself is
//! single-session; the pool is the only place sessions are shared, and a
//! session taken from it is exclusively owned by its borrower, including
//! any row set derived from it, until released.

use super::session::Session;
use crate::frame::requests::auth_response::Authenticator;

/// The acquire/release contract a connection pool implements over sessions.
///
/// The `used_keyspace` cache of a released session is left as-is, never
/// rolled back: a borrower reconciles it by calling
/// [`Session::use_keyspace`] with the keyspace it needs, which sends `USE`
/// only on a mismatch.
pub trait SessionPool<S, A: Authenticator> {
    /// Take an exclusive session, or `None` when the pool is drained.
    fn try_acquire(&mut self) -> Option<Session<S, A>>;

    /// Return a session to the pool. Sessions that failed with a
    /// wire-format error are `Closed` and should be discarded instead.
    fn release(&mut self, session: Session<S, A>);
}
