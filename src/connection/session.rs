// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the session state machine: startup handshake,
//! optional authentication round, keyspace cache, request dispatch and
//! graceful close. A session drives a single duplex byte stream in strict
//! half-duplex request/response order; the stream id field is carried in
//! every frame so pipelining can be added without a protocol change.

use crate::{
    compression::CompressionKind,
    frame::{
        header::{
            Flags,
            ProtocolVersion,
            COMPRESSION,
            EVENT_STREAM_ID,
            HEADER_LEN,
            MAX_BODY_LEN,
        },
        requests::{
            auth_response::{
                AllowAllAuth,
                Authenticator,
                AuthResponseFrameBuilder,
            },
            credentials::CredentialsFrame,
            execute::ExecuteFrameBuilder,
            options::OptionsFrame,
            prepare::PrepareFrame,
            query::{
                QueryFrame,
                QueryFrameBuilder,
            },
            register::{
                RegisterEventType,
                RegisterFrameBuilder,
            },
            startup::StartupFrame,
            RequestBody,
            RequestFrame,
        },
        responses::{
            error::ErrorFrame,
            event::EventFrame,
            result::{
                Metadata,
                PreparedResult,
                ResultBodyKind,
                SchemaChange,
            },
            supported::SupportedFrame,
            ResponseBody,
            ResponseFrame,
        },
        rows::{
            Row,
            RowCursor,
            RowsError,
        },
        value::CqlValue,
        Consistency,
        FrameError,
    },
};
use std::{
    convert::TryInto,
    net::SocketAddr,
    ops::{
        Deref,
        DerefMut,
    },
};
use thiserror::Error;
use tokio::{
    io::{
        AsyncRead,
        AsyncReadExt,
        AsyncWrite,
        AsyncWriteExt,
    },
    net::TcpStream,
};
use uuid::Uuid;

/// The default CQL wire port.
pub const DEFAULT_PORT: u16 = 9042;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SessionError {
    /// A protocol-level violation. These are fatal: the session transitions
    /// to `Closed`.
    #[error("Wire format violation: {0}")]
    WireFormat(anyhow::Error),
    /// An ERROR frame returned by the server. See [`ErrorFrame::code`].
    #[error(transparent)]
    Server(ErrorFrame),
    /// A request rejected before any bytes were sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The session is closed and rejects all requests.
    #[error("The session is closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Compression(#[from] crate::compression::CompressionError),
}

impl From<FrameError> for SessionError {
    fn from(e: FrameError) -> Self {
        SessionError::WireFormat(anyhow::Error::new(e))
    }
}

/// The lifecycle states of a session. `Closed` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no STARTUP sent yet. Only STARTUP and OPTIONS may leave.
    Fresh,
    /// STARTUP sent, waiting for READY or AUTHENTICATE.
    Negotiating,
    /// The server demanded credentials; the auth round is in flight.
    Authenticating,
    /// Any request is valid.
    Ready,
    /// Terminal; all requests are rejected.
    Closed,
}

/// A prepared statement handle: the opaque id returned by PREPARE, the bind
/// metadata, the result metadata (v2), and a default consistency level.
///
/// The handle is value-copyable and independent of any particular session,
/// but the id is scoped to the node that prepared it; a node that does not
/// know it answers EXECUTE with an `Unprepared` error and the caller must
/// re-prepare.
#[derive(Clone, Debug)]
pub struct PreparedStatement {
    id: Vec<u8>,
    bind_metadata: Metadata,
    result_metadata: Option<Metadata>,
    consistency: Consistency,
}

impl PreparedStatement {
    fn from_result(result: PreparedResult, consistency: Consistency) -> Self {
        let PreparedResult {
            id,
            bind_metadata,
            result_metadata,
        } = result;
        Self {
            id,
            bind_metadata,
            result_metadata,
            consistency,
        }
    }

    /// Get the opaque statement id.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Get the metadata describing the bind variables.
    pub fn bind_metadata(&self) -> &Metadata {
        &self.bind_metadata
    }

    /// Get the metadata describing the result columns (v2).
    pub fn result_metadata(&self) -> &Option<Metadata> {
        &self.result_metadata
    }

    /// Get the statement's default consistency level.
    pub fn consistency(&self) -> Consistency {
        self.consistency
    }
}

/// The outcome of a `QUERY` or `EXECUTE` round trip.
#[derive(Debug)]
pub enum QueryResult<'a, S, A: Authenticator> {
    /// The query produced no result.
    Void,
    /// The query produced rows; the session stays reserved until the row
    /// set is dropped or exhausted.
    Rows(RowSet<'a, S, A>),
    /// A `USE` query switched the keyspace.
    SetKeyspace(String),
    /// A DDL query altered the schema.
    SchemaChange(SchemaChange),
}

/// A stream of rows holding the session lease. While any row remains
/// undrained the borrow reserves the session, so no other request can be
/// issued on it; dropping or exhausting the row set releases it. The row
/// region was read off the wire in full when the frame arrived, so dropping
/// early leaves no residue on the stream.
#[derive(Debug)]
pub struct RowSet<'a, S, A: Authenticator> {
    cursor: RowCursor,
    _session: &'a mut Session<S, A>,
}

impl<'a, S, A: Authenticator> Deref for RowSet<'a, S, A> {
    type Target = RowCursor;

    fn deref(&self) -> &Self::Target {
        &self.cursor
    }
}

impl<'a, S, A: Authenticator> DerefMut for RowSet<'a, S, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}

impl<'a, S, A: Authenticator> RowSet<'a, S, A> {
    /// Decode the next row, raising [`RowsError::Exhausted`] past the last.
    pub fn try_next(&mut self) -> Result<Row, RowsError> {
        self.cursor.try_next()
    }
}

impl<'a, S, A: Authenticator> Iterator for RowSet<'a, S, A> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next()
    }
}

/// A single CQL session over a duplex byte stream. Exclusive to one task at
/// a time: concurrent use is prevented by the pool the sessions live in.
#[derive(Debug)]
pub struct Session<S, A: Authenticator = AllowAllAuth> {
    stream: S,
    version: ProtocolVersion,
    state: SessionState,
    used_keyspace: Option<String>,
    compression: Option<CompressionKind>,
    tracing: bool,
    stream_id: i8,
    authenticator: A,
    last_tracing_id: Option<Uuid>,
}

impl<S, A: Authenticator> Session<S, A> {
    /// Wrap an already-connected byte stream. The session starts `Fresh`;
    /// the startup handshake runs before the first request needing it.
    pub fn with_stream(stream: S, version: ProtocolVersion) -> Self {
        Self {
            stream,
            version,
            state: SessionState::Fresh,
            used_keyspace: None,
            compression: None,
            tracing: false,
            stream_id: 0,
            authenticator: A::default(),
            last_tracing_id: None,
        }
    }

    /// Select a body compression algorithm to negotiate at startup.
    pub fn compression(mut self, kind: CompressionKind) -> Self {
        self.compression.replace(kind);
        self
    }

    /// Request server-side tracing on every request.
    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    /// Attach the authenticator answering a server AUTHENTICATE demand.
    pub fn authenticator(mut self, authenticator: A) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Get the session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check whether the session completed its startup handshake.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Get the negotiated protocol dialect.
    pub fn protocol(&self) -> ProtocolVersion {
        self.version
    }

    /// Get the keyspace cache maintained by [`Session::use_keyspace`].
    pub fn used_keyspace(&self) -> Option<&str> {
        self.used_keyspace.as_deref()
    }

    /// Get the tracing id of the last traced response.
    pub fn last_tracing_id(&self) -> Option<Uuid> {
        self.last_tracing_id
    }

    /// Set the stream id stamped on outgoing frames. Negative ids are
    /// reserved for server events and are rejected.
    pub fn set_stream_id(&mut self, stream_id: i8) -> Result<(), SessionError> {
        if stream_id < 0 {
            return Err(SessionError::InvalidArgument(format!(
                "Stream id {} is reserved for server events",
                stream_id
            )));
        }
        self.stream_id = stream_id;
        Ok(())
    }

    fn fail_wire<T>(&mut self, err: anyhow::Error) -> Result<T, SessionError> {
        self.state = SessionState::Closed;
        Err(SessionError::WireFormat(err))
    }
}

impl<A: Authenticator> Session<TcpStream, A> {
    /// Connect a TCP session and run the startup handshake.
    pub async fn connect(builder: SessionBuilder<A>) -> Result<Self, SessionError> {
        builder.build().await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin, A: Authenticator> Session<S, A> {
    /// Run the startup handshake: `STARTUP`, then `READY`, or an
    /// authentication round when the server demands one. A no-op when the
    /// session is already `Ready`.
    pub async fn startup(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Fresh => (),
            SessionState::Ready => return Ok(()),
            SessionState::Closed => return Err(SessionError::Closed),
            state => {
                return Err(SessionError::InvalidArgument(format!(
                    "Cannot run startup from the {:?} state",
                    state
                )))
            }
        }
        if let Some(kind) = self.compression {
            if !kind.in_dialect(self.version) {
                return Err(SessionError::InvalidArgument(format!(
                    "{} compression is not available in protocol v{}",
                    kind.as_str(),
                    self.version as u8
                )));
            }
        }
        self.state = SessionState::Negotiating;
        let startup = StartupFrame::new(self.compression.map(|kind| kind.as_str()));
        // the STARTUP frame itself is never compressed
        self.send_frame(startup.into(), None).await?;
        let response = self.read_response().await?;
        match response.into_body() {
            ResponseBody::Ready(_) => {
                log::debug!("Session ready, protocol v{}", self.version as u8);
                self.state = SessionState::Ready;
                Ok(())
            }
            ResponseBody::Authenticate(frame) => {
                self.state = SessionState::Authenticating;
                log::debug!("Server demands authentication via {}", frame.authenticator());
                self.authenticate().await
            }
            ResponseBody::Error(e) => {
                self.state = SessionState::Closed;
                Err(SessionError::Server(e))
            }
            body => self.fail_wire(anyhow::anyhow!("Unexpected startup response: {:?}", body.opcode())),
        }
    }

    // v1 answers AUTHENTICATE with CREDENTIALS and expects READY; v2 runs
    // the SASL loop of AUTH_RESPONSE / AUTH_CHALLENGE until AUTH_SUCCESS.
    async fn authenticate(&mut self) -> Result<(), SessionError> {
        match self.version {
            ProtocolVersion::V1 => {
                let credentials = CredentialsFrame::new(self.authenticator.credentials());
                self.send_frame(credentials.into(), self.compression).await?;
                let response = self.read_response().await?;
                match response.into_body() {
                    ResponseBody::Ready(_) => {
                        self.state = SessionState::Ready;
                        Ok(())
                    }
                    ResponseBody::Error(e) => {
                        self.state = SessionState::Closed;
                        Err(SessionError::Server(e))
                    }
                    body => self.fail_wire(anyhow::anyhow!("Unexpected credentials response: {:?}", body.opcode())),
                }
            }
            ProtocolVersion::V2 => {
                loop {
                    let auth_response = AuthResponseFrameBuilder::default()
                        .auth_token(&self.authenticator)
                        .build()
                        .map_err(|e| SessionError::InvalidArgument(e.to_string()))?;
                    self.send_frame(auth_response.into(), self.compression).await?;
                    let response = self.read_response().await?;
                    match response.into_body() {
                        ResponseBody::AuthSuccess(_) => {
                            self.state = SessionState::Ready;
                            return Ok(());
                        }
                        ResponseBody::AuthChallenge(_) => continue,
                        ResponseBody::Error(e) => {
                            self.state = SessionState::Closed;
                            return Err(SessionError::Server(e));
                        }
                        body => {
                            return self
                                .fail_wire(anyhow::anyhow!("Unexpected auth response: {:?}", body.opcode()))
                        }
                    }
                }
            }
        }
    }

    /// Run a `QUERY` with the given consistency level.
    pub async fn query(
        &mut self,
        statement: impl Into<String>,
        consistency: Consistency,
    ) -> Result<QueryResult<'_, S, A>, SessionError> {
        let frame = QueryFrameBuilder::default()
            .statement(statement.into())
            .consistency(consistency)
            .build()
            .map_err(|e| SessionError::InvalidArgument(e.to_string()))?;
        self.query_with(frame).await
    }

    /// Run a fully specified `QUERY` frame, for bound values, paging, or a
    /// serial consistency (v2).
    pub async fn query_with(&mut self, frame: QueryFrame) -> Result<QueryResult<'_, S, A>, SessionError> {
        self.ensure_ready().await?;
        self.send_frame(frame.into(), self.compression).await?;
        let response = self.read_response().await?;
        self.expect_result(response)
    }

    /// Run a `PREPARE`; the returned handle is bound to this node.
    pub async fn prepare(&mut self, statement: impl Into<String>) -> Result<PreparedStatement, SessionError> {
        self.ensure_ready().await?;
        self.send_frame(PrepareFrame::new(statement.into()).into(), self.compression)
            .await?;
        let response = self.read_response().await?;
        match response.into_body() {
            ResponseBody::Result(result) => match result.into_kind() {
                ResultBodyKind::Prepared(prepared) => Ok(PreparedStatement::from_result(prepared, Consistency::One)),
                kind => self.fail_wire(anyhow::anyhow!("Unexpected result kind for PREPARE: {:?}", kind)),
            },
            ResponseBody::Error(e) => Err(SessionError::Server(e)),
            body => self.fail_wire(anyhow::anyhow!("Unexpected response opcode: {:?}", body.opcode())),
        }
    }

    /// Run an `EXECUTE` of a prepared statement with positional arguments.
    /// The argument count must match the statement's bind metadata; a
    /// mismatch fails before any bytes are sent.
    pub async fn execute(
        &mut self,
        prepared: &PreparedStatement,
        values: Vec<CqlValue>,
        consistency: Consistency,
    ) -> Result<QueryResult<'_, S, A>, SessionError> {
        let expected = prepared.bind_metadata().columns_count() as usize;
        if values.len() != expected {
            return Err(SessionError::InvalidArgument(format!(
                "Statement takes {} values, {} bound",
                expected,
                values.len()
            )));
        }
        self.ensure_ready().await?;
        let frame = ExecuteFrameBuilder::default()
            .id(prepared.id().to_vec())
            .consistency(consistency)
            .values(values)
            .build()
            .map_err(|e| SessionError::InvalidArgument(e.to_string()))?;
        self.send_frame(frame.into(), self.compression).await?;
        let response = self.read_response().await?;
        self.expect_result(response)
    }

    /// Ask the server which STARTUP options it supports. Valid before the
    /// handshake: OPTIONS and STARTUP are the only requests a `Fresh`
    /// session may send.
    pub async fn options(&mut self) -> Result<SupportedFrame, SessionError> {
        match self.state {
            SessionState::Fresh | SessionState::Ready => (),
            SessionState::Closed => return Err(SessionError::Closed),
            state => {
                return Err(SessionError::InvalidArgument(format!(
                    "Cannot send OPTIONS from the {:?} state",
                    state
                )))
            }
        }
        self.send_frame(OptionsFrame.into(), None).await?;
        let response = self.read_response().await?;
        match response.into_body() {
            ResponseBody::Supported(supported) => Ok(supported),
            ResponseBody::Error(e) => Err(SessionError::Server(e)),
            body => self.fail_wire(anyhow::anyhow!("Unexpected response opcode: {:?}", body.opcode())),
        }
    }

    /// Register for server-pushed events. The server acknowledges with
    /// READY; events then arrive on stream id -1 and are consumed with
    /// [`Session::read_event`]. Dedicate a session to events rather than
    /// mixing them into a query session.
    pub async fn register(&mut self, events: &[RegisterEventType]) -> Result<(), SessionError> {
        if events.is_empty() {
            return Err(SessionError::InvalidArgument("No event types to register".to_owned()));
        }
        self.ensure_ready().await?;
        let mut builder = RegisterFrameBuilder::default();
        for event in events {
            builder = builder.with_event_type(*event);
        }
        let frame = builder.build().map_err(|e| SessionError::InvalidArgument(e.to_string()))?;
        self.send_frame(frame.into(), self.compression).await?;
        let response = self.read_response().await?;
        match response.into_body() {
            ResponseBody::Ready(_) => Ok(()),
            ResponseBody::Error(e) => Err(SessionError::Server(e)),
            body => self.fail_wire(anyhow::anyhow!("Unexpected response opcode: {:?}", body.opcode())),
        }
    }

    /// Block until the server pushes the next registered event. Only EVENT
    /// frames on the reserved stream id -1 are accepted here; anything else
    /// is a protocol violation.
    pub async fn read_event(&mut self) -> Result<EventFrame, SessionError> {
        self.ensure_ready().await?;
        let response = self.read_response().await?;
        if response.header().stream() != EVENT_STREAM_ID {
            let stream = response.header().stream();
            return self.fail_wire(anyhow::anyhow!("Event frame on non-reserved stream id {}", stream));
        }
        match response.into_body() {
            ResponseBody::Event(event) => Ok(event),
            body => self.fail_wire(anyhow::anyhow!("Unexpected response opcode: {:?}", body.opcode())),
        }
    }

    /// Switch the session keyspace, issuing `USE` only when the cached
    /// keyspace differs. The name is validated before any bytes are sent.
    pub async fn use_keyspace(&mut self, keyspace: &str) -> Result<(), SessionError> {
        if !valid_identifier(keyspace) {
            return Err(SessionError::InvalidArgument(format!(
                "Invalid keyspace name: {:?}",
                keyspace
            )));
        }
        if self.used_keyspace.as_deref() == Some(keyspace) {
            return Ok(());
        }
        let name = match self.query(format!("USE {}", keyspace), Consistency::Any).await? {
            QueryResult::SetKeyspace(name) => Some(name),
            _ => None,
        };
        match name {
            Some(name) => {
                self.used_keyspace.replace(name);
                Ok(())
            }
            None => self.fail_wire(anyhow::anyhow!("USE did not produce a SetKeyspace result")),
        }
    }

    /// Close the session: terminal, and safe to call exactly once since it
    /// consumes the session. Any frame in flight was already drained in
    /// full when its response was read, so only the transport is torn down.
    pub async fn close(mut self) -> Result<(), SessionError> {
        self.state = SessionState::Closed;
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn ensure_ready(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Fresh => self.startup().await,
            SessionState::Closed => Err(SessionError::Closed),
            state => Err(SessionError::InvalidArgument(format!(
                "Session is {:?}, not ready",
                state
            ))),
        }
    }

    fn expect_result(&mut self, response: ResponseFrame) -> Result<QueryResult<'_, S, A>, SessionError> {
        match response.into_body() {
            ResponseBody::Result(result) => match result.into_kind() {
                ResultBodyKind::Void => Ok(QueryResult::Void),
                ResultBodyKind::Rows(rows) => Ok(QueryResult::Rows(RowSet {
                    cursor: RowCursor::new(rows),
                    _session: self,
                })),
                ResultBodyKind::SetKeyspace(keyspace) => Ok(QueryResult::SetKeyspace(keyspace)),
                ResultBodyKind::SchemaChange(change) => Ok(QueryResult::SchemaChange(change)),
                kind => self.fail_wire(anyhow::anyhow!("Unexpected result kind: {:?}", kind)),
            },
            ResponseBody::Error(e) => Err(SessionError::Server(e)),
            body => self.fail_wire(anyhow::anyhow!("Unexpected response opcode: {:?}", body.opcode())),
        }
    }

    async fn send_frame(
        &mut self,
        body: RequestBody,
        compression: Option<CompressionKind>,
    ) -> Result<(), SessionError> {
        let mut flags = Flags::default();
        flags.set_tracing(self.tracing);
        let frame = RequestFrame::new(self.version, flags, self.stream_id, body);
        let mut payload = frame
            .build_payload()
            .map_err(|e| SessionError::InvalidArgument(e.to_string()))?;
        if let Some(kind) = compression {
            payload = kind.compress(payload)?;
        }
        if let Err(e) = self.stream.write_all(&payload).await {
            self.state = SessionState::Closed;
            return Err(e.into());
        }
        if let Err(e) = self.stream.flush().await {
            self.state = SessionState::Closed;
            return Err(e.into());
        }
        Ok(())
    }

    // Read exactly one frame: the 8-byte header, then the declared body.
    // A stream that ends inside either is a wire-format violation.
    async fn read_response(&mut self) -> Result<ResponseFrame, SessionError> {
        let mut buffer = vec![0u8; HEADER_LEN];
        self.read_exact(&mut buffer).await?;
        let body_len = u32::from_be_bytes(
            buffer[4..8]
                .try_into()
                .map_err(|e: std::array::TryFromSliceError| SessionError::WireFormat(e.into()))?,
        );
        if body_len > MAX_BODY_LEN {
            return self.fail_wire(anyhow::anyhow!("Frame body too large: {}", body_len));
        }
        let mut body = vec![0u8; body_len as usize];
        self.read_exact(&mut body).await?;
        buffer.extend(body);
        if buffer[1] & COMPRESSION != 0 {
            match self.compression {
                Some(kind) => buffer = kind.decompress(buffer)?,
                None => {
                    return self.fail_wire(anyhow::anyhow!("Compressed frame on a session without compression"))
                }
            }
        }
        let (frame, consumed) = match ResponseFrame::decode(&buffer, self.version) {
            Ok(res) => res,
            Err(e) => return self.fail_wire(anyhow::Error::new(e)),
        };
        if consumed < buffer.len() {
            // extensibility: a body longer than its opcode schema is fine
            log::debug!("Discarding {} trailing body bytes", buffer.len() - consumed);
        }
        if let Some(tracing_id) = frame.tracing_id() {
            self.last_tracing_id.replace(tracing_id);
        }
        Ok(frame)
    }

    async fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), SessionError> {
        if let Err(e) = self.stream.read_exact(buffer).await {
            self.state = SessionState::Closed;
            return if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Err(SessionError::WireFormat(anyhow::anyhow!(
                    "Stream closed before the frame was complete"
                )))
            } else {
                Err(e.into())
            };
        }
        Ok(())
    }
}

/// Builds a TCP session: address, dialect, compression, tracing and
/// authentication, then connect + startup.
pub struct SessionBuilder<A: Authenticator = AllowAllAuth> {
    address: Option<SocketAddr>,
    version: ProtocolVersion,
    compression: Option<CompressionKind>,
    tracing: bool,
    authenticator: A,
}

impl<A: Authenticator> Default for SessionBuilder<A> {
    fn default() -> Self {
        Self {
            address: None,
            version: ProtocolVersion::V2,
            compression: None,
            tracing: false,
            authenticator: A::default(),
        }
    }
}

impl<A: Authenticator> SessionBuilder<A> {
    /// Create a builder with the v2 dialect preselected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node address.
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address.replace(address);
        self
    }

    /// Select the protocol dialect.
    pub fn protocol(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Select a body compression algorithm.
    pub fn compression(mut self, kind: CompressionKind) -> Self {
        self.compression.replace(kind);
        self
    }

    /// Request server-side tracing on every request.
    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    /// Attach an authenticator.
    pub fn authenticator<B: Authenticator>(self, authenticator: B) -> SessionBuilder<B> {
        SessionBuilder {
            address: self.address,
            version: self.version,
            compression: self.compression,
            tracing: self.tracing,
            authenticator,
        }
    }

    /// Connect and run the startup handshake.
    pub async fn build(self) -> Result<Session<TcpStream, A>, SessionError> {
        let address = self
            .address
            .ok_or_else(|| SessionError::InvalidArgument("Node address is required".to_owned()))?;
        let stream = TcpStream::connect(address).await?;
        log::debug!("Connected to {}", address);
        let mut session = Session::with_stream(stream, self.version)
            .tracing(self.tracing)
            .authenticator(self.authenticator);
        if let Some(kind) = self.compression {
            session = session.compression(kind);
        }
        session.startup().await?;
        Ok(session)
    }
}

// Keyspace and identifier names are restricted before anything is sent.
pub(crate) fn valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(valid_identifier("ks_1"));
        assert!(valid_identifier("Keyspace"));
        assert!(!valid_identifier(""));
        assert!(!valid_identifier("ks 1"));
        assert!(!valid_identifier("ks;DROP"));
        assert!(!valid_identifier("ks-1"));
    }

    #[test]
    fn negative_stream_ids_are_reserved() {
        let mut session: Session<tokio::io::DuplexStream> =
            Session::with_stream(tokio::io::duplex(64).0, ProtocolVersion::V2);
        assert!(session.set_stream_id(-1).is_err());
        assert!(session.set_stream_id(3).is_ok());
    }
}
