// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the response frames of protocol versions 1 and 2.

pub mod auth_challenge;
pub mod auth_success;
pub mod authenticate;
pub mod error;
pub mod event;
pub mod ready;
pub mod result;
pub mod supported;

use super::*;
use derive_more::{
    From,
    TryInto,
};
use header::{
    Header,
    ProtocolVersion,
    HEADER_LEN,
};
use thiserror::Error;
use uuid::Uuid;

/// Possible response frame bodies.
#[derive(Clone, Debug, From, TryInto)]
#[allow(missing_docs)]
pub enum ResponseBody {
    Error(ErrorFrame),
    Ready(ReadyFrame),
    Authenticate(AuthenticateFrame),
    Supported(SupportedFrame),
    Result(ResultFrame),
    Event(EventFrame),
    AuthChallenge(AuthChallengeFrame),
    AuthSuccess(AuthSuccessFrame),
}

impl ResponseBody {
    /// Get the frame type's opcode.
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Error(_) => OpCode::Error,
            Self::Ready(_) => OpCode::Ready,
            Self::Authenticate(_) => OpCode::Authenticate,
            Self::Supported(_) => OpCode::Supported,
            Self::Result(_) => OpCode::Result,
            Self::Event(_) => OpCode::Event,
            Self::AuthChallenge(_) => OpCode::AuthChallenge,
            Self::AuthSuccess(_) => OpCode::AuthSuccess,
        }
    }
}

/// A response frame: a [`Header`], an optional tracing id, and a
/// [`ResponseBody`].
#[derive(Clone, Debug)]
pub struct ResponseFrame {
    pub(crate) header: Header,
    pub(crate) tracing_id: Option<Uuid>,
    pub(crate) body: ResponseBody,
}

impl ResponseFrame {
    /// Get the frame header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the tracing id attached by the server, if tracing was requested.
    pub fn tracing_id(&self) -> Option<Uuid> {
        self.tracing_id
    }

    /// Get the frame body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Consume the frame and get the body.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Get the frame error if it is an ERROR frame.
    pub fn get_error(&self) -> Option<&ErrorFrame> {
        match self.body() {
            ResponseBody::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Decode a full (already decompressed) frame buffer under the given
    /// dialect. Returns the frame and the number of body bytes consumed by
    /// its schema; a body longer than that is legal and the surplus is the
    /// caller's to discard.
    pub fn decode(payload: &[u8], version: ProtocolVersion) -> Result<(Self, usize), FrameError> {
        if payload.len() < HEADER_LEN {
            return Err(FrameError::TooSmall);
        }
        let header = Header::parse_response(&payload[..HEADER_LEN], version).map_err(FrameError::InvalidHeader)?;
        if payload.len() != HEADER_LEN + header.body_len() as usize {
            return Err(FrameError::InvalidFrame(anyhow::anyhow!(
                "Declared body length {} does not match buffer length {}",
                header.body_len(),
                payload.len() - HEADER_LEN
            )));
        }
        let mut start = HEADER_LEN;
        let tracing_id = if header.flags().tracing() {
            let mut id = [0u8; 16];
            if payload.len() < start + 16 {
                return Err(FrameError::TooSmall);
            }
            id.copy_from_slice(&payload[start..][..16]);
            start += 16;
            Some(Uuid::from_bytes(id))
        } else {
            None
        };
        let body = match header.opcode() {
            OpCode::Error => {
                ResponseBody::Error(ErrorFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?)
            }
            OpCode::Ready => ResponseBody::Ready(ReadyFrame),
            OpCode::Authenticate => ResponseBody::Authenticate(
                AuthenticateFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?,
            ),
            OpCode::Supported => ResponseBody::Supported(
                SupportedFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?,
            ),
            OpCode::Result => ResponseBody::Result(
                ResultFrame::from_payload(&mut start, payload, version).map_err(FrameError::InvalidBody)?,
            ),
            OpCode::Event => {
                ResponseBody::Event(EventFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?)
            }
            OpCode::AuthChallenge => ResponseBody::AuthChallenge(
                AuthChallengeFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?,
            ),
            OpCode::AuthSuccess => ResponseBody::AuthSuccess(
                AuthSuccessFrame::from_payload(&mut start, payload).map_err(FrameError::InvalidBody)?,
            ),
            c => {
                return Err(FrameError::InvalidFrame(anyhow::anyhow!(
                    "{:?} is not a response opcode",
                    c
                )))
            }
        };
        if start > payload.len() {
            return Err(FrameError::InvalidFrame(anyhow::anyhow!(
                "Body schema overran the declared length"
            )));
        }
        Ok((
            Self {
                header,
                tracing_id,
                body,
            },
            start,
        ))
    }

    /// Check if the frame is an ERROR frame.
    pub fn is_error_frame(&self) -> bool {
        self.header.opcode() == OpCode::Error
    }

    /// Check if the frame is a READY frame.
    pub fn is_ready_frame(&self) -> bool {
        self.header.opcode() == OpCode::Ready
    }

    /// Check if the frame is an AUTHENTICATE frame.
    pub fn is_authenticate_frame(&self) -> bool {
        self.header.opcode() == OpCode::Authenticate
    }

    /// Check if the frame is a SUPPORTED frame.
    pub fn is_supported_frame(&self) -> bool {
        self.header.opcode() == OpCode::Supported
    }

    /// Check if the frame is a RESULT frame.
    pub fn is_result_frame(&self) -> bool {
        self.header.opcode() == OpCode::Result
    }

    /// Check if the frame is an EVENT frame.
    pub fn is_event_frame(&self) -> bool {
        self.header.opcode() == OpCode::Event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_response_decodes() {
        let payload = [0x81, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let (frame, consumed) = ResponseFrame::decode(&payload, ProtocolVersion::V1).unwrap();
        assert!(frame.is_ready_frame());
        assert_eq!(consumed, payload.len());
    }

    #[test]
    fn declared_length_must_match_the_buffer() {
        // header says 4 body bytes, buffer has none
        let payload = [0x81, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x04];
        assert!(ResponseFrame::decode(&payload, ProtocolVersion::V1).is_err());
    }

    #[test]
    fn trailing_body_bytes_are_reported_not_rejected() {
        // a READY frame whose body carries 3 surplus bytes
        let payload = [0x82, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0xDE, 0xAD, 0xBF];
        let (frame, consumed) = ResponseFrame::decode(&payload, ProtocolVersion::V2).unwrap();
        assert!(frame.is_ready_frame());
        assert_eq!(consumed, 8);
    }
}
