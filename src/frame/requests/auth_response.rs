// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTH_RESPONSE frame and the authenticator
//! plug-in seam.

use super::*;
use std::collections::HashMap;

/**
    Answers a server authentication challenge (protocol v2).

    Authentication is SASL based. The server sends challenges (a bytes token)
    to which the client answers with this message. The exchange begins with
    the client sending an initial AUTH_RESPONSE in response to a server
    AUTHENTICATE, and continues until the server accepts it with
    AUTH_SUCCESS or rejects it with ERROR.

    The body is a single `[bytes]` token whose contents depend on the
    authenticator in use.
*/
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug))]
#[builder(pattern = "owned")]
pub struct AuthResponseFrame {
    #[allow(missing_docs)]
    pub(crate) token: Vec<u8>,
}

impl AuthResponseFrame {
    /// Get the authentication token.
    pub fn token(&self) -> &[u8] {
        &self.token
    }
}

impl ToPayload for AuthResponseFrame {
    fn to_payload(self, payload: &mut Vec<u8>) {
        write_bytes(&self.token, payload);
    }
}

impl AuthResponseFrameBuilder {
    /// Set the authentication token using an [`Authenticator`].
    pub fn auth_token(mut self, authenticator: &impl Authenticator) -> Self {
        self.token.replace(authenticator.token());
        self
    }
}

/// The credential-sourcing seam. The protocol exchange stays in this crate;
/// where the secrets come from does not.
pub trait Authenticator: Clone + Default {
    /// The SASL token sent in a v2 AUTH_RESPONSE.
    fn token(&self) -> Vec<u8>;
    /// The credential entries sent in a v1 CREDENTIALS frame.
    fn credentials(&self) -> HashMap<String, String>;
}

/// The unit authenticator for clusters that accept everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowAllAuth;

impl Authenticator for AllowAllAuth {
    fn token(&self) -> Vec<u8> {
        vec![0]
    }

    fn credentials(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Clone)]
/// The password authentication structure with the user and password fields.
pub struct PasswordAuth {
    user: String,
    pass: String,
}

impl Default for PasswordAuth {
    fn default() -> Self {
        PasswordAuth::new("cassandra".to_owned(), "cassandra".to_owned())
    }
}

impl PasswordAuth {
    /// Create a new user with account and the corresponding password.
    pub fn new(user: String, pass: String) -> Self {
        Self { user, pass }
    }
}

impl Authenticator for PasswordAuth {
    // SASL PLAIN: NUL user NUL pass
    fn token(&self) -> Vec<u8> {
        let mut token = Vec::with_capacity(self.user.len() + self.pass.len() + 2);
        token.push(0);
        token.extend_from_slice(self.user.as_bytes());
        token.push(0);
        token.extend_from_slice(self.pass.as_bytes());
        token
    }

    fn credentials(&self) -> HashMap<String, String> {
        let mut credentials = HashMap::new();
        credentials.insert("username".to_owned(), self.user.clone());
        credentials.insert("password".to_owned(), self.pass.clone());
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_auth_plain_token() {
        let auth = PasswordAuth::new("user".to_owned(), "pass".to_owned());
        assert_eq!(auth.token(), b"\0user\0pass");
    }

    #[test]
    fn auth_response_frames_the_token() {
        let mut payload = Vec::new();
        AuthResponseFrameBuilder::default()
            .auth_token(&PasswordAuth::default())
            .build()
            .unwrap()
            .to_payload(&mut payload);
        assert_eq!(&payload[..4], &(19i32).to_be_bytes());
        assert_eq!(&payload[4..], b"\0cassandra\0cassandra");
    }
}
