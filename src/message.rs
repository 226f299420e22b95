// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect protocol message model
//!
//! [`OidcMessage`] is a structural view over the name/value parameters of an
//! OpenID Connect request or response. No validation happens here: presence
//! or absence of a field is purely what the wire carried. Unknown parameters
//! are preserved so a message can be re-serialized without loss, e.g. as an
//! outbound form body or query string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Well-known OpenID Connect parameter names
pub mod param {
    pub const CODE: &str = "code";
    pub const ID_TOKEN: &str = "id_token";
    pub const STATE: &str = "state";
    pub const ERROR: &str = "error";
    pub const ERROR_DESCRIPTION: &str = "error_description";
    pub const SESSION_STATE: &str = "session_state";
    pub const CLIENT_ID: &str = "client_id";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const SCOPE: &str = "scope";
    pub const NONCE: &str = "nonce";
}

/// A set of protocol parameters with typed accessors
///
/// Insertion order is irrelevant; for a duplicated name the later value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OidcMessage {
    parameters: BTreeMap<String, String>,
}

impl OidcMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from raw name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let parameters = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        OidcMessage { parameters }
    }

    /// Raw value of an arbitrary parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Set a parameter, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Remove a parameter, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    pub fn code(&self) -> Option<&str> {
        self.get(param::CODE)
    }

    pub fn id_token(&self) -> Option<&str> {
        self.get(param::ID_TOKEN)
    }

    pub fn state(&self) -> Option<&str> {
        self.get(param::STATE)
    }

    pub fn error(&self) -> Option<&str> {
        self.get(param::ERROR)
    }

    pub fn error_description(&self) -> Option<&str> {
        self.get(param::ERROR_DESCRIPTION)
    }

    pub fn session_state(&self) -> Option<&str> {
        self.get(param::SESSION_STATE)
    }

    /// The equivalent name/value mapping, for re-serialization
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Form-encode the message, e.g. as an outbound POST body
    pub fn to_query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.parameters)
    }

    /// Compose a full request URL against `endpoint` with this message as query
    pub fn to_request_url(&self, endpoint: &Url) -> Result<Url, serde_urlencoded::ser::Error> {
        let mut url = endpoint.clone();
        url.set_query(Some(&self.to_query_string()?));
        Ok(url)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_reflect_the_wire() {
        let message = OidcMessage::from_pairs(vec![
            ("code", "abc123"),
            ("state", "xyz"),
            ("session_state", "sess-1"),
        ]);

        assert_eq!(message.code(), Some("abc123"));
        assert_eq!(message.state(), Some("xyz"));
        assert_eq!(message.session_state(), Some("sess-1"));
        assert_eq!(message.id_token(), None);
        assert_eq!(message.error(), None);
    }

    #[test]
    fn unknown_parameters_are_preserved() {
        let message = OidcMessage::from_pairs(vec![
            ("code", "abc123"),
            ("x_vendor_hint", "blue"),
        ]);

        assert_eq!(message.get("x_vendor_hint"), Some("blue"));
        let pairs = message.to_pairs();
        assert!(pairs.contains(&("x_vendor_hint".to_string(), "blue".to_string())));
    }

    #[test]
    fn query_string_round_trips() {
        let mut message = OidcMessage::new();
        message.set(param::CLIENT_ID, "client-1");
        message.set(param::SCOPE, "openid profile");

        let query = message.to_query_string().unwrap();
        let reparsed: Vec<(String, String)> = serde_urlencoded::from_str(&query).unwrap();
        assert_eq!(OidcMessage::from_pairs(reparsed), message);
    }

    #[test]
    fn request_url_carries_the_query() {
        let mut message = OidcMessage::new();
        message.set(param::RESPONSE_TYPE, "code");

        let endpoint = Url::parse("https://idp.example.com/authorize").unwrap();
        let url = message.to_request_url(&endpoint).unwrap();
        assert_eq!(url.query(), Some("response_type=code"));
        assert_eq!(url.path(), "/authorize");
    }
}
