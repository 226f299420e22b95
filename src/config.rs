// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relying-party configuration
//!
//! This module defines the read-only configuration injected into the
//! authentication handler. Provider metadata (endpoints, issuer) is expected
//! to be resolved by the host before constructing the config; no discovery
//! happens here.

use serde::{Deserialize, Serialize};

/// Response type the relying party requests from the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code flow
    #[default]
    Code,
    /// Implicit id_token flow
    IdToken,
    /// Hybrid flow, code and id_token together
    CodeIdToken,
}

impl ResponseType {
    /// Wire value for the `response_type` parameter
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::IdToken => "id_token",
            ResponseType::CodeIdToken => "code id_token",
        }
    }

    /// Whether responses of this type carry an authorization code
    pub fn expects_code(self) -> bool {
        matches!(self, ResponseType::Code | ResponseType::CodeIdToken)
    }
}

fn default_scope() -> String {
    "openid profile email".to_string()
}

fn default_require_state() -> bool {
    true
}

/// Read-only configuration for one relying party
///
/// Shared across in-flight authentications and never mutated mid-flight.
///
/// # Example
///
/// ```
/// use rust_oidc::config::RelyingPartyConfig;
///
/// let config = RelyingPartyConfig {
///     client_id: "my-client".to_string(),
///     issuer: "https://idp.example.com".to_string(),
///     authorization_endpoint: "https://idp.example.com/authorize".to_string(),
///     redirect_uri: "https://app.example.com/signin-oidc".to_string(),
///     ..RelyingPartyConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelyingPartyConfig {
    /// Client identifier registered at the provider
    pub client_id: String,

    /// Expected `iss` of tokens minted by the provider
    pub issuer: String,

    /// Provider authorization endpoint challenges redirect to
    pub authorization_endpoint: String,

    /// Callback the provider sends responses to
    pub redirect_uri: String,

    /// Response type requested at challenge time
    #[serde(default)]
    pub response_type: ResponseType,

    /// Space-separated scope requested at challenge time
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Whether inbound responses must carry a round-tripped state parameter
    ///
    /// `false` admits stateless flows: a missing state continues with empty
    /// properties instead of failing.
    #[serde(default = "default_require_state")]
    pub require_state: bool,
}

impl Default for RelyingPartyConfig {
    fn default() -> Self {
        RelyingPartyConfig {
            client_id: String::new(),
            issuer: String::new(),
            authorization_endpoint: String::new(),
            redirect_uri: String::new(),
            response_type: ResponseType::default(),
            scope: default_scope(),
            require_state: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_type_wire_values() {
        assert_eq!(ResponseType::Code.as_str(), "code");
        assert_eq!(ResponseType::CodeIdToken.as_str(), "code id_token");
        assert!(ResponseType::Code.expects_code());
        assert!(ResponseType::CodeIdToken.expects_code());
        assert!(!ResponseType::IdToken.expects_code());
    }

    #[test]
    fn defaults_require_state() {
        let config = RelyingPartyConfig::default();
        assert!(config.require_state);
        assert_eq!(config.scope, "openid profile email");
    }
}
