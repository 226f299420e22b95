// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! State protection codec and wire format
//!
//! The outbound `state` parameter value is
//! `rust_oidc.state=<urlencoded protected properties>[&<caller state>]`.
//! Only the exactly-matching library key marks a value as round-tripped by
//! this crate; everything after the first `&` belongs to the caller and
//! passes through untouched.
//!
//! The default codec signs the properties as an HS256 JWT so tampering is
//! detected on the way back in. The codec is a capability trait: test
//! doubles and alternate encodings substitute without touching the state
//! machine.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AuthenticationProperties;

/// Library-namespaced key marking a `state` value as produced by this crate
pub const STATE_KEY: &str = "rust_oidc.state";

/// Errors protecting or unprotecting round-tripped state
#[derive(Error, Debug)]
pub enum StateCodecError {
    /// The inbound value does not lead with the exact library key
    #[error("state value does not carry the `{STATE_KEY}` key")]
    UnrecognizedKey,

    #[error("properties could not be protected: {reason}")]
    Encode { reason: String },

    #[error("protected state could not be decoded: {reason}")]
    Decode { reason: String },
}

/// Protect/unprotect capability for round-tripped state
///
/// Implementations must have no hidden mutable state across calls:
/// unprotecting the same token twice yields the same properties both times.
#[cfg_attr(test, mockall::automock)]
pub trait StateCodec: Send + Sync {
    /// Serialize `properties` into an opaque, independently decodable token
    fn protect(&self, properties: &AuthenticationProperties) -> Result<String, StateCodecError>;

    /// Recover the properties from a token produced by [`protect`](Self::protect)
    fn unprotect(&self, token: &str) -> Result<AuthenticationProperties, StateCodecError>;
}

/// Compose the outbound `state` parameter value from a protected token
pub fn compose_state_parameter(protected: &str, caller_state: Option<&str>) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(protected.as_bytes()).collect();
    match caller_state {
        Some(caller) if !caller.is_empty() => format!("{STATE_KEY}={encoded}&{caller}"),
        _ => format!("{STATE_KEY}={encoded}"),
    }
}

/// Split an inbound `state` value into our protected token and caller state
///
/// The library key must lead and match exactly. The protected segment is
/// percent-decoded; the caller state after the first `&` is returned
/// verbatim.
pub fn split_state_parameter(state: &str) -> Result<(String, Option<String>), StateCodecError> {
    let rest = state
        .strip_prefix(STATE_KEY)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(StateCodecError::UnrecognizedKey)?;

    let (ours, caller_state) = match rest.split_once('&') {
        Some((ours, caller)) => (ours, Some(caller.to_string())),
        None => (rest, None),
    };

    let protected = url::form_urlencoded::parse(ours.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default();

    Ok((protected, caller_state))
}

/// Claims wrapper embedding the caller properties in a signed token
#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    iss: String,
    iat: i64,
    exp: i64,
    props: AuthenticationProperties,
}

/// Default [`StateCodec`]: HS256-signed JWT carrying the properties
///
/// Protected state expires (one hour by default) so a captured value cannot
/// be replayed indefinitely; use [`valid_for`](Self::valid_for) to change the
/// window, or swap the codec entirely for other trade-offs.
pub struct JwtStateCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    validity: Duration,
}

impl JwtStateCodec {
    /// Create a codec signing with the given shared secret
    pub fn new(secret: &[u8]) -> Self {
        JwtStateCodec {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: "rust_oidc".to_string(),
            validity: Duration::hours(1),
        }
    }

    /// Sets the issuer name stamped into protected state
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set how long protected state stays decodable
    pub fn valid_for(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }
}

impl StateCodec for JwtStateCodec {
    fn protect(&self, properties: &AuthenticationProperties) -> Result<String, StateCodecError> {
        let now = Utc::now();
        let claims = StateClaims {
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            props: properties.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            StateCodecError::Encode {
                reason: e.to_string(),
            }
        })
    }

    fn unprotect(&self, token: &str) -> Result<AuthenticationProperties, StateCodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[&self.issuer]);
        let data = decode::<StateClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            StateCodecError::Decode {
                reason: e.to_string(),
            }
        })?;
        Ok(data.claims.props)
    }
}
