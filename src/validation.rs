// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! id_token validation and principal extraction
//!
//! This module provides the validator capability the state machine delegates
//! to when a response carries an id_token. It includes:
//!
//! - A configurable JWT validator supporting both HS256 and RS256, selecting
//!   the algorithm from the token header
//! - Verification of signature, expiration, activation time, issuer,
//!   audience and the challenge nonce
//! - Extraction of a [`Principal`] from validated claims
//!
//! # Security Considerations
//!
//! - Always validate tokens before trusting their contents
//! - Use appropriate algorithm and key length for your security requirements

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while validating an id_token
#[derive(Error, Debug)]
pub enum TokenValidationError {
    #[error("failed to decode token header: {reason}")]
    MalformedHeader { reason: String },

    #[error("unsupported token algorithm: {alg:?}")]
    UnsupportedAlgorithm { alg: Algorithm },

    #[error("no verification key configured for {alg:?}")]
    KeyNotConfigured { alg: Algorithm },

    #[error("invalid verification key: {reason}")]
    InvalidKey { reason: String },

    #[error("token rejected: {reason}")]
    Invalid { reason: String },

    #[error("token carries an invalid timestamp")]
    InvalidTimestamp,

    #[error("nonce in token does not match the challenge nonce")]
    NonceMismatch,
}

/// Standard id_token claims
///
/// RFC 7519 registered claims plus the OpenID Connect additions this crate
/// consumes. Unlisted claims are ignored, not rejected.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject, the end-user identifier at the provider
    pub sub: String,

    /// Issuer of the token
    pub iss: String,

    /// Audience, the relying party's client id
    pub aud: String,

    /// Issued-at timestamp, seconds since the Unix epoch
    pub iat: i64,

    /// Expiration timestamp, seconds since the Unix epoch
    pub exp: i64,

    /// Not-before timestamp, when the token becomes valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Nonce echoed back from the authorization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Validated identity extracted from an id_token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// End-user identifier from the subject claim
    pub subject: String,

    /// Issuer the token was minted by
    pub issuer: String,

    /// Client id the token was minted for
    pub audience: String,

    pub name: Option<String>,
    pub email: Option<String>,

    /// When the token was issued
    pub issued_at: DateTime<Utc>,

    /// When the token expires
    pub expiry: DateTime<Utc>,
}

/// Capability validating an id_token into a [`Principal`]
///
/// Injected into the state machine so alternate validators (test doubles,
/// remote key sets) substitute without touching it. Implementations must be
/// safe for concurrent read access from multiple in-flight authentications.
pub trait IdTokenValidator: Send + Sync {
    /// Validate `id_token` and extract the principal
    ///
    /// `expected_nonce` is the nonce stamped into the round-tripped
    /// properties at challenge time; when present, the token's `nonce` claim
    /// must match it exactly.
    fn validate(
        &self,
        id_token: &str,
        expected_nonce: Option<&str>,
    ) -> Result<Principal, TokenValidationError>;
}

/// A validator for id_tokens issued over HS256 or RS256
///
/// The signing algorithm is read from the token header and matched against
/// the configured keys; expiration and activation time are always enforced,
/// issuer and audience when configured.
pub struct JwtIdTokenValidator {
    /// Optional HMAC secret for HS256
    hmac_key: Option<DecodingKey>,
    /// Optional RS256 public key
    rs256_key: Option<DecodingKey>,
    /// The expected issuer of the token, if any
    expected_issuer: Option<String>,
    /// The expected audience of the token, if any
    expected_audience: Option<String>,
}

impl JwtIdTokenValidator {
    /// Create a new validator with optional HS256 and RS256 keys
    pub fn new(
        hmac_secret: Option<&[u8]>,
        rs256_public_key_pem: Option<&[u8]>,
    ) -> Result<Self, TokenValidationError> {
        let hmac_key = hmac_secret.map(DecodingKey::from_secret);
        let rs256_key = match rs256_public_key_pem {
            Some(pem) => Some(DecodingKey::from_rsa_pem(pem).map_err(|e| {
                TokenValidationError::InvalidKey {
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        Ok(JwtIdTokenValidator {
            hmac_key,
            rs256_key,
            expected_issuer: None,
            expected_audience: None,
        })
    }

    /// Create a validator from configuration-transported key material
    ///
    /// The RS256 public key arrives base64-encoded (the usual way a PEM is
    /// carried inside a configuration file) and is decoded here.
    pub fn from_config_keys(
        hmac_secret: Option<&str>,
        rs256_public_key_base64: Option<&str>,
    ) -> Result<Self, TokenValidationError> {
        let rs256_pem = match rs256_public_key_base64 {
            Some(encoded) if !encoded.is_empty() => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| TokenValidationError::InvalidKey {
                        reason: e.to_string(),
                    })?,
            ),
            _ => None,
        };
        Self::new(
            hmac_secret.filter(|s| !s.is_empty()).map(str::as_bytes),
            rs256_pem.as_deref(),
        )
    }

    /// Set the expected issuer name
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Set the expected audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self
    }

    /// Validate a token and return the decoded claims
    ///
    /// Verifies the signature using the key matching the header algorithm,
    /// checks `exp` and `nbf`, and compares issuer and audience when
    /// configured.
    pub fn decode_claims(&self, token: &str) -> Result<IdTokenClaims, TokenValidationError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            TokenValidationError::MalformedHeader {
                reason: e.to_string(),
            }
        })?;

        let (key, algorithm) = match header.alg {
            Algorithm::HS256 => {
                let key = self
                    .hmac_key
                    .as_ref()
                    .ok_or(TokenValidationError::KeyNotConfigured {
                        alg: Algorithm::HS256,
                    })?;
                (key, Algorithm::HS256)
            }
            Algorithm::RS256 => {
                let key = self
                    .rs256_key
                    .as_ref()
                    .ok_or(TokenValidationError::KeyNotConfigured {
                        alg: Algorithm::RS256,
                    })?;
                (key, Algorithm::RS256)
            }
            alg => return Err(TokenValidationError::UnsupportedAlgorithm { alg }),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        if let Some(ref issuer) = self.expected_issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(ref audience) = self.expected_audience {
            validation.set_audience(&[audience]);
        }

        let token_data =
            decode::<IdTokenClaims>(token, key, &validation).map_err(|e| {
                TokenValidationError::Invalid {
                    reason: e.to_string(),
                }
            })?;
        Ok(token_data.claims)
    }
}

impl IdTokenValidator for JwtIdTokenValidator {
    fn validate(
        &self,
        id_token: &str,
        expected_nonce: Option<&str>,
    ) -> Result<Principal, TokenValidationError> {
        let claims = self.decode_claims(id_token)?;

        if let Some(expected) = expected_nonce {
            if claims.nonce.as_deref() != Some(expected) {
                return Err(TokenValidationError::NonceMismatch);
            }
        }

        Ok(Principal {
            subject: claims.sub,
            issuer: claims.iss,
            audience: claims.aud,
            name: claims.name,
            email: claims.email,
            issued_at: Utc
                .timestamp_opt(claims.iat, 0)
                .single()
                .ok_or(TokenValidationError::InvalidTimestamp)?,
            expiry: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .ok_or(TokenValidationError::InvalidTimestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn sign_hs256(claims: &IdTokenClaims, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn sample_claims() -> IdTokenClaims {
        let now = Utc::now().timestamp();
        IdTokenClaims {
            sub: "user-42".to_string(),
            iss: "https://idp.example.com".to_string(),
            aud: "client-1".to_string(),
            iat: now,
            exp: now + 3600,
            nbf: None,
            nonce: Some("nonce-abc".to_string()),
            email: Some("user@example.com".to_string()),
            name: Some("Test User".to_string()),
        }
    }

    #[test]
    fn nonce_mismatch_is_rejected() {
        let validator = JwtIdTokenValidator::new(Some(b"id-secret"), None)
            .unwrap()
            .with_issuer("https://idp.example.com")
            .with_audience("client-1");
        let token = sign_hs256(&sample_claims(), b"id-secret");

        assert!(matches!(
            validator.validate(&token, Some("different-nonce")),
            Err(TokenValidationError::NonceMismatch)
        ));
    }

    #[test]
    fn matching_nonce_yields_principal() {
        let validator = JwtIdTokenValidator::new(Some(b"id-secret"), None)
            .unwrap()
            .with_issuer("https://idp.example.com")
            .with_audience("client-1");
        let token = sign_hs256(&sample_claims(), b"id-secret");

        let principal = validator.validate(&token, Some("nonce-abc")).unwrap();
        assert_eq!(principal.subject, "user-42");
        assert_eq!(principal.audience, "client-1");
        assert_eq!(principal.email.as_deref(), Some("user@example.com"));
    }
}
