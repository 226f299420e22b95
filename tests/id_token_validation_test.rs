// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for id_token validation over HS256 and RS256.

use std::sync::Once;

use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

use rust_oidc::validation::{
    IdTokenClaims, IdTokenValidator, JwtIdTokenValidator, TokenValidationError,
};

static INIT: Once = Once::new();

/// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// Generate test RS256 key pair for JWT signing and verification
fn generate_test_rs256_keys() -> (Vec<u8>, Vec<u8>) {
    let mut rng = rsa::rand_core::OsRng;
    let private_key =
        rsa::RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA private key");
    let public_key = rsa::RsaPublicKey::from(&private_key);

    let private_pem = EncodeRsaPrivateKey::to_pkcs1_pem(&private_key, rsa::pkcs1::LineEnding::LF)
        .expect("Failed to convert private key to PEM");
    let public_pem = EncodeRsaPublicKey::to_pkcs1_pem(&public_key, rsa::pkcs1::LineEnding::LF)
        .expect("Failed to convert public key to PEM");

    (private_pem.as_bytes().to_vec(), public_pem.as_bytes().to_vec())
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

fn sign_hs256(claims: &IdTokenClaims, secret: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("Failed to sign HS256 token")
}

fn hs256_validator() -> JwtIdTokenValidator {
    JwtIdTokenValidator::new(Some(b"id-token-secret"), None)
        .unwrap()
        .with_issuer("https://idp.example.com")
        .with_audience("client-1")
}

#[test]
fn valid_hs256_token_yields_principal() {
    setup();
    let token = sign_hs256(&sample_claims(), b"id-token-secret");

    let principal = hs256_validator()
        .validate(&token, Some("nonce-abc"))
        .expect("valid token should be accepted");

    assert_eq!(principal.subject, "user-42");
    assert_eq!(principal.issuer, "https://idp.example.com");
    assert_eq!(principal.audience, "client-1");
    assert_eq!(principal.name.as_deref(), Some("Test User"));
    assert_eq!(principal.email.as_deref(), Some("user@example.com"));
    assert!(principal.expiry > principal.issued_at);
}

#[test]
fn nonce_is_not_enforced_without_a_challenge_nonce() {
    setup();
    let token = sign_hs256(&sample_claims(), b"id-token-secret");

    assert!(hs256_validator().validate(&token, None).is_ok());
}

#[test]
fn wrong_hs256_secret_is_rejected() {
    setup();
    let token = sign_hs256(&sample_claims(), b"some-other-secret");

    assert!(matches!(
        hs256_validator().validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn wrong_audience_is_rejected() {
    setup();
    let mut claims = sample_claims();
    claims.aud = "somebody-else".to_string();
    let token = sign_hs256(&claims, b"id-token-secret");

    assert!(matches!(
        hs256_validator().validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn wrong_issuer_is_rejected() {
    setup();
    let mut claims = sample_claims();
    claims.iss = "https://evil.example.com".to_string();
    let token = sign_hs256(&claims, b"id-token-secret");

    assert!(matches!(
        hs256_validator().validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn expired_token_is_rejected() {
    setup();
    let mut claims = sample_claims();
    // Past the default 60 second leeway
    claims.exp = Utc::now().timestamp() - 7200;
    let token = sign_hs256(&claims, b"id-token-secret");

    assert!(matches!(
        hs256_validator().validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn token_from_the_future_is_rejected() {
    setup();
    let mut claims = sample_claims();
    claims.nbf = Some(Utc::now().timestamp() + 7200);
    let token = sign_hs256(&claims, b"id-token-secret");

    assert!(matches!(
        hs256_validator().validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn missing_nonce_claim_fails_nonce_comparison() {
    setup();
    let mut claims = sample_claims();
    claims.nonce = None;
    let token = sign_hs256(&claims, b"id-token-secret");

    assert!(matches!(
        hs256_validator().validate(&token, Some("nonce-abc")),
        Err(TokenValidationError::NonceMismatch)
    ));
}

#[test]
fn garbage_token_is_a_malformed_header() {
    setup();
    assert!(matches!(
        hs256_validator().validate("definitely not a jwt", None),
        Err(TokenValidationError::MalformedHeader { .. })
    ));
}

#[test]
fn rs256_token_round_trip() {
    setup();
    let (private_pem, public_pem) = generate_test_rs256_keys();

    let token = encode(
        &Header::new(Algorithm::RS256),
        &sample_claims(),
        &EncodingKey::from_rsa_pem(&private_pem).expect("Failed to create encoding key"),
    )
    .expect("Failed to sign RS256 token");

    let validator = JwtIdTokenValidator::new(None, Some(&public_pem))
        .unwrap()
        .with_issuer("https://idp.example.com")
        .with_audience("client-1");

    let principal = validator
        .validate(&token, Some("nonce-abc"))
        .expect("RS256 token should be accepted");
    assert_eq!(principal.subject, "user-42");
}

#[test]
fn rs256_token_with_wrong_key_is_rejected() {
    setup();
    let (private_pem, _) = generate_test_rs256_keys();
    let (_, wrong_public_pem) = generate_test_rs256_keys();

    let token = encode(
        &Header::new(Algorithm::RS256),
        &sample_claims(),
        &EncodingKey::from_rsa_pem(&private_pem).expect("Failed to create encoding key"),
    )
    .expect("Failed to sign RS256 token");

    let validator = JwtIdTokenValidator::new(None, Some(&wrong_public_pem))
        .unwrap()
        .with_issuer("https://idp.example.com")
        .with_audience("client-1");

    assert!(matches!(
        validator.validate(&token, None),
        Err(TokenValidationError::Invalid { .. })
    ));
}

#[test]
fn config_transported_keys_build_a_working_validator() {
    setup();
    let (private_pem, public_pem) = generate_test_rs256_keys();
    let public_base64 = base64::engine::general_purpose::STANDARD.encode(&public_pem);

    let token = encode(
        &Header::new(Algorithm::RS256),
        &sample_claims(),
        &EncodingKey::from_rsa_pem(&private_pem).expect("Failed to create encoding key"),
    )
    .expect("Failed to sign RS256 token");

    let validator =
        JwtIdTokenValidator::from_config_keys(Some("id-token-secret"), Some(&public_base64))
            .unwrap()
            .with_issuer("https://idp.example.com")
            .with_audience("client-1");

    // Both algorithms validate: RS256 via the decoded PEM, HS256 via the secret
    assert!(validator.validate(&token, None).is_ok());
    let hs_token = sign_hs256(&sample_claims(), b"id-token-secret");
    assert!(validator.validate(&hs_token, None).is_ok());
}

#[test]
fn hs256_token_without_an_hmac_key_is_rejected() {
    setup();
    let (_, public_pem) = generate_test_rs256_keys();
    let token = sign_hs256(&sample_claims(), b"id-token-secret");

    let validator = JwtIdTokenValidator::new(None, Some(&public_pem)).unwrap();
    assert!(matches!(
        validator.validate(&token, None),
        Err(TokenValidationError::KeyNotConfigured {
            alg: Algorithm::HS256
        })
    ));
}
