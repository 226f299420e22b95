// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # OpenID Connect Relying-Party Authentication
//!
//! This crate implements the message-processing core of an OpenID Connect
//! relying party: it consumes the name/value parameters of an inbound
//! protocol message (authorization code response, id_token response or error
//! response), validates and unprotects the round-tripped `state` parameter,
//! dispatches a sequence of extensibility notifications, and decides whether
//! to continue normal processing, short-circuit with a handled response, or
//! skip to subsequent middleware.
//!
//! The HTTP pipeline, session/cookie handling and provider metadata
//! discovery stay with the host application; the crate only needs the
//! decoded parameter set and a handful of injected capabilities.
//!
//! ## Module Structure
//!
//! - [`message`] - protocol message model with typed accessors
//! - [`state`] - round-tripped state protection and wire format
//! - [`notifications`] - extension-point hooks and flow control
//! - [`handler`] - the authentication state machine and challenge builder
//! - [`validation`] - id_token validation and principal extraction
//! - [`trace`] - structured event emission with stable identifiers
//! - [`config`] - relying-party configuration
//!
//! ## Authentication Flow
//!
//! 1. The host issues a challenge via
//!    [`handler::OidcAuthenticationHandler::build_challenge`], which protects
//!    the caller's [`state::AuthenticationProperties`] into the `state`
//!    parameter and redirects to the provider
//! 2. The provider sends the user back with a response message
//! 3. The host hands the decoded parameters to
//!    [`handler::OidcAuthenticationHandler::authenticate`]
//! 4. The state machine fires notifications, checks for provider errors,
//!    unprotects the state, validates any id_token and returns exactly one
//!    terminal outcome: success, handled, skipped, or a typed failure
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use rust_oidc::config::RelyingPartyConfig;
//! use rust_oidc::handler::OidcAuthenticationHandler;
//! use rust_oidc::state::JwtStateCodec;
//! use rust_oidc::validation::JwtIdTokenValidator;
//!
//! let config = Arc::new(RelyingPartyConfig {
//!     client_id: "my-client".to_string(),
//!     issuer: "https://idp.example.com".to_string(),
//!     authorization_endpoint: "https://idp.example.com/authorize".to_string(),
//!     redirect_uri: "https://app.example.com/signin-oidc".to_string(),
//!     ..RelyingPartyConfig::default()
//! });
//! let codec = Arc::new(JwtStateCodec::new(b"state-secret"));
//! let validator = Arc::new(
//!     JwtIdTokenValidator::new(Some(b"id-token-secret"), None)
//!         .unwrap()
//!         .with_issuer("https://idp.example.com")
//!         .with_audience("my-client"),
//! );
//!
//! let handler = OidcAuthenticationHandler::new(config, codec, validator);
//! // handler.authenticate(parameters).await drives one inbound message
//! ```

pub mod config;
pub mod handler;
pub mod message;
pub mod notifications;
pub mod state;
pub mod trace;
pub mod validation;

// Re-export commonly used items for convenience
pub use config::{RelyingPartyConfig, ResponseType};
pub use handler::{
    AuthenticationError, AuthenticationOutcome, ChallengeOutcome, ChallengeRequest,
    OidcAuthenticationHandler,
};
pub use message::OidcMessage;
pub use notifications::{
    AuthenticationNotifications, FlowControl, FlowControlError, NotificationContext,
    RedirectContext,
};
pub use state::{AuthenticationProperties, JwtStateCodec, StateCodec, StateCodecError};
pub use trace::{CaptureSink, EventId, LogEntry, TraceSink, Tracer};
pub use validation::{IdTokenValidator, JwtIdTokenValidator, Principal, TokenValidationError};
