// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication state machine
//!
//! [`OidcAuthenticationHandler`] consumes the parameter set of one inbound
//! protocol message and drives it through a fixed step sequence:
//!
//! 1. message-received notification
//! 2. provider error check
//! 3. state validation and unprotection
//! 4. authorization-code notification
//! 5. security-token notification and id_token validation
//! 6. security-token-validated notification
//!
//! Each step is gated on the flow not having been handled or skipped by an
//! earlier hook, and each transition emits exactly one trace entry with a
//! stable event id. One call to [`authenticate`] is one authentication
//! attempt; concurrent calls are fully independent because the handler holds
//! only shared read-only collaborators. Cancellation is cooperative:
//! dropping the returned future stops an in-flight hook at its next await
//! point and no further step runs.
//!
//! [`authenticate`]: OidcAuthenticationHandler::authenticate

use std::sync::Arc;

use log::Level;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::RelyingPartyConfig;
use crate::message::{param, OidcMessage};
use crate::notifications::{
    AuthenticationNotifications, DefaultNotifications, FlowControl, NotificationContext,
    RedirectContext,
};
use crate::state::{
    compose_state_parameter, split_state_parameter, AuthenticationProperties, StateCodec,
    StateCodecError,
};
use crate::trace::{EventId, Tracer};
use crate::validation::{IdTokenValidator, Principal, TokenValidationError};

/// Properties item carrying the challenge nonce to the response side
pub const NONCE_ITEM: &str = "nonce";

/// Terminal outcome of one processed message
#[derive(Debug)]
pub enum AuthenticationOutcome {
    /// Every step ran to completion
    Success {
        /// Validated identity; `None` for a code-only response
        principal: Option<Principal>,
        /// Properties recovered from the round-tripped state
        properties: AuthenticationProperties,
        /// Caller state that trailed the library segment, verbatim
        caller_state: Option<String>,
    },
    /// A hook produced the response; the host must emit nothing further
    Handled,
    /// A hook bypassed the remaining framework processing
    Skipped,
}

/// Terminal failures, reported to the caller and never retried here
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// The provider answered the challenge with an error response
    #[error("identity provider returned an error response: {error}")]
    Protocol {
        error: String,
        description: Option<String>,
    },

    #[error("response carries no state parameter")]
    MissingState,

    #[error("state parameter could not be unprotected: {source}")]
    InvalidState {
        #[from]
        source: StateCodecError,
    },

    #[error("state parameter could not be protected: {source}")]
    StateProtection { source: StateCodecError },

    #[error("id_token validation failed: {source}")]
    TokenValidation {
        #[from]
        source: TokenValidationError,
    },

    /// A hook returned an error; propagated, never swallowed
    #[error("notification hook failed at {stage}: {source}")]
    Notification {
        stage: &'static str,
        source: anyhow::Error,
    },

    #[error("relying party misconfigured: {reason}")]
    Configuration { reason: String },
}

/// Outbound authorization request composed by `build_challenge`
#[derive(Debug)]
pub struct ChallengeRequest {
    /// The outbound protocol message, after hooks ran
    pub message: OidcMessage,
    /// Full authorization request URL
    pub redirect_url: Url,
}

/// Result of issuing a challenge
#[derive(Debug)]
pub enum ChallengeOutcome {
    /// Redirect the user agent to the identity provider
    Redirect(ChallengeRequest),
    /// A hook produced the response itself
    Handled,
}

/// OpenID Connect relying-party message processor
///
/// Holds the injected configuration, state codec, token validator,
/// notification set and tracer, all shared and effectively read-only.
pub struct OidcAuthenticationHandler {
    config: Arc<RelyingPartyConfig>,
    codec: Arc<dyn StateCodec>,
    validator: Arc<dyn IdTokenValidator>,
    notifications: Arc<dyn AuthenticationNotifications>,
    tracer: Tracer,
}

impl OidcAuthenticationHandler {
    pub fn new(
        config: Arc<RelyingPartyConfig>,
        codec: Arc<dyn StateCodec>,
        validator: Arc<dyn IdTokenValidator>,
    ) -> Self {
        OidcAuthenticationHandler {
            config,
            codec,
            validator,
            notifications: Arc::new(DefaultNotifications),
            tracer: Tracer::to_log_facade(),
        }
    }

    /// Register the hook set fired at each extension point
    pub fn with_notifications(
        mut self,
        notifications: Arc<dyn AuthenticationNotifications>,
    ) -> Self {
        self.notifications = notifications;
        self
    }

    /// Route trace entries somewhere other than the `log` facade
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Process one inbound protocol message
    ///
    /// `parameters` is the decoded name/value set of a form body or query
    /// string. Returns exactly one terminal outcome per message.
    pub async fn authenticate<I>(
        &self,
        parameters: I,
    ) -> Result<AuthenticationOutcome, AuthenticationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let message = OidcMessage::from_pairs(parameters);

        // MessageReceived
        self.tracer.emit(
            EventId::MessageReceivedEntered,
            Level::Debug,
            "protocol message received",
        );
        let mut ctx = NotificationContext::new(&message);
        self.run_hook(
            "message_received",
            self.notifications.message_received(&mut ctx),
        )
        .await?;
        if let Some(outcome) = self.short_circuit(
            ctx.control(),
            "message_received",
            EventId::MessageReceivedHandled,
            EventId::MessageReceivedSkipped,
            EventId::MessageReceivedPassed,
        ) {
            return Ok(outcome);
        }

        // ErrorCheck
        if let Some(error) = message.error() {
            self.tracer.emit_error(
                EventId::ProtocolErrorReceived,
                Level::Error,
                "identity provider returned an error response",
                error,
            );
            return Err(AuthenticationError::Protocol {
                error: error.to_string(),
                description: message.error_description().map(str::to_string),
            });
        }

        // StateValidation
        let (properties, caller_state) = match message.state() {
            None | Some("") => {
                if self.config.require_state {
                    self.tracer.emit(
                        EventId::StateMissing,
                        Level::Error,
                        "response carries no state parameter",
                    );
                    return Err(AuthenticationError::MissingState);
                }
                self.tracer.emit(
                    EventId::StatelessAccepted,
                    Level::Debug,
                    "stateless flow admitted with empty properties",
                );
                (AuthenticationProperties::new(), None)
            }
            Some(state) => match self.unprotect_state(state) {
                Ok(recovered) => {
                    self.tracer.emit(
                        EventId::StateValidated,
                        Level::Debug,
                        "state parameter validated",
                    );
                    recovered
                }
                Err(source) => {
                    self.tracer.emit_error(
                        EventId::StateInvalid,
                        Level::Error,
                        "state parameter could not be unprotected",
                        &source,
                    );
                    return Err(AuthenticationError::InvalidState { source });
                }
            },
        };

        // AuthorizationCodeReceived
        if message.code().is_some() && self.config.response_type.expects_code() {
            self.tracer.emit(
                EventId::AuthorizationCodeEntered,
                Level::Debug,
                "authorization code received",
            );
            let mut ctx = NotificationContext::new(&message)
                .with_properties(&properties)
                .with_caller_state(caller_state.as_deref());
            self.run_hook(
                "authorization_code_received",
                self.notifications.authorization_code_received(&mut ctx),
            )
            .await?;
            if let Some(outcome) = self.short_circuit(
                ctx.control(),
                "authorization_code_received",
                EventId::AuthorizationCodeHandled,
                EventId::AuthorizationCodeSkipped,
                EventId::AuthorizationCodePassed,
            ) {
                return Ok(outcome);
            }
        }

        // SecurityTokenReceived and validation
        let mut principal = None;
        if let Some(id_token) = message.id_token() {
            self.tracer.emit(
                EventId::SecurityTokenEntered,
                Level::Debug,
                "security token received",
            );
            let mut ctx = NotificationContext::new(&message)
                .with_properties(&properties)
                .with_caller_state(caller_state.as_deref());
            self.run_hook(
                "security_token_received",
                self.notifications.security_token_received(&mut ctx),
            )
            .await?;
            if let Some(outcome) = self.short_circuit(
                ctx.control(),
                "security_token_received",
                EventId::SecurityTokenHandled,
                EventId::SecurityTokenSkipped,
                EventId::SecurityTokenPassed,
            ) {
                return Ok(outcome);
            }

            let validated = match self
                .validator
                .validate(id_token, properties.get(NONCE_ITEM))
            {
                Ok(validated) => validated,
                Err(source) => {
                    self.tracer.emit_error(
                        EventId::TokenValidationFailed,
                        Level::Error,
                        "id_token validation failed",
                        &source,
                    );
                    return Err(AuthenticationError::TokenValidation { source });
                }
            };

            // SecurityTokenValidated
            self.tracer.emit(
                EventId::SecurityTokenValidatedEntered,
                Level::Debug,
                "security token validated",
            );
            let mut ctx = NotificationContext::new(&message)
                .with_properties(&properties)
                .with_caller_state(caller_state.as_deref())
                .with_principal(&validated);
            self.run_hook(
                "security_token_validated",
                self.notifications.security_token_validated(&mut ctx),
            )
            .await?;
            if let Some(outcome) = self.short_circuit(
                ctx.control(),
                "security_token_validated",
                EventId::SecurityTokenValidatedHandled,
                EventId::SecurityTokenValidatedSkipped,
                EventId::SecurityTokenValidatedPassed,
            ) {
                return Ok(outcome);
            }
            principal = Some(validated);
        }

        // Completion
        self.tracer.emit(
            EventId::AuthenticationSuccess,
            Level::Info,
            "authentication completed",
        );
        Ok(AuthenticationOutcome::Success {
            principal,
            properties,
            caller_state,
        })
    }

    /// Compose the outbound authorization request for one challenge
    ///
    /// A fresh nonce is stamped into `properties` before protection so the
    /// response side can match the id_token's `nonce` claim; the properties
    /// then travel inside the `state` parameter. `caller_state` is appended
    /// after the library segment and comes back verbatim. The
    /// `redirect_to_identity_provider` hook runs before the redirect URL is
    /// composed and may rewrite the message or take over the response.
    pub async fn build_challenge(
        &self,
        mut properties: AuthenticationProperties,
        caller_state: Option<&str>,
    ) -> Result<ChallengeOutcome, AuthenticationError> {
        let nonce = Uuid::new_v4().to_string();
        properties.insert(NONCE_ITEM, nonce.clone());

        let protected = self
            .codec
            .protect(&properties)
            .map_err(|source| AuthenticationError::StateProtection { source })?;

        let mut message = OidcMessage::new();
        message.set(param::RESPONSE_TYPE, self.config.response_type.as_str());
        message.set(param::CLIENT_ID, self.config.client_id.clone());
        message.set(param::REDIRECT_URI, self.config.redirect_uri.clone());
        message.set(param::SCOPE, self.config.scope.clone());
        message.set(param::NONCE, nonce);
        message.set(
            param::STATE,
            compose_state_parameter(&protected, caller_state),
        );

        let mut ctx = RedirectContext::new(&mut message);
        self.run_hook(
            "redirect_to_identity_provider",
            self.notifications.redirect_to_identity_provider(&mut ctx),
        )
        .await?;
        if ctx.control() == FlowControl::Handled {
            self.tracer.emit(
                EventId::RedirectHandled,
                Level::Debug,
                "redirect_to_identity_provider hook handled the response",
            );
            return Ok(ChallengeOutcome::Handled);
        }

        let endpoint = Url::parse(&self.config.authorization_endpoint).map_err(|e| {
            AuthenticationError::Configuration {
                reason: format!("invalid authorization endpoint: {e}"),
            }
        })?;
        let redirect_url = message.to_request_url(&endpoint).map_err(|e| {
            AuthenticationError::Configuration {
                reason: format!("outbound message not encodable: {e}"),
            }
        })?;

        self.tracer.emit(
            EventId::ChallengeIssued,
            Level::Info,
            "authorization request issued",
        );
        Ok(ChallengeOutcome::Redirect(ChallengeRequest {
            message,
            redirect_url,
        }))
    }

    fn unprotect_state(
        &self,
        state: &str,
    ) -> Result<(AuthenticationProperties, Option<String>), StateCodecError> {
        let (protected, caller_state) = split_state_parameter(state)?;
        let properties = self.codec.unprotect(&protected)?;
        Ok((properties, caller_state))
    }

    async fn run_hook<F>(&self, stage: &'static str, hook: F) -> Result<(), AuthenticationError>
    where
        F: std::future::Future<Output = anyhow::Result<()>>,
    {
        hook.await.map_err(|source| {
            self.tracer.emit_error(
                EventId::NotificationFailed,
                Level::Error,
                format!("notification hook failed at {stage}"),
                &source,
            );
            AuthenticationError::Notification { stage, source }
        })
    }

    fn short_circuit(
        &self,
        control: FlowControl,
        stage: &'static str,
        handled: EventId,
        skipped: EventId,
        passed: EventId,
    ) -> Option<AuthenticationOutcome> {
        match control {
            FlowControl::Handled => {
                self.tracer.emit(
                    handled,
                    Level::Debug,
                    format!("{stage} hook handled the response"),
                );
                Some(AuthenticationOutcome::Handled)
            }
            FlowControl::Skipped => {
                self.tracer.emit(
                    skipped,
                    Level::Debug,
                    format!("{stage} hook skipped to next middleware"),
                );
                Some(AuthenticationOutcome::Skipped)
            }
            FlowControl::Continue => {
                self.tracer.emit(passed, Level::Debug, format!("{stage} passed"));
                None
            }
        }
    }
}
