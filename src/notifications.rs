// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Extension-point notifications
//!
//! Each authentication attempt dispatches a fixed sequence of notifications.
//! Hooks are methods on [`AuthenticationNotifications`]; every method
//! defaults to a no-op, so implementors override only the points they care
//! about. A hook may mark the flow handled or skipped through its context;
//! once either is set, the state machine invokes no further step and no
//! further notification for that message.
//!
//! Hooks run strictly in pipeline order for one message, are awaited before
//! their outcome is inspected, and are never invoked concurrently for the
//! same inbound message.

use async_trait::async_trait;
use thiserror::Error;

use crate::message::OidcMessage;
use crate::state::AuthenticationProperties;
use crate::validation::Principal;

/// Tagged short-circuit outcome of one notification
///
/// A single enum rather than two independent flags: the invalid
/// "handled and skipped" combination cannot be represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowControl {
    /// Framework processing continues
    #[default]
    Continue,
    /// A hook produced the response itself
    Handled,
    /// Remaining framework processing is bypassed for this message
    Skipped,
}

/// A hook tried to short-circuit a flow that was already short-circuited
///
/// `handle_response` and `skip_to_next_middleware` may be called at most
/// once per context; a second call is a configuration error in the hook.
#[derive(Error, Debug)]
#[error("flow is already marked {current:?}")]
pub struct FlowControlError {
    pub current: FlowControl,
}

/// Per-extension-point view handed to inbound hooks
#[derive(Debug)]
pub struct NotificationContext<'a> {
    message: &'a OidcMessage,
    properties: Option<&'a AuthenticationProperties>,
    caller_state: Option<&'a str>,
    principal: Option<&'a Principal>,
    control: FlowControl,
}

impl<'a> NotificationContext<'a> {
    pub(crate) fn new(message: &'a OidcMessage) -> Self {
        NotificationContext {
            message,
            properties: None,
            caller_state: None,
            principal: None,
            control: FlowControl::Continue,
        }
    }

    pub(crate) fn with_properties(mut self, properties: &'a AuthenticationProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub(crate) fn with_caller_state(mut self, caller_state: Option<&'a str>) -> Self {
        self.caller_state = caller_state;
        self
    }

    pub(crate) fn with_principal(mut self, principal: &'a Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// The protocol message being processed
    pub fn message(&self) -> &OidcMessage {
        self.message
    }

    /// Decoded round-trip properties, once state validation has run
    pub fn properties(&self) -> Option<&AuthenticationProperties> {
        self.properties
    }

    /// Caller state trailing the library segment, verbatim
    pub fn caller_state(&self) -> Option<&str> {
        self.caller_state
    }

    /// Validated principal, at the `security_token_validated` point only
    pub fn principal(&self) -> Option<&Principal> {
        self.principal
    }

    /// Current short-circuit decision
    pub fn control(&self) -> FlowControl {
        self.control
    }

    /// Mark the response as produced by this hook
    ///
    /// No later state executes and no further notification fires.
    pub fn handle_response(&mut self) -> Result<(), FlowControlError> {
        self.transition(FlowControl::Handled)
    }

    /// Bypass the remaining framework processing for this message
    pub fn skip_to_next_middleware(&mut self) -> Result<(), FlowControlError> {
        self.transition(FlowControl::Skipped)
    }

    fn transition(&mut self, target: FlowControl) -> Result<(), FlowControlError> {
        if self.control != FlowControl::Continue {
            return Err(FlowControlError {
                current: self.control,
            });
        }
        self.control = target;
        Ok(())
    }
}

/// Context for the outbound `redirect_to_identity_provider` point
///
/// The hook may rewrite the outbound message before the redirect URL is
/// composed, or take over the response entirely.
#[derive(Debug)]
pub struct RedirectContext<'a> {
    message: &'a mut OidcMessage,
    control: FlowControl,
}

impl<'a> RedirectContext<'a> {
    pub(crate) fn new(message: &'a mut OidcMessage) -> Self {
        RedirectContext {
            message,
            control: FlowControl::Continue,
        }
    }

    /// The outbound authorization request message, mutable
    pub fn message(&mut self) -> &mut OidcMessage {
        self.message
    }

    /// Current short-circuit decision
    pub fn control(&self) -> FlowControl {
        self.control
    }

    /// Mark the response as produced by this hook; no redirect is issued
    pub fn handle_response(&mut self) -> Result<(), FlowControlError> {
        if self.control != FlowControl::Continue {
            return Err(FlowControlError {
                current: self.control,
            });
        }
        self.control = FlowControl::Handled;
        Ok(())
    }
}

/// Extensibility hooks fired by the authentication state machine
///
/// Every method defaults to doing nothing, so an unregistered extension
/// point is a no-op. Hook failures propagate to the caller as a distinct
/// authentication failure; they are never swallowed.
#[async_trait]
pub trait AuthenticationNotifications: Send + Sync {
    /// Raw message constructed, before any validation
    async fn message_received(&self, ctx: &mut NotificationContext<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// An authorization code arrived and state validation passed
    async fn authorization_code_received(
        &self,
        ctx: &mut NotificationContext<'_>,
    ) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// An id_token arrived, before it is validated
    async fn security_token_received(
        &self,
        ctx: &mut NotificationContext<'_>,
    ) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// The id_token validated into a principal
    async fn security_token_validated(
        &self,
        ctx: &mut NotificationContext<'_>,
    ) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// The outbound authorization request is about to be issued
    async fn redirect_to_identity_provider(
        &self,
        ctx: &mut RedirectContext<'_>,
    ) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// No-op notification set used when the caller registers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNotifications;

#[async_trait]
impl AuthenticationNotifications for DefaultNotifications {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_short_circuit_call_is_an_error() {
        let message = OidcMessage::new();
        let mut ctx = NotificationContext::new(&message);

        ctx.handle_response().unwrap();
        let err = ctx.skip_to_next_middleware().unwrap_err();
        assert_eq!(err.current, FlowControl::Handled);
        assert_eq!(ctx.control(), FlowControl::Handled);
    }

    #[test]
    fn repeated_handle_response_is_an_error() {
        let message = OidcMessage::new();
        let mut ctx = NotificationContext::new(&message);

        ctx.handle_response().unwrap();
        assert!(ctx.handle_response().is_err());
    }

    #[test]
    fn skip_then_handle_is_an_error() {
        let message = OidcMessage::new();
        let mut ctx = NotificationContext::new(&message);

        ctx.skip_to_next_middleware().unwrap();
        let err = ctx.handle_response().unwrap_err();
        assert_eq!(err.current, FlowControl::Skipped);
    }
}
