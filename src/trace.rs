// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Structured trace emission for the authentication state machine
//!
//! Every state transition and terminal outcome produces a [`LogEntry`] with a
//! stable [`EventId`], so external observers (tests, telemetry, consoles) can
//! assert the exact decision sequence a message went through. Entries are
//! delivered to a [`TraceSink`] capability; the crate ships a sink forwarding
//! to the `log` facade and an in-memory capturing sink for tests.
//!
//! There is no global logger registry: a [`Tracer`] is handed to the handler
//! explicitly, and level filtering is the pure function [`level_enabled`].

use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter};

/// Stable identifiers for every observable state-machine event
///
/// The numeric discriminants are part of the crate's observable contract and
/// must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventId {
    MessageReceivedEntered = 1,
    MessageReceivedHandled = 2,
    MessageReceivedSkipped = 3,
    MessageReceivedPassed = 4,
    ProtocolErrorReceived = 5,
    StateMissing = 6,
    StatelessAccepted = 7,
    StateInvalid = 8,
    StateValidated = 9,
    AuthorizationCodeEntered = 10,
    AuthorizationCodeHandled = 11,
    AuthorizationCodeSkipped = 12,
    AuthorizationCodePassed = 13,
    SecurityTokenEntered = 14,
    SecurityTokenHandled = 15,
    SecurityTokenSkipped = 16,
    SecurityTokenPassed = 17,
    TokenValidationFailed = 18,
    SecurityTokenValidatedEntered = 19,
    SecurityTokenValidatedHandled = 20,
    SecurityTokenValidatedSkipped = 21,
    SecurityTokenValidatedPassed = 22,
    AuthenticationSuccess = 23,
    NotificationFailed = 24,
    ChallengeIssued = 25,
    RedirectHandled = 26,
}

impl EventId {
    /// Numeric identifier, stable across releases
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Immutable record of one state-machine event
///
/// Produced by the state machine, never mutated after creation, consumed
/// only by sinks.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Stable event identifier
    pub event: EventId,

    /// Severity of the event
    pub level: Level,

    /// Preformatted, human-readable description
    pub message: String,

    /// Human-readable source error, for failure events
    pub error: Option<String>,
}

/// Decide whether an event at `level` passes a configured minimum
///
/// Pure function of its two inputs; `LevelFilter::Off` suppresses everything.
pub fn level_enabled(min: LevelFilter, level: Level) -> bool {
    level <= min
}

/// Destination for emitted entries
///
/// Sinks consume entries without modification. Implementations must be safe
/// for concurrent use: multiple in-flight authentications share one sink.
pub trait TraceSink: Send + Sync {
    fn emit(&self, entry: &LogEntry);
}

/// Sink forwarding entries to the `log` crate facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeSink;

impl TraceSink for LogFacadeSink {
    fn emit(&self, entry: &LogEntry) {
        match &entry.error {
            Some(error) => log::log!(
                target: "rust_oidc",
                entry.level,
                "[{}] {}: {}",
                entry.event.code(),
                entry.message,
                error
            ),
            None => log::log!(
                target: "rust_oidc",
                entry.level,
                "[{}] {}",
                entry.event.code(),
                entry.message
            ),
        }
    }
}

/// Sink capturing entries in memory so tests can assert emission order
#[derive(Debug, Default)]
pub struct CaptureSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything captured so far, in emission order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Event identifiers only, in emission order
    pub fn events(&self) -> Vec<EventId> {
        self.entries.lock().unwrap().iter().map(|e| e.event).collect()
    }
}

impl TraceSink for CaptureSink {
    fn emit(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

/// Level-filtered trace emitter shared by one handler
///
/// Cloning shares the underlying sink.
#[derive(Clone)]
pub struct Tracer {
    min_level: LevelFilter,
    sink: Arc<dyn TraceSink>,
}

impl Tracer {
    pub fn new(min_level: LevelFilter, sink: Arc<dyn TraceSink>) -> Self {
        Tracer { min_level, sink }
    }

    /// Tracer forwarding everything at `Debug` and above to the `log` facade
    pub fn to_log_facade() -> Self {
        Tracer::new(LevelFilter::Debug, Arc::new(LogFacadeSink))
    }

    pub(crate) fn emit(&self, event: EventId, level: Level, message: impl Into<String>) {
        self.entry(event, level, message.into(), None);
    }

    pub(crate) fn emit_error(
        &self,
        event: EventId,
        level: Level,
        message: impl Into<String>,
        error: impl std::fmt::Display,
    ) {
        self.entry(event, level, message.into(), Some(error.to_string()));
    }

    fn entry(&self, event: EventId, level: Level, message: String, error: Option<String>) {
        if !level_enabled(self.min_level, level) {
            return;
        }
        self.sink.emit(&LogEntry {
            event,
            level,
            message,
            error,
        });
    }
}
