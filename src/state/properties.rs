// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Caller-supplied properties carried through the identity provider

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque bag of caller data round-tripped through the `state` parameter
///
/// Created by the caller before a challenge, recovered exactly once when the
/// matching response arrives. Never reused across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationProperties {
    /// Where the caller wants the user sent once sign-in completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,

    /// Extra caller data; opaque to the handler
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<String, String>,
}

impl AuthenticationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = Some(target.into());
        self
    }

    /// Store one item, replacing any previous value under `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }
}
