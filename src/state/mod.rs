// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Round-tripped authentication state
//!
//! The relying party sends caller-supplied [`AuthenticationProperties`]
//! through the identity provider inside the `state` parameter and recovers
//! them, tamper-checked, when the response comes back. The protection itself
//! is the swappable [`StateCodec`] capability; the wire format around it is
//! fixed by this crate.

mod codec;
mod properties;

pub use codec::{
    compose_state_parameter, split_state_parameter, JwtStateCodec, StateCodec, StateCodecError,
    STATE_KEY,
};
pub use properties::AuthenticationProperties;

#[cfg(test)]
pub use codec::MockStateCodec;
