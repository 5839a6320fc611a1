// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 state tokens.
//!
//! A state token binds a platform user ID to the authorization round trip:
//!
//! ```text
//! hex( user_id_le[8] || HMAC-SHA256(secret, user_id_le)[32] )
//! ```
//!
//! Tokens carry no issuance time and no nonce. The same user ID always
//! yields the same token, which stays valid for as long as the secret does.
//! A leaked token only lets its holder complete the OAuth2 exchange on
//! behalf of that user ID; it grants nothing by itself.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ID_LEN: usize = 8;
const TAG_LEN: usize = 32;

/// Decoded length of every valid token.
pub const TOKEN_LEN: usize = ID_LEN + TAG_LEN;

/// Every verification failure collapses into this single error so callers
/// cannot tell a malformed token from a forged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid token.")]
pub struct InvalidToken;

/// Issues and verifies HMAC-protected state tokens.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret.as_ref())
                .expect("HMAC accepts keys of any length"),
        }
    }

    /// Issue the state token for a platform user.
    pub fn issue(&self, platform_user_id: u64) -> String {
        let id_bytes = platform_user_id.to_le_bytes();
        let mut mac = self.mac.clone();
        mac.update(&id_bytes);

        let mut token = Vec::with_capacity(TOKEN_LEN);
        token.extend_from_slice(&id_bytes);
        token.extend_from_slice(&mac.finalize().into_bytes());
        hex::encode(token)
    }

    /// Verify a state token and recover the platform user ID bound to it.
    pub fn verify(&self, token: &str) -> Result<u64, InvalidToken> {
        let raw = hex::decode(token).map_err(|_| InvalidToken)?;
        if raw.len() != TOKEN_LEN {
            return Err(InvalidToken);
        }
        let (id_bytes, tag) = raw.split_at(ID_LEN);

        let mut mac = self.mac.clone();
        mac.update(id_bytes);
        // verify_slice compares in constant time
        mac.verify_slice(tag).map_err(|_| InvalidToken)?;

        let id_bytes: [u8; ID_LEN] = id_bytes.try_into().map_err(|_| InvalidToken)?;
        Ok(u64::from_le_bytes(id_bytes))
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
