//! Identity Verifier: turns per-request credential material into an
//! authenticated `Principal`, or a single indistinguishable rejection.
//!
//! Order is fixed: a session cookie, when present, is authoritative — a
//! handle that no longer resolves fails the request without consulting any
//! bearer credential that may also be present. Only a request with no session
//! cookie at all falls through to the token path.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::storage::SharedStore;

use super::principal::Principal;
use super::session::SessionManager;
use super::token::TokenSigner;

/// Credential material extracted from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    /// Session handle from the session cookie, if any.
    pub session_handle: Option<String>,
    /// Raw bearer credential from the `token` cookie or Authorization header.
    pub bearer: Option<String>,
}

#[derive(Clone)]
pub struct IdentityVerifier {
    pub sessions: SessionManager,
    pub signer: Arc<TokenSigner>,
}

impl IdentityVerifier {
    pub fn new(sessions: SessionManager, signer: TokenSigner) -> Self {
        Self { sessions, signer: Arc::new(signer) }
    }

    pub fn authenticate(&self, store: &SharedStore, creds: &RequestCredentials) -> AppResult<Principal> {
        if let Some(handle) = &creds.session_handle {
            let Some(user_id) = self.sessions.resolve(handle)? else {
                return Err(AppError::unauthenticated());
            };
            let Some(user) = store.user(user_id)? else {
                // Identity deleted out from under a live session: the session
                // is invalidated rather than blocking the deletion.
                return Err(AppError::unauthenticated());
            };
            return Ok(Principal::from(&user));
        }

        let Some(raw) = &creds.bearer else {
            return Err(AppError::unauthenticated());
        };
        let Some(claims) = self.signer.verify(raw) else {
            return Err(AppError::unauthenticated());
        };
        let Some(user) = store.user(claims.sub)? else {
            return Err(AppError::unauthenticated());
        };
        Ok(Principal::from(&user))
    }
}
