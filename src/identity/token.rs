//! Bearer credentials: self-contained signed claims, stateless after minting.
//! There is no revocation list; a credential is valid until natural expiry.

use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity id.
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier over a process-wide shared secret, injected at
/// construction and rotatable independently of the session store.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn mint(&self, user: &User) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verified claims, or `None` for any failure: bad signature, malformed
    /// structure, or expiry. Callers never learn which.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}
