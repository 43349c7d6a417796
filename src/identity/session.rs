//! Session Authority: issues, resolves, and destroys server-side session
//! handles. The backing store sits behind `SessionStore` so an in-memory map,
//! a cache, or a database can carry the same contract.
//!
//! Handle lifecycle: Active -> Expired (checked lazily on resolve) or
//! Active -> Destroyed (explicit). Both are terminal and resolve to `None`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::storage::StoreFault;

pub type SessionHandle = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub handle: SessionHandle,
    pub user_id: Uuid,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

/// Keyed session storage. `remove` reports whether the handle existed; only a
/// genuine storage failure surfaces as `StoreFault`.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: Session) -> Result<(), StoreFault>;
    fn get(&self, handle: &str) -> Result<Option<Session>, StoreFault>;
    fn remove(&self, handle: &str) -> Result<Option<Session>, StoreFault>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore for MemorySessionStore {
    fn insert(&self, session: Session) -> Result<(), StoreFault> {
        let mut sessions = self.sessions.write();
        // Sweep expired entries on insert so abandoned handles cannot
        // accumulate; resolve only drops the one handle it is asked about.
        let now = Instant::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.handle.clone(), session);
        Ok(())
    }

    fn get(&self, handle: &str) -> Result<Option<Session>, StoreFault> {
        Ok(self.sessions.read().get(handle).cloned())
    }

    fn remove(&self, handle: &str) -> Result<Option<Session>, StoreFault> {
        Ok(self.sessions.write().remove(handle))
    }
}

fn gen_handle() -> Result<SessionHandle, StoreFault> {
    // 256-bit random handle, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)
        .map_err(|e| StoreFault::Unavailable(format!("system rng: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemorySessionStore::default()), ttl)
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Create a fresh handle bound to `user_id`. Multiple live handles per
    /// user are allowed (multi-device).
    pub fn issue(&self, user_id: Uuid) -> Result<Session, StoreFault> {
        let now = Instant::now();
        let sess = Session {
            handle: gen_handle()?,
            user_id,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert(sess.clone())?;
        debug!(target: "session", "session.issue user={} ttl_secs={}", user_id, self.ttl.as_secs());
        Ok(sess)
    }

    /// Bound identity iff the handle exists and is unexpired. Expired handles
    /// are dropped here rather than by a background sweeper.
    pub fn resolve(&self, handle: &str) -> Result<Option<Uuid>, StoreFault> {
        let Some(sess) = self.store.get(handle)? else { return Ok(None) };
        if sess.expires_at > Instant::now() {
            return Ok(Some(sess.user_id));
        }
        self.store.remove(handle)?;
        Ok(None)
    }

    /// Invalidate the handle. Destroying an unknown or already-destroyed
    /// handle is a successful no-op (`Ok(false)`).
    pub fn destroy(&self, handle: &str) -> Result<bool, StoreFault> {
        let removed = self.store.remove(handle)?;
        if let Some(sess) = &removed {
            debug!(target: "session", "session.destroy user={}", sess.user_id);
        }
        Ok(removed.is_some())
    }
}
