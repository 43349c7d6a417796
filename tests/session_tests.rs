//! Session Authority tests: issue/resolve/destroy lifecycle, lazy expiry,
//! idempotent destruction, and multi-device handles.

use std::time::{Duration, Instant};

use projektor::identity::{MemorySessionStore, Session, SessionManager, SessionStore};
use uuid::Uuid;

const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

#[test]
fn issued_handle_resolves_to_the_same_identity_until_destroyed() {
    let sessions = SessionManager::in_memory(WEEK);
    let user = Uuid::new_v4();
    let sess = sessions.issue(user).unwrap();

    assert_eq!(sessions.resolve(&sess.handle).unwrap(), Some(user));
    assert_eq!(sessions.resolve(&sess.handle).unwrap(), Some(user), "resolve must be repeatable");

    assert!(sessions.destroy(&sess.handle).unwrap(), "first destroy removes the handle");
    assert_eq!(sessions.resolve(&sess.handle).unwrap(), None);
    assert_eq!(sessions.resolve(&sess.handle).unwrap(), None, "destroyed is terminal");
}

#[test]
fn destroy_is_an_idempotent_no_op_for_unknown_handles() {
    let sessions = SessionManager::in_memory(WEEK);
    // Never-issued handle: success, not a fault.
    assert!(!sessions.destroy("no-such-handle").unwrap());

    let sess = sessions.issue(Uuid::new_v4()).unwrap();
    assert!(sessions.destroy(&sess.handle).unwrap());
    assert!(!sessions.destroy(&sess.handle).unwrap(), "second destroy is Ok(false)");
}

#[test]
fn expired_handle_resolves_to_none_and_stays_dead() {
    // Zero TTL: the handle is already expired by the time it is resolved.
    let sessions = SessionManager::in_memory(Duration::ZERO);
    let sess = sessions.issue(Uuid::new_v4()).unwrap();

    assert_eq!(sessions.resolve(&sess.handle).unwrap(), None);
    assert_eq!(sessions.resolve(&sess.handle).unwrap(), None, "expired is terminal");
    // Expiry already dropped it; destroying afterwards is the no-op path.
    assert!(!sessions.destroy(&sess.handle).unwrap());
}

#[test]
fn multiple_concurrent_handles_per_identity_are_permitted() {
    let sessions = SessionManager::in_memory(WEEK);
    let user = Uuid::new_v4();
    let a = sessions.issue(user).unwrap();
    let b = sessions.issue(user).unwrap();
    assert_ne!(a.handle, b.handle);

    assert_eq!(sessions.resolve(&a.handle).unwrap(), Some(user));
    assert_eq!(sessions.resolve(&b.handle).unwrap(), Some(user));

    // Destroying one device's handle leaves the other alive.
    assert!(sessions.destroy(&a.handle).unwrap());
    assert_eq!(sessions.resolve(&a.handle).unwrap(), None);
    assert_eq!(sessions.resolve(&b.handle).unwrap(), Some(user));
}

#[test]
fn handles_are_full_length_and_never_repeat() {
    let sessions = SessionManager::in_memory(WEEK);
    let a = sessions.issue(Uuid::new_v4()).unwrap();
    let b = sessions.issue(Uuid::new_v4()).unwrap();
    // 32 random bytes as unpadded base64url: always 43 characters.
    assert_eq!(a.handle.len(), 43);
    assert_eq!(b.handle.len(), 43);
    assert_ne!(a.handle, b.handle);
}

#[test]
fn insert_sweeps_expired_sessions_from_the_store() {
    let store = MemorySessionStore::default();
    let now = Instant::now();
    store
        .insert(Session {
            handle: "dead".into(),
            user_id: Uuid::new_v4(),
            issued_at: now,
            expires_at: now,
        })
        .unwrap();

    // Inserting a live session evicts the expired one without it ever being
    // resolved by its own handle.
    store
        .insert(Session {
            handle: "live".into(),
            user_id: Uuid::new_v4(),
            issued_at: now,
            expires_at: now + WEEK,
        })
        .unwrap();

    assert!(store.get("dead").unwrap().is_none());
    assert!(store.get("live").unwrap().is_some());
}
