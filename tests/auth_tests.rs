//! Authentication tests: registration/login/logout end to end, the identity
//! verifier's session-first ordering, bearer-token fallback, and the
//! no-false-accept property of the password store.

use std::time::Duration;

use anyhow::Result;
use projektor::gateway::{Gateway, LoginInput, RegisterInput};
use projektor::identity::{IdentityVerifier, RequestCredentials, SessionManager, TokenSigner};
use projektor::storage::SharedStore;

// Argon2 with cheap parameters for the property sweep
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use password_hash::SaltString;
use rand::distributions::Alphanumeric;
use rand::Rng;

const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

fn gateway() -> Gateway {
    let sessions = SessionManager::in_memory(WEEK);
    let signer = TokenSigner::new("test-signing-secret", WEEK);
    Gateway::new(SharedStore::new(), IdentityVerifier::new(sessions, signer))
}

fn register_input(username: &str, email: &str, password: &str) -> RegisterInput {
    RegisterInput { username: username.into(), email: email.into(), password: password.into() }
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput { email: email.into(), password: password.into() }
}

fn session_creds(handle: &str) -> RequestCredentials {
    RequestCredentials { session_handle: Some(handle.into()), bearer: None }
}

fn bearer_creds(token: &str) -> RequestCredentials {
    RequestCredentials { session_handle: None, bearer: Some(token.into()) }
}

#[test]
fn register_then_login_succeeds_and_wrong_password_is_generic() -> Result<()> {
    let gw = gateway();
    let reg = gw.register(&register_input("alice", "a@x.com", "pw1"))?;
    assert_eq!(reg.user.username, "alice");

    let ok = gw.login(&login_input("a@x.com", "pw1"))?;
    assert_eq!(ok.user.id, reg.user.id);
    assert!(!ok.token.is_empty());
    assert!(!ok.session.handle.is_empty());

    let bad_password = gw.login(&login_input("a@x.com", "wrongpw")).unwrap_err();
    let unknown_email = gw.login(&login_input("nobody@x.com", "pw1")).unwrap_err();
    assert_eq!(bad_password.code_str(), "unauthenticated");
    assert_eq!(unknown_email.code_str(), "unauthenticated");
    // The two failure causes must be externally indistinguishable.
    assert_eq!(bad_password.public_message(), unknown_email.public_message());
    Ok(())
}

#[test]
fn registration_validates_fields_and_rejects_duplicates() -> Result<()> {
    let gw = gateway();
    let missing = gw.register(&register_input("", "a@x.com", "pw1")).unwrap_err();
    assert_eq!(missing.code_str(), "invalid_input");

    gw.register(&register_input("alice", "a@x.com", "pw1"))?;
    let dup_email = gw.register(&register_input("alice2", "a@x.com", "pw2")).unwrap_err();
    assert_eq!(dup_email.code_str(), "conflict");
    let dup_name = gw.register(&register_input("alice", "other@x.com", "pw2")).unwrap_err();
    assert_eq!(dup_name.code_str(), "conflict");
    // Email uniqueness is case-insensitive.
    let dup_case = gw.register(&register_input("alice3", "A@X.COM", "pw3")).unwrap_err();
    assert_eq!(dup_case.code_str(), "conflict");
    Ok(())
}

#[test]
fn bearer_token_authenticates_when_no_session_cookie_is_present() -> Result<()> {
    let gw = gateway();
    gw.register(&register_input("alice", "a@x.com", "pw1"))?;
    let login = gw.login(&login_input("a@x.com", "pw1"))?;

    assert!(gw.list_projects(&bearer_creds(&login.token)).is_ok());

    // Tampered and foreign-secret tokens collapse to the same rejection.
    let mut tampered = login.token.clone();
    tampered.push('x');
    assert_eq!(gw.list_projects(&bearer_creds(&tampered)).unwrap_err().code_str(), "unauthenticated");

    let foreign = TokenSigner::new("some-other-secret", WEEK);
    let user = gw.store.user_by_email("a@x.com")?.unwrap();
    let foreign_token = foreign.mint(&user)?;
    assert_eq!(gw.list_projects(&bearer_creds(&foreign_token)).unwrap_err().code_str(), "unauthenticated");

    // No credentials at all.
    assert_eq!(gw.list_projects(&RequestCredentials::default()).unwrap_err().code_str(), "unauthenticated");
    Ok(())
}

#[test]
fn destroyed_session_is_rejected_even_with_a_valid_token_alongside() -> Result<()> {
    let gw = gateway();
    gw.register(&register_input("alice", "a@x.com", "pw1"))?;
    let login = gw.login(&login_input("a@x.com", "pw1"))?;
    let handle = login.session.handle.clone();

    // Live session works without any token.
    assert!(gw.list_projects(&session_creds(&handle)).is_ok());

    gw.logout(&session_creds(&handle))?;
    // Logout is idempotent.
    gw.logout(&session_creds(&handle))?;

    // Dead handle alone: rejected.
    assert_eq!(gw.list_projects(&session_creds(&handle)).unwrap_err().code_str(), "unauthenticated");

    // Dead handle with a still-valid bearer token riding along: the session
    // cookie is authoritative and the token is never consulted.
    let both = RequestCredentials {
        session_handle: Some(handle.clone()),
        bearer: Some(login.token.clone()),
    };
    assert_eq!(gw.list_projects(&both).unwrap_err().code_str(), "unauthenticated");

    // The same token with no session cookie still authenticates.
    assert!(gw.list_projects(&bearer_creds(&login.token)).is_ok());
    Ok(())
}

#[test]
fn expired_session_cookie_is_rejected() -> Result<()> {
    let sessions = SessionManager::in_memory(Duration::ZERO);
    let signer = TokenSigner::new("test-signing-secret", WEEK);
    let gw = Gateway::new(SharedStore::new(), IdentityVerifier::new(sessions, signer));

    let reg = gw.register(&register_input("alice", "a@x.com", "pw1"))?;
    assert_eq!(gw.list_projects(&session_creds(&reg.session.handle)).unwrap_err().code_str(), "unauthenticated");
    Ok(())
}

#[test]
fn no_false_accept_across_random_candidates() -> Result<()> {
    // Cheap cost parameters keep 10k verifications fast; they travel inside
    // the PHC string, so verify_password honors them when parsing the hash.
    let params = Params::new(8, 1, 1, None).expect("params");
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::encode_b64(&[7u8; 16]).expect("salt");
    let phc = argon2
        .hash_password(b"the-real-password", &salt)
        .expect("hash")
        .to_string();

    assert!(projektor::security::verify_password(&phc, "the-real-password"));

    let mut rng = rand::thread_rng();
    for _ in 0..10_000 {
        let len = rng.gen_range(1..=24);
        let candidate: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        if candidate == "the-real-password" {
            continue;
        }
        assert!(
            !projektor::security::verify_password(&phc, &candidate),
            "false accept for candidate {:?}",
            candidate
        );
    }
    Ok(())
}
