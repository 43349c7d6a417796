//! Central identity handling: who the caller is and how that is proven.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod token;
mod verifier;

pub use principal::Principal;
pub use session::{MemorySessionStore, Session, SessionHandle, SessionManager, SessionStore};
pub use token::{Claims, TokenSigner};
pub use verifier::{IdentityVerifier, RequestCredentials};
