use serde::Serialize;
use uuid::Uuid;

use crate::storage::User;

/// Authenticated identity attached to a request after verification.
/// Doubles as the public user summary in responses (no secret material).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self { id: user.id, username: user.username.clone(), email: user.email.clone() }
    }
}
