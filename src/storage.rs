//!
//! projektor storage module
//! ------------------------
//! In-memory persistence collaborator holding the three entity families:
//! users (with unique email/username indexes), projects, and tasks. The store
//! serializes conflicting writes on its own lock; callers above it perform no
//! locking of their own. Every method returns `Result<_, StoreFault>` so the
//! fault path keeps a distinct type even though this backend cannot fail —
//! a database-backed implementation slots in behind the same signatures.
//!
//! Project listings for a user are derived from the ownership/membership
//! records at read time. There is no denormalized user → projects
//! back-reference to drift out of sync with the member lists.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Failure of the backing store itself, as opposed to "row not found".
#[derive(Debug, thiserror::Error)]
pub enum StoreFault {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; never serialized, never retrievable in plaintext.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Uuid,
    /// Set semantics: no duplicates, and never contains the owner.
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Parent project; task access is always evaluated against it.
    pub project: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreInner {
    users: HashMap<Uuid, User>,
    /// Lowercased email -> user id.
    users_by_email: HashMap<String, Uuid>,
    /// Lowercased username -> user id.
    users_by_name: HashMap<String, Uuid>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

/// Thread-safe store handle shared across requests.
#[derive(Clone, Default)]
pub struct SharedStore(Arc<RwLock<StoreInner>>);

impl SharedStore {
    pub fn new() -> Self { Self::default() }

    // --- users ---

    /// Insert a user iff neither the email nor the username is taken.
    /// The check and the insert happen under one write lock.
    pub fn insert_user(&self, user: User) -> Result<bool, StoreFault> {
        let mut inner = self.0.write();
        let email_key = user.email.to_lowercase();
        let name_key = user.username.to_lowercase();
        if inner.users_by_email.contains_key(&email_key) || inner.users_by_name.contains_key(&name_key) {
            return Ok(false);
        }
        inner.users_by_email.insert(email_key, user.id);
        inner.users_by_name.insert(name_key, user.id);
        inner.users.insert(user.id, user);
        Ok(true)
    }

    pub fn user(&self, id: Uuid) -> Result<Option<User>, StoreFault> {
        Ok(self.0.read().users.get(&id).cloned())
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreFault> {
        let inner = self.0.read();
        Ok(inner
            .users_by_email
            .get(&email.to_lowercase())
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    // --- projects ---

    pub fn insert_project(&self, project: Project) -> Result<(), StoreFault> {
        self.0.write().projects.insert(project.id, project);
        Ok(())
    }

    pub fn project(&self, id: Uuid) -> Result<Option<Project>, StoreFault> {
        Ok(self.0.read().projects.get(&id).cloned())
    }

    /// All projects the user owns or is a member of, oldest first.
    pub fn projects_for(&self, user_id: Uuid) -> Result<Vec<Project>, StoreFault> {
        let inner = self.0.read();
        let mut out: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| p.owner == user_id || p.members.contains(&user_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    /// Apply `f` to the project under the write lock; `None` when the id no
    /// longer resolves. Conditional mutations return their verdict through `R`.
    pub fn update_project<R>(&self, id: Uuid, f: impl FnOnce(&mut Project) -> R) -> Result<Option<R>, StoreFault> {
        let mut inner = self.0.write();
        Ok(inner.projects.get_mut(&id).map(f))
    }

    /// Remove the project and every task that belonged to it.
    pub fn remove_project(&self, id: Uuid) -> Result<Option<Project>, StoreFault> {
        let mut inner = self.0.write();
        let removed = inner.projects.remove(&id);
        if removed.is_some() {
            inner.tasks.retain(|_, t| t.project != id);
        }
        Ok(removed)
    }

    // --- tasks ---

    pub fn insert_task(&self, task: Task) -> Result<(), StoreFault> {
        self.0.write().tasks.insert(task.id, task);
        Ok(())
    }

    pub fn task(&self, id: Uuid) -> Result<Option<Task>, StoreFault> {
        Ok(self.0.read().tasks.get(&id).cloned())
    }

    pub fn tasks_for_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreFault> {
        let inner = self.0.read();
        let mut out: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.project == project_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    pub fn update_task<R>(&self, id: Uuid, f: impl FnOnce(&mut Task) -> R) -> Result<Option<R>, StoreFault> {
        let mut inner = self.0.write();
        Ok(inner.tasks.get_mut(&id).map(f))
    }

    pub fn remove_task(&self, id: Uuid) -> Result<Option<Task>, StoreFault> {
        Ok(self.0.write().tasks.remove(&id))
    }
}
