//! Resource Gateway: the single entry point for every operation on users,
//! projects, and tasks. Each operation runs the same strictly ordered
//! sequence — authenticate, load, existence check, policy check, execute —
//! and any failing step short-circuits the rest. Existence is checked before
//! access on purpose: an unresolvable id is a 404, a resolvable one the
//! caller may not touch is a 403.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access::{can_access, ProjectOp};
use crate::error::{AppError, AppResult};
use crate::identity::{IdentityVerifier, Principal, RequestCredentials, Session};
use crate::security;
use crate::storage::{Comment, Project, SharedStore, Task, TaskPriority, TaskStatus, User};

#[derive(Clone)]
pub struct Gateway {
    pub store: SharedStore,
    pub verifier: IdentityVerifier,
}

// Required string fields default to empty and are validated here rather than
// rejected by the deserializer, so a missing field reports as a 400 with the
// same message as an empty one.

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

// Maps a field that was present in the body to Some(parsed value), so a
// combined `#[serde(default)]` distinguishes an absent field (None) from an
// explicit null (Some(None)). Nullable task fields need the distinction:
// `"assignedTo": null` clears the assignee, omitting it leaves it unchanged.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberInput {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentInput {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug)]
pub struct RegisterOutcome {
    pub session: Session,
    pub user: Principal,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub session: Session,
    pub token: String,
    pub user: Principal,
}

impl Gateway {
    pub fn new(store: SharedStore, verifier: IdentityVerifier) -> Self {
        Self { store, verifier }
    }

    fn authenticate(&self, creds: &RequestCredentials) -> AppResult<Principal> {
        self.verifier.authenticate(&self.store, creds)
    }

    // --- auth operations ---

    pub fn register(&self, input: &RegisterInput) -> AppResult<RegisterOutcome> {
        let username = input.username.trim();
        let email = input.email.trim();
        if username.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(AppError::invalid("username, email and password are required"));
        }
        let password_hash = security::hash_password(&input.password)?;
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        if !self.store.insert_user(user.clone())? {
            return Err(AppError::conflict("user already exists"));
        }
        let session = self.verifier.sessions.issue(user.id)?;
        info!(target: "auth", "auth.register user={} username={}", user.id, user.username);
        Ok(RegisterOutcome { session, user: Principal::from(&user) })
    }

    pub fn login(&self, input: &LoginInput) -> AppResult<LoginOutcome> {
        let email = input.email.trim();
        if email.is_empty() || input.password.is_empty() {
            return Err(AppError::invalid("email and password are required"));
        }
        // Unknown email and wrong password must stay indistinguishable.
        let Some(user) = self.store.user_by_email(email)? else {
            return Err(AppError::unauthenticated());
        };
        if !security::verify_password(&user.password_hash, &input.password) {
            return Err(AppError::unauthenticated());
        }
        let token = self.verifier.signer.mint(&user)?;
        let session = self.verifier.sessions.issue(user.id)?;
        info!(target: "auth", "auth.login user={}", user.id);
        Ok(LoginOutcome { session, token, user: Principal::from(&user) })
    }

    /// Destroy the presented session handle, if any. Idempotent: an absent or
    /// already-dead handle is still a successful logout.
    pub fn logout(&self, creds: &RequestCredentials) -> AppResult<()> {
        if let Some(handle) = &creds.session_handle {
            if self.verifier.sessions.destroy(handle)? {
                info!(target: "auth", "auth.logout");
            }
        }
        Ok(())
    }

    // --- project operations ---

    pub fn list_projects(&self, creds: &RequestCredentials) -> AppResult<Vec<Project>> {
        let who = self.authenticate(creds)?;
        Ok(self.store.projects_for(who.id)?)
    }

    pub fn create_project(&self, creds: &RequestCredentials, input: &CreateProjectInput) -> AppResult<Project> {
        let who = self.authenticate(creds)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid("project name is required"));
        }
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: input.description.clone().unwrap_or_default(),
            owner: who.id,
            members: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.insert_project(project.clone())?;
        info!(target: "project", "project.create id={} owner={}", project.id, who.id);
        Ok(project)
    }

    /// Shared prefix of every project-scoped operation: load, existence
    /// check, then the policy table.
    fn authorize_project(&self, who: &Principal, id: Uuid, op: ProjectOp) -> AppResult<Project> {
        let Some(project) = self.store.project(id)? else {
            return Err(AppError::not_found("project not found"));
        };
        if !can_access(who.id, &project, op) {
            return Err(AppError::forbidden("access denied"));
        }
        Ok(project)
    }

    pub fn get_project(&self, creds: &RequestCredentials, id: Uuid) -> AppResult<(Project, Vec<Task>)> {
        let who = self.authenticate(creds)?;
        let project = self.authorize_project(&who, id, ProjectOp::Read)?;
        let tasks = self.store.tasks_for_project(id)?;
        Ok((project, tasks))
    }

    pub fn update_project(&self, creds: &RequestCredentials, id: Uuid, input: &UpdateProjectInput) -> AppResult<Project> {
        let who = self.authenticate(creds)?;
        self.authorize_project(&who, id, ProjectOp::Update)?;
        let updated = self.store.update_project(id, |p| {
            if let Some(name) = &input.name {
                let name = name.trim();
                if !name.is_empty() {
                    p.name = name.to_string();
                }
            }
            if let Some(description) = &input.description {
                p.description = description.clone();
            }
            p.clone()
        })?;
        updated.ok_or_else(|| AppError::not_found("project not found"))
    }

    pub fn delete_project(&self, creds: &RequestCredentials, id: Uuid) -> AppResult<()> {
        let who = self.authenticate(creds)?;
        self.authorize_project(&who, id, ProjectOp::Delete)?;
        self.store.remove_project(id)?;
        info!(target: "project", "project.delete id={} by={}", id, who.id);
        Ok(())
    }

    pub fn add_member(&self, creds: &RequestCredentials, id: Uuid, input: &AddMemberInput) -> AppResult<Project> {
        let who = self.authenticate(creds)?;
        self.authorize_project(&who, id, ProjectOp::AddMember)?;
        let email = input.email.trim();
        if email.is_empty() {
            return Err(AppError::invalid("member email is required"));
        }
        let Some(user) = self.store.user_by_email(email)? else {
            return Err(AppError::not_found("user not found"));
        };
        // Membership check and insert run as one critical section, so two
        // concurrent adds of the same user cannot both pass the check.
        let verdict = self.store.update_project(id, |p| {
            if p.owner == user.id || p.members.contains(&user.id) {
                Err(())
            } else {
                p.members.push(user.id);
                Ok(p.clone())
            }
        })?;
        match verdict {
            None => Err(AppError::not_found("project not found")),
            Some(Err(())) => Err(AppError::conflict("user is already a member")),
            Some(Ok(project)) => {
                info!(target: "project", "project.add_member project={} member={}", id, user.id);
                Ok(project)
            }
        }
    }

    // --- task operations ---

    /// Task access is transitive: every task operation requires read access
    /// to the parent project, whatever the task-level fields say.
    fn authorize_task(&self, who: &Principal, id: Uuid) -> AppResult<Task> {
        let Some(task) = self.store.task(id)? else {
            return Err(AppError::not_found("task not found"));
        };
        let Some(project) = self.store.project(task.project)? else {
            // Parent gone means the task is unreachable, not world-readable.
            return Err(AppError::not_found("task not found"));
        };
        if !can_access(who.id, &project, ProjectOp::Read) {
            return Err(AppError::forbidden("access denied"));
        }
        Ok(task)
    }

    pub fn list_tasks(&self, creds: &RequestCredentials, project_id: Uuid) -> AppResult<Vec<Task>> {
        let who = self.authenticate(creds)?;
        self.authorize_project(&who, project_id, ProjectOp::Read)?;
        Ok(self.store.tasks_for_project(project_id)?)
    }

    pub fn create_task(&self, creds: &RequestCredentials, input: &CreateTaskInput) -> AppResult<Task> {
        let who = self.authenticate(creds)?;
        let title = input.title.trim();
        let Some(project_id) = input.project_id else {
            return Err(AppError::invalid("title and projectId are required"));
        };
        if title.is_empty() {
            return Err(AppError::invalid("title and projectId are required"));
        }
        self.authorize_project(&who, project_id, ProjectOp::Read)?;
        let task = Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: input.description.clone().unwrap_or_default(),
            project: project_id,
            status: TaskStatus::Todo,
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            due_date: input.due_date,
            assigned_to: input.assigned_to,
            created_by: who.id,
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.insert_task(task.clone())?;
        info!(target: "task", "task.create id={} project={} by={}", task.id, project_id, who.id);
        Ok(task)
    }

    pub fn get_task(&self, creds: &RequestCredentials, id: Uuid) -> AppResult<Task> {
        let who = self.authenticate(creds)?;
        self.authorize_task(&who, id)
    }

    pub fn update_task(&self, creds: &RequestCredentials, id: Uuid, input: &UpdateTaskInput) -> AppResult<Task> {
        let who = self.authenticate(creds)?;
        self.authorize_task(&who, id)?;
        let updated = self.store.update_task(id, |t| {
            if let Some(title) = &input.title {
                let title = title.trim();
                if !title.is_empty() {
                    t.title = title.to_string();
                }
            }
            if let Some(description) = &input.description {
                t.description = description.clone();
            }
            if let Some(assigned_to) = input.assigned_to {
                t.assigned_to = assigned_to;
            }
            if let Some(status) = input.status {
                t.status = status;
            }
            if let Some(priority) = input.priority {
                t.priority = priority;
            }
            if let Some(due_date) = input.due_date {
                t.due_date = due_date;
            }
            t.clone()
        })?;
        updated.ok_or_else(|| AppError::not_found("task not found"))
    }

    pub fn delete_task(&self, creds: &RequestCredentials, id: Uuid) -> AppResult<()> {
        let who = self.authenticate(creds)?;
        self.authorize_task(&who, id)?;
        self.store.remove_task(id)?;
        info!(target: "task", "task.delete id={} by={}", id, who.id);
        Ok(())
    }

    pub fn add_comment(&self, creds: &RequestCredentials, id: Uuid, input: &AddCommentInput) -> AppResult<Task> {
        let who = self.authenticate(creds)?;
        let text = input.text.trim();
        if text.is_empty() {
            return Err(AppError::invalid("comment text is required"));
        }
        self.authorize_task(&who, id)?;
        let comment = Comment { author: who.id, text: text.to_string(), created_at: Utc::now() };
        let updated = self.store.update_task(id, |t| {
            t.comments.push(comment);
            t.clone()
        })?;
        updated.ok_or_else(|| AppError::not_found("task not found"))
    }
}
