//!
//! projektor HTTP server
//! ---------------------
//! Axum-based HTTP API for the tracker.
//!
//! Responsibilities:
//! - Session cookie plumbing (set on register/login, cleared on logout).
//! - Credential extraction: session cookie, `token` cookie, or Authorization
//!   header (last whitespace-separated segment; the scheme prefix is
//!   discarded positionally, not validated).
//! - Thin handlers that delegate every operation to the resource gateway and
//!   map failures through `AppError`'s fixed status table.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::gateway::{
    AddCommentInput, AddMemberInput, CreateProjectInput, CreateTaskInput, Gateway, LoginInput,
    RegisterInput, UpdateProjectInput, UpdateTaskInput,
};
use crate::identity::{IdentityVerifier, RequestCredentials, SessionManager, TokenSigner};
use crate::storage::SharedStore;

const SESSION_COOKIE: &str = "projektor_session";
const TOKEN_COOKIE: &str = "token";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// Request-body extractor that reports deserialization failures through the
/// application error shape (400 `invalid_input`) instead of axum's default
/// rejection body.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::invalid(rejection.body_text())),
        }
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = parse_cookie(headers, TOKEN_COOKIE) {
        return Some(token);
    }
    let auth = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = auth.to_str().ok()?;
    s.split_whitespace().last().map(|t| t.to_string())
}

/// Extract both credential channels from the request headers.
pub fn request_credentials(headers: &HeaderMap) -> RequestCredentials {
    RequestCredentials {
        session_handle: parse_cookie(headers, SESSION_COOKIE),
        bearer: bearer_from_headers(headers),
    }
}

fn set_session_cookie(handle: &str, max_age: Duration) -> HeaderValue {
    // HttpOnly cookie scoped to the whole site; Max-Age matches session expiry
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, handle, max_age.as_secs()
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

// --- auth handlers ---

async fn register(State(state): State<AppState>, AppJson(payload): AppJson<RegisterInput>) -> AppResult<impl IntoResponse> {
    let out = state.gateway.register(&payload)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, set_session_cookie(&out.session.handle, state.gateway.verifier.sessions.ttl()));
    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({"message": "user registered", "userId": out.user.id})),
    ))
}

async fn login(State(state): State<AppState>, AppJson(payload): AppJson<LoginInput>) -> AppResult<impl IntoResponse> {
    let out = state.gateway.login(&payload)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, set_session_cookie(&out.session.handle, state.gateway.verifier.sessions.ttl()));
    Ok((
        StatusCode::OK,
        headers,
        Json(json!({"message": "login successful", "token": out.token, "user": out.user})),
    ))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    state.gateway.logout(&creds)?;
    let mut h = HeaderMap::new();
    h.insert(SET_COOKIE, clear_session_cookie());
    Ok((StatusCode::OK, h, Json(json!({"message": "logout successful"}))))
}

// --- project handlers ---

async fn list_projects(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let projects = state.gateway.list_projects(&creds)?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateProjectInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let project = state.gateway.create_project(&creds, &payload)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let (project, tasks) = state.gateway.get_project(&creds, id)?;
    Ok(Json(json!({"project": project, "tasks": tasks})))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProjectInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let project = state.gateway.update_project(&creds, id, &payload)?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    state.gateway.delete_project(&creds, id)?;
    Ok(Json(json!({"message": "project deleted"})))
}

async fn add_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<AddMemberInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let project = state.gateway.add_member(&creds, id, &payload)?;
    Ok(Json(json!({"message": "member added", "project": project})))
}

// --- task handlers ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksQuery {
    #[serde(default)]
    project_id: Option<Uuid>,
}

async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TasksQuery>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let Some(project_id) = query.project_id else {
        return Err(AppError::invalid("projectId is required"));
    };
    let tasks = state.gateway.list_tasks(&creds, project_id)?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateTaskInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let task = state.gateway.create_task(&creds, &payload)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let task = state.gateway.get_task(&creds, id)?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateTaskInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let task = state.gateway.update_task(&creds, id, &payload)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    state.gateway.delete_task(&creds, id)?;
    Ok(Json(json!({"message": "task deleted"})))
}

async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<AddCommentInput>,
) -> AppResult<impl IntoResponse> {
    let creds = request_credentials(&headers);
    let task = state.gateway.add_comment(&creds, id, &payload)?;
    Ok(Json(task))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "projektor ok" }))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project).put(update_project).delete(delete_project))
        .route("/api/projects/{id}/members", post(add_member))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/comments", post(add_comment))
        .with_state(state)
}

/// Start the HTTP server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = SharedStore::new();
    let sessions = SessionManager::in_memory(config.session_ttl);
    let signer = TokenSigner::new(&config.token_secret, config.token_ttl);
    let gateway = Gateway::new(store, IdentityVerifier::new(sessions, signer));
    let app = router(AppState { gateway });

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
