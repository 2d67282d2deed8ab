//! HTTP API server for integration with other systems.
//!
//! Each session is its own agent with its own history, guarded by its own
//! mutex, so turns in one session run one at a time while sessions proceed
//! independently. Idle sessions expire after `serve.session_ttl_secs` and at
//! most `serve.max_sessions` live at once.

use super::{converse_preflight, system_prompt};
use crate::agent::{Agent, ChatModel, Message, OpenAIChatModel, ToolInvocation};
use crate::cli::Output;
use crate::config::{AgentSettings, Settings};
use crate::error::MarqueeError;
use crate::tools::{builtin_registry, ToolRegistry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct SessionEntry {
    agent: Arc<Mutex<Agent>>,
    last_active: Instant,
}

/// Shared application state.
struct AppState {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    agent_settings: AgentSettings,
    system_prompt: String,
    session_ttl: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    fn new(
        model: Arc<dyn ChatModel>,
        registry: Arc<ToolRegistry>,
        settings: &Settings,
        system_prompt: String,
    ) -> Self {
        Self {
            model,
            registry,
            agent_settings: settings.agent.clone(),
            system_prompt,
            session_ttl: Duration::from_secs(settings.serve.session_ttl_secs),
            max_sessions: settings.serve.max_sessions,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn new_agent(&self) -> Agent {
        Agent::new(self.model.clone(), self.registry.clone())
            .with_settings(&self.agent_settings)
            .with_system_prompt(&self.system_prompt)
    }

    /// Look up a session and mark it active.
    async fn session(&self, id: Uuid) -> Option<Arc<Mutex<Agent>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_active = Instant::now();
        Some(entry.agent.clone())
    }

    /// Start a new session, or `None` when the limit is reached even after
    /// expiring idle sessions.
    async fn open_session(&self) -> Option<Uuid> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            retain_active(&mut sessions, self.session_ttl, now);
            if sessions.len() >= self.max_sessions {
                return None;
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                agent: Arc::new(Mutex::new(self.new_agent())),
                last_active: now,
            },
        );
        Some(id)
    }

    /// Drop sessions idle for longer than the TTL. Returns how many went.
    async fn expire_idle_sessions(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        retain_active(&mut sessions, self.session_ttl, now);
        before - sessions.len()
    }
}

fn retain_active(sessions: &mut HashMap<Uuid, SessionEntry>, ttl: Duration, now: Instant) {
    sessions.retain(|_, entry| now.saturating_duration_since(entry.last_active) < ttl);
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    converse_preflight(&settings)?;

    let state = Arc::new(AppState::new(
        Arc::new(OpenAIChatModel::from_settings(&settings)?),
        Arc::new(builtin_registry(&settings)?),
        &settings,
        system_prompt(&settings)?,
    ));

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticks.tick().await;
            let expired = sweeper.expire_idle_sessions(Instant::now()).await;
            if expired > 0 {
                info!("Expired {} idle sessions", expired);
            }
        }
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Marquee API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Tools", "GET    /tools");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Send message", "POST   /sessions/{id}/messages");
    Output::kv("History", "GET    /sessions/{id}/history");
    Output::kv("End session", "DELETE /sessions/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/messages", post(post_message))
        .route("/sessions/{id}/history", get(get_history))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Serialize)]
struct MessageResponse {
    answer: String,
    tool_calls: Vec<ToolInvocation>,
}

#[derive(Serialize)]
struct HistoryResponse {
    messages: Vec<Message>,
    tool_calls: Vec<ToolInvocation>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn session_not_found(id: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
}

/// HTTP status for a failed turn.
fn status_for(error: &MarqueeError) -> StatusCode {
    match error {
        MarqueeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MarqueeError::MaxIterationsExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MarqueeError::Network(_)
        | MarqueeError::RateLimit(_)
        | MarqueeError::Model(_)
        | MarqueeError::UnexpectedStatus { .. }
        | MarqueeError::InvalidResponse(_)
        | MarqueeError::UnknownTool(_)
        | MarqueeError::InvalidArguments { .. }
        | MarqueeError::ToolExecution { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<ToolInfo> = state
        .registry
        .list_specs()
        .iter()
        .map(|spec| ToolInfo {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.schema.to_json_schema(),
        })
        .collect();
    Json(tools)
}

async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    let Some(session_id) = state.open_session().await else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Too many active sessions (limit {})", state.max_sessions),
        );
    };

    info!("Created session {}", session_id);
    (StatusCode::CREATED, Json(SessionCreated { session_id })).into_response()
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let Some(session) = state.session(id).await else {
        return session_not_found(id);
    };

    let mut agent = session.lock().await;
    match agent.handle_user_message(&req.message).await {
        Ok(answer) => Json(MessageResponse {
            answer,
            tool_calls: agent
                .history()
                .last_turn_trace()
                .into_iter()
                .cloned()
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(status_for(&e), e.user_message()),
    }
}

async fn get_history(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    let Some(session) = state.session(id).await else {
        return session_not_found(id);
    };

    let agent = session.lock().await;
    Json(HistoryResponse {
        messages: agent.history().messages().to_vec(),
        tool_calls: agent.history().trace().to_vec(),
    })
    .into_response()
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            info!("Deleted session {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(id),
    }
}
