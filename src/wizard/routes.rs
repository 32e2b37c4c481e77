//! REST endpoints through which a rendering layer drives wizards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::StepError;

use super::manager::{SubmitOutcome, WizardOrchestrator, WizardSnapshot};
use super::model::Field;
use super::submission::RelaySink;

/// How often the expiry task looks for idle wizards.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A mounted wizard and the last time a request reached it.
struct Mounted {
    wizard: Arc<WizardOrchestrator>,
    touched: Instant,
}

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub config: Arc<WizardConfig>,
    pub sink: Arc<dyn RelaySink>,
    sessions: Arc<RwLock<HashMap<Uuid, Mounted>>>,
}

impl WizardRouteState {
    pub fn new(config: WizardConfig, sink: Arc<dyn RelaySink>) -> Self {
        Self {
            config: Arc::new(config),
            sink,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of mounted wizards.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Unmount every wizard no request has reached for at least `max_idle`.
    /// Dropping the orchestrator stops its countdown and delayed show.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, mounted| {
            let keep = mounted.touched.elapsed() < max_idle;
            if !keep {
                tracing::info!(session = %id, "Idle wizard expired");
            }
            keep
        });
        before - sessions.len()
    }

    async fn insert(&self, wizard: Arc<WizardOrchestrator>) {
        let mounted = Mounted {
            wizard: Arc::clone(&wizard),
            touched: Instant::now(),
        };
        self.sessions.write().await.insert(wizard.id(), mounted);
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Fetch a wizard and mark it as recently used.
    async fn touch(&self, id: Uuid) -> Option<Arc<WizardOrchestrator>> {
        let mut sessions = self.sessions.write().await;
        let mounted = sessions.get_mut(&id)?;
        mounted.touched = Instant::now();
        Some(Arc::clone(&mounted.wizard))
    }
}

/// Spawn a background task that unmounts wizards idle for `max_idle`.
pub fn spawn_expiry_task(state: WizardRouteState, max_idle: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL.min(max_idle));
        loop {
            interval.tick().await;
            state.expire_idle(max_idle).await;
        }
    })
}

/// Body of every wizard response.
#[derive(Debug, Serialize)]
struct WizardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    wizard: WizardSnapshot,
}

#[derive(Debug, Deserialize)]
struct FieldInput {
    #[serde(default)]
    value: String,
}

fn respond(status: StatusCode, error: Option<String>, wizard: WizardSnapshot) -> Response {
    (status, Json(WizardResponse { error, wizard })).into_response()
}

fn not_found(what: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": what })),
    )
        .into_response()
}

async fn lookup(state: &WizardRouteState, id: Uuid) -> Result<Arc<WizardOrchestrator>, Response> {
    state
        .touch(id)
        .await
        .ok_or_else(|| not_found(format!("No wizard with id {id}")))
}

/// POST /api/wizard
///
/// Mounts a new wizard and returns its first snapshot.
async fn create(State(state): State<WizardRouteState>) -> Response {
    let wizard = Arc::new(WizardOrchestrator::mount(
        &state.config,
        Arc::clone(&state.sink),
    ));
    let snapshot = wizard.snapshot().await;
    state.insert(wizard).await;
    respond(StatusCode::CREATED, None, snapshot)
}

/// GET /api/wizard/{id}
async fn show(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    match lookup(&state, id).await {
        Ok(wizard) => respond(StatusCode::OK, None, wizard.snapshot().await),
        Err(resp) => resp,
    }
}

/// DELETE /api/wizard/{id}
///
/// Unmounts the wizard, which stops its timers.
async fn unmount(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    if state.remove(id).await {
        tracing::info!(session = %id, "Wizard unmounted");
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(format!("No wizard with id {id}"))
    }
}

/// PUT /api/wizard/{id}/fields/{field}
///
/// Body: `{"value": "..."}`. The response carries the re-validated state.
async fn set_field(
    State(state): State<WizardRouteState>,
    Path((id, field)): Path<(Uuid, String)>,
    Json(input): Json<FieldInput>,
) -> Response {
    let wizard = match lookup(&state, id).await {
        Ok(wizard) => wizard,
        Err(resp) => return resp,
    };
    let Ok(field) = field.parse::<Field>() else {
        return not_found(format!("Unknown field: {field}"));
    };
    wizard.set_field(field, &input.value).await;
    respond(StatusCode::OK, None, wizard.snapshot().await)
}

/// POST /api/wizard/{id}/open
async fn open(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    match lookup(&state, id).await {
        Ok(wizard) => {
            wizard.open().await;
            respond(StatusCode::OK, None, wizard.snapshot().await)
        }
        Err(resp) => resp,
    }
}

/// POST /api/wizard/{id}/dismiss
async fn dismiss(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    match lookup(&state, id).await {
        Ok(wizard) => {
            wizard.dismiss().await;
            respond(StatusCode::OK, None, wizard.snapshot().await)
        }
        Err(resp) => resp,
    }
}

/// POST /api/wizard/{id}/retreat
async fn retreat(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    match lookup(&state, id).await {
        Ok(wizard) => {
            wizard.retreat().await;
            respond(StatusCode::OK, None, wizard.snapshot().await)
        }
        Err(resp) => resp,
    }
}

/// POST /api/wizard/{id}/advance
///
/// 422 with the field errors when the current step does not validate.
async fn advance(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    let wizard = match lookup(&state, id).await {
        Ok(wizard) => wizard,
        Err(resp) => return resp,
    };
    let (status, error) = match wizard.advance().await {
        Ok(_) => (StatusCode::OK, None),
        Err(e @ StepError::Invalid(_)) => (StatusCode::UNPROCESSABLE_ENTITY, Some(e.to_string())),
        Err(e @ StepError::NoForwardTransition(_)) => (StatusCode::CONFLICT, Some(e.to_string())),
    };
    respond(status, error, wizard.snapshot().await)
}

/// POST /api/wizard/{id}/submit
///
/// A relay failure is 502 with the user-facing notice; the draft survives.
async fn submit(State(state): State<WizardRouteState>, Path(id): Path<Uuid>) -> Response {
    let wizard = match lookup(&state, id).await {
        Ok(wizard) => wizard,
        Err(resp) => return resp,
    };
    let (status, error) = match wizard.submit().await {
        SubmitOutcome::Submitted { .. } => (StatusCode::OK, None),
        SubmitOutcome::Failed(e) => {
            tracing::debug!(session = %id, "Relay error: {}", e);
            (StatusCode::BAD_GATEWAY, None)
        }
        SubmitOutcome::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(format!("{} field(s) failed validation", errors.len())),
        ),
        SubmitOutcome::InFlight => (
            StatusCode::CONFLICT,
            Some("A submission is already in flight".to_string()),
        ),
        SubmitOutcome::NotReady(step) => (
            StatusCode::CONFLICT,
            Some(format!("Cannot submit from step {step}")),
        ),
        SubmitOutcome::Dismissed => (
            StatusCode::CONFLICT,
            Some("Wizard was dismissed during submission".to_string()),
        ),
    };
    let snapshot = wizard.snapshot().await;
    let error = error.or_else(|| snapshot.notice.clone());
    respond(status, error, snapshot)
}

/// Build the wizard REST routes.
pub fn wizard_routes(state: WizardRouteState) -> Router {
    Router::new()
        .route("/api/wizard", post(create))
        .route("/api/wizard/{id}", get(show).delete(unmount))
        .route("/api/wizard/{id}/fields/{field}", put(set_field))
        .route("/api/wizard/{id}/open", post(open))
        .route("/api/wizard/{id}/dismiss", post(dismiss))
        .route("/api/wizard/{id}/advance", post(advance))
        .route("/api/wizard/{id}/retreat", post(retreat))
        .route("/api/wizard/{id}/submit", post(submit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
