//! HTTP routes for adacd
//!
//! `/start/consensus` admits at most one job and returns before the job
//! runs; `/degree` answers topology queries from neighbors.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ControlError;
use crate::job::JobState;
use crate::server::AppState;
use crate::worker::ConsensusWorker;

type AppStateArc = Arc<AppState>;

pub const DEFAULT_ITERATIONS: u32 = 50;

pub const STARTED_MSG: &str = "Started Running Consensus";
pub const ALREADY_RUNNING_MSG: &str = "Consensus Already Running. Please check logs";
pub const CLOUD_KSVD_MSG: &str = "We can't run Cloud K-SVD quite yet. Please check back later.";

/// Iteration count from the `tc` parameter; anything but a positive integer
/// falls back to the default
pub fn parse_iterations(raw: Option<&str>) -> u32 {
    match raw.map(str::trim).and_then(|s| s.parse::<u32>().ok()) {
        Some(n) if n > 0 => n,
        _ => DEFAULT_ITERATIONS,
    }
}

// ============================================================================
// Start Routes
// ============================================================================

/// First value of `name` in a decoded query string
fn first_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

pub fn start_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/start/consensus", get(start_consensus))
        .route("/start/cloudksvd", get(start_cloud_ksvd))
}

async fn start_consensus(
    State(state): State<AppStateArc>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<&'static str, ControlError> {
    debug!("Attempting to kick off task");
    let iterations = parse_iterations(first_param(&params, "tc"));

    // A node missing from the topology cannot run a job
    state.node.graph.resolve_self(&state.node.self_address)?;

    let reply = match state.node.guard.try_acquire(iterations) {
        Some(ticket) => {
            info!(
                "Starting consensus job {} with {} iterations",
                ticket.id(),
                iterations
            );
            ConsensusWorker::new(Arc::clone(&state.node), ticket).spawn();
            STARTED_MSG
        }
        None => {
            debug!("Task already running");
            ALREADY_RUNNING_MSG
        }
    };
    Ok(reply)
}

async fn start_cloud_ksvd() -> &'static str {
    CLOUD_KSVD_MSG
}

// ============================================================================
// Topology Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DegreeParams {
    host: Option<String>,
}

pub fn topology_routes() -> Router<AppStateArc> {
    Router::new().route("/degree", get(degree))
}

async fn degree(
    State(state): State<AppStateArc>,
    Query(params): Query<DegreeParams>,
) -> Result<String, ControlError> {
    let host = params
        .host
        .filter(|h| !h.trim().is_empty())
        .ok_or(ControlError::MissingParameter("host"))?;

    let degree = state.node.graph.degree(host.trim())?;
    debug!("Degree of {} is {}", host, degree);
    Ok(degree.to_string())
}

// ============================================================================
// Status Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: String,
    pub job: Option<JobSummary>,
    pub node: String,
    pub degree: Option<usize>,
    pub uptime_seconds: u64,
}

pub fn status_routes() -> Router<AppStateArc> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<AppStateArc>) -> Json<StatusResponse> {
    let snapshot = state.node.guard.snapshot();
    let job = match &snapshot {
        JobState::Idle => None,
        JobState::Running(info) => Some(JobSummary {
            id: info.id,
            iterations: info.iterations,
            started_at: info.started_at,
        }),
    };

    Json(StatusResponse {
        state: snapshot.as_str().to_string(),
        job,
        node: state.node.self_address.clone(),
        degree: state.node.graph.degree(&state.node.self_address).ok(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
