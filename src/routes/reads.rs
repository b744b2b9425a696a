//! GET /canvas, /agents, /log - read paths derived from paint writes

use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::coordinator::{ActivityEntry, AgentSummary};
use crate::routes::{error_response, json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct CanvasResponse {
    pub width: u32,
    pub height: u32,
    pub pixels: HashMap<String, String>,
}

#[derive(Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentSummary>,
}

#[derive(Serialize)]
pub struct LogResponse {
    pub log: Vec<ActivityEntry>,
}

/// Full sparse canvas; cost grows with distinct painted cells.
pub async fn handle_canvas(state: Arc<AppState>) -> hyper::Response<BoxBody> {
    match state.coordinator.canvas().await {
        Ok(pixels) => json_response(
            StatusCode::OK,
            &CanvasResponse {
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT,
                pixels,
            },
        ),
        Err(err) => error_response(err),
    }
}

/// Leaderboard, sorted by pixels painted descending.
pub async fn handle_agents(state: Arc<AppState>) -> hyper::Response<BoxBody> {
    match state.coordinator.agents().await {
        Ok(agents) => json_response(StatusCode::OK, &AgentsResponse { agents }),
        Err(err) => error_response(err),
    }
}

/// Most recent activity, newest first.
pub async fn handle_log(state: Arc<AppState>) -> hyper::Response<BoxBody> {
    match state.coordinator.log().await {
        Ok(log) => json_response(StatusCode::OK, &LogResponse { log }),
        Err(err) => error_response(err),
    }
}
