//! POST /register - credential issuance

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH, MAX_PIXELS_PER_PAINT};
use crate::routes::{error_response, json_response, BoxBody};
use crate::server::AppState;
use crate::types::GraffitiError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub name: String,
    pub api_key: String,
    pub message: &'static str,
    pub canvas_size: CanvasSize,
    pub max_pixels_per_request: usize,
}

#[derive(Serialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

pub async fn handle_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> hyper::Response<BoxBody> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return error_response(GraffitiError::InvalidInput(
                "failed to read request body".to_string(),
            ))
        }
    };

    let request: RegisterRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(GraffitiError::InvalidInput(format!("invalid JSON: {}", e)))
        }
    };

    match state
        .coordinator
        .register(request.name.as_deref(), request.wallet_address.as_deref())
        .await
    {
        Ok(agent) => json_response(
            StatusCode::OK,
            &RegisterResponse {
                name: agent.name,
                api_key: agent.api_key,
                message: "Welcome to Graffiti! Use your API key to paint pixels.",
                canvas_size: CanvasSize {
                    width: CANVAS_WIDTH,
                    height: CANVAS_HEIGHT,
                },
                max_pixels_per_request: MAX_PIXELS_PER_PAINT,
            },
        ),
        Err(err) => error_response(err),
    }
}
