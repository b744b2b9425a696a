//! POST /paint - apply one pixel batch

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::extract_key_from_header;
use crate::routes::{error_response, json_response, BoxBody};
use crate::server::AppState;
use crate::types::GraffitiError;

#[derive(Debug, Deserialize)]
pub struct PaintRequest {
    /// Validated as [r, g, b] downstream; kept loose here so shape errors
    /// get their distinct messages instead of a generic parse failure.
    #[serde(default)]
    pub color: Value,
    #[serde(default)]
    pub pixels: Value,
}

#[derive(Serialize)]
pub struct PaintResponse {
    pub painted: usize,
    pub color: [u8; 3],
    pub agent: String,
    pub total_painted: u64,
}

pub async fn handle_paint(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> hyper::Response<BoxBody> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let Some(api_key) = extract_key_from_header(auth_header.as_deref()) else {
        return error_response(GraffitiError::Unauthorized(
            "Authorization header required: Bearer grf_xxx".to_string(),
        ));
    };
    let api_key = api_key.to_string();

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return error_response(GraffitiError::InvalidInput(
                "failed to read request body".to_string(),
            ))
        }
    };

    let request: PaintRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(GraffitiError::InvalidInput(format!("invalid JSON: {}", e)))
        }
    };

    match state
        .coordinator
        .paint(&api_key, &request.color, &request.pixels)
        .await
    {
        Ok(receipt) => json_response(
            StatusCode::OK,
            &PaintResponse {
                painted: receipt.painted,
                color: receipt.color,
                agent: receipt.agent,
                total_painted: receipt.total_painted,
            },
        ),
        Err(err) => error_response(err),
    }
}
