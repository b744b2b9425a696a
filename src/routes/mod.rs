//! HTTP routes for the Graffiti gateway

pub mod paint;
pub mod reads;
pub mod register;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::GraffitiError;

pub use paint::handle_paint;
pub use reads::{handle_agents, handle_canvas, handle_log};
pub use register::handle_register;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Serialize a body and wrap it with the CORS headers every response carries.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Render a gateway error as `{error}` with its mapped status.
pub fn error_response(err: GraffitiError) -> Response<BoxBody> {
    #[derive(Serialize)]
    struct ErrorBody {
        error: String,
    }

    if matches!(err, GraffitiError::Store(_) | GraffitiError::Internal(_)) {
        tracing::error!("Request failed: {}", err);
    }

    json_response(
        err.status_code(),
        &ErrorBody {
            error: err.client_message(),
        },
    )
}

/// 204 reply to CORS pre-flight requests.
pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_responses_carry_cors_headers() {
        #[derive(Serialize)]
        struct Body {
            ok: bool,
        }

        let response = json_response(StatusCode::OK, &Body { ok: true });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "*"
        );
        assert_eq!(response.headers()["Content-Type"], "application/json");
    }

    #[test]
    fn errors_map_to_their_status() {
        let response = error_response(GraffitiError::Conflict("name already taken".into()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
    }

    #[test]
    fn internal_errors_stay_opaque() {
        let response = error_response(GraffitiError::Store("dial tcp refused".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn preflight_is_204_with_no_body() {
        let response = cors_preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["Access-Control-Allow-Methods"], "GET, POST, OPTIONS");
    }
}
