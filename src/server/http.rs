//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one spawned task per
//! connection, routing by a `(method, path)` match.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::coordinator::Coordinator;
use crate::db::KvStore;
use crate::gate::MembershipGate;
use crate::routes::{self, BoxBody};
use crate::types::Result;

/// Routes advertised on unknown paths
const ROUTES: [&str; 5] = ["/register", "/paint", "/canvas", "/agents", "/log"];

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub coordinator: Coordinator,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn KvStore>, gate: Arc<MembershipGate>) -> Self {
        Self {
            args,
            coordinator: Coordinator::new(store, gate),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Graffiti listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = normalize_path(req.uri().path());

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    let response = match (method, path.as_str()) {
        (Method::POST, "/register") => routes::handle_register(req, state).await,
        (Method::POST, "/paint") => routes::handle_paint(req, state).await,
        (Method::GET, "/canvas") => routes::handle_canvas(state).await,
        (Method::GET, "/agents") => routes::handle_agents(state).await,
        (Method::GET, "/log") => routes::handle_log(state).await,
        _ => not_found_response(),
    };

    Ok(response)
}

/// Strip trailing slashes so `/canvas/` matches `/canvas`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Not found response listing the known routes
fn not_found_response() -> Response<BoxBody> {
    #[derive(Serialize)]
    struct NotFoundBody {
        error: &'static str,
        routes: [&'static str; 5],
    }

    routes::json_response(
        StatusCode::NOT_FOUND,
        &NotFoundBody {
            error: "not found",
            routes: ROUTES,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("/canvas"), "/canvas");
        assert_eq!(normalize_path("/canvas//"), "/canvas");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn unknown_routes_get_the_route_list() {
        let response = not_found_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
    }
}
