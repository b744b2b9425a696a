//! Graffiti - HTTP gateway for a shared collaborative pixel canvas
//!
//! Anonymous agents register for a bearer credential, then submit bounded
//! batches of pixel writes that are merged into one global raster. All shared
//! state lives in an external key-value store; the gateway itself is
//! stateless per request.
//!
//! ## Services
//!
//! - **Register**: credential issuance with name/wallet uniqueness checks
//! - **Gate**: token-balance membership check with a short-TTL cache
//! - **Paint**: validated, bounded batch writes to the shared canvas
//! - **Reads**: canvas snapshot, leaderboard, and bounded activity log

pub mod auth;
pub mod canvas;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod gate;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GraffitiError, Result};
