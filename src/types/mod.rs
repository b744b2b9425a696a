//! Shared types for the Graffiti gateway

mod error;

pub use error::{GraffitiError, Result};
