//! Store key layout
//!
//! Every key the gateway touches, in one place.

/// Hash: api_key -> agent record JSON
pub const AGENTS: &str = "graffiti:agents";

/// Hash: lowercased display name -> api_key
pub const AGENT_NAMES: &str = "graffiti:agents:names";

/// Hash: lowercased wallet address -> api_key (gated deployments only)
pub const AGENT_WALLETS: &str = "graffiti:agents:wallets";

/// Hash: "row,col" -> "rrggbb"
pub const CANVAS: &str = "graffiti:canvas";

/// List of activity log entries, newest first
pub const LOG: &str = "graffiti:log";
