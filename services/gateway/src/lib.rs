//! Matchfeed Gateway
//!
//! HTTP surface over the match engine and feed engine: swipes, feeds,
//! match lifecycle, and the internal inbound-event endpoint.

pub mod config;
pub mod directory;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod maintenance;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod sink;
pub mod state;

pub use config::GatewayConfig;
pub use router::create_router;
pub use state::AppState;
