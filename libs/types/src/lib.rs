//! Types library for the match detection and feed ranking engine
//!
//! This library provides the core type definitions shared by the match
//! engine, the feed engine and the gateway.
//!
//! # Modules
//! - `ids`: Unique identifiers (UserId, SwipeId, MatchId, EventId)
//! - `swipe`: Swipe actions and records
//! - `matching`: Match records and canonical pair ordering
//! - `profile`: User attributes read from the user directory
//! - `feed`: Scored candidates and feed pages
//! - `events`: Inbound and outbound cross-service events
//! - `time`: Unix-nanosecond clock helper
//! - `errors`: Error taxonomy

pub mod ids;
pub mod swipe;
pub mod matching;
pub mod profile;
pub mod feed;
pub mod events;
pub mod time;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::swipe::*;
    pub use crate::matching::*;
    pub use crate::profile::*;
    pub use crate::feed::*;
    pub use crate::events::*;
    pub use crate::errors::*;
}
