pub mod events;
pub mod feed;
pub mod health;
pub mod matches;
pub mod swipe;
