//! Shared types, traits and plumbing used across the engine

pub mod channels;
pub mod errors;
pub mod feed;
pub mod traits;
pub mod types;
