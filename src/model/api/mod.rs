//! API-side types: the wire format of requests and responses.
//!
//! Every response carries a boolean `success` discriminator; failures are
//! produced by [`crate::error::Error`]'s responder instead.

pub mod admin;
pub mod auth;
pub mod candidate;
pub mod id;
pub mod stats;
pub mod vote;
pub mod voter;

pub use id::ApiId;
