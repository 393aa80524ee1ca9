//! `audioforge-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod blob;
pub mod error;
pub mod id;

pub use blob::BlobKey;
pub use error::{DomainError, DomainResult};
pub use id::{JobId, UserId};
