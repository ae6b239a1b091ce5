//! Core domain types and utilities for the arbor platform.
//!
//! This crate provides the foundational ID types and error handling used
//! throughout the arbor share-grant engine.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GrantId, IdentityId, ParseIdError, ShareTag};
