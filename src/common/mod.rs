//! Common types and utilities shared across pagetree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`BPlusTreeConfig`]
//! - Error types
//! - Identifiers (PageId, RecordId)

pub mod config;
pub mod error;
mod page_id;
mod rid;

pub use config::BPlusTreeConfig;
pub use error::{Error, Result};
pub use page_id::PageId;
pub use rid::RecordId;
