//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level file I/O and page allocation
//! - [`page`] - Raw pages and the typed views (header, leaf, internal)

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
