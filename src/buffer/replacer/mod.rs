//! Eviction policy implementations (replacers).
//!
//! - [`FifoReplacer`] - evicts the unpinned frame that entered the pool first

mod fifo;

pub use fifo::FifoReplacer;
