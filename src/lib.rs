//! Hybrid bucket + merge sort for `f32` keys.
//!
//! A histogram over the value range picks bucket boundaries, keys are scattered into
//! buckets padded to a multiple of [`VECTOR_WIDTH`], every bucket is merge sorted in
//! parallel and the buckets are concatenated back in boundary order.
mod assemble;
mod config;
mod error;
mod merge;
mod partition;
mod pivot;
mod sort;
mod total_order;

pub use assemble::*;
pub use config::*;
pub use error::*;
pub use merge::*;
pub use partition::*;
pub use pivot::*;
pub use sort::*;
pub use total_order::*;

// 1024 buckets keep every bucket of a 10M element input around 10k keys,
// small enough for the merge passes to stay in L2
pub const DIVISIONS: usize = 1024;
/// Bucket ids are stored as `u32` while partitioning.
pub const MAX_DIVISIONS: usize = u32::MAX as usize;
pub const HISTOGRAM_BINS: usize = 1024;
/// Number of keys in a vector group, the unit sorted by the sorting network.
pub const VECTOR_WIDTH: usize = 4;
