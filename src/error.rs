//! Error types for the `hybrid_sort` crate

/// Errors that abort a sort call. No partially sorted output is ever returned.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The value range is inverted, contains NaN, or boundaries are not monotone.
    #[error("invalid value range: {0}")]
    InvalidRange(String),

    /// The declared element count does not match the number of supplied keys.
    #[error("count {count} does not match the {len} supplied keys")]
    CountMismatch { count: usize, len: usize },

    /// A [`SortConfig`](crate::SortConfig) parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A working buffer of `len` elements could not be allocated.
    #[error("failed to allocate a working buffer of {len} elements")]
    Allocation { len: usize },

    /// The padded size of the working buffer does not fit into the address space.
    #[error("padded working buffer size overflows usize")]
    Overflow,

    /// Bucket metadata disagrees with the buffer it describes.
    #[error("inconsistent bucket layout: {0}")]
    Inconsistent(String),

    /// The dedicated thread pool could not be started.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocate an empty vector with room for `len` elements, reporting failure instead of aborting.
pub(crate) fn try_with_capacity<T>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| Error::Allocation { len })?;
    Ok(buffer)
}

/// Allocate a vector of `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = try_with_capacity(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}
