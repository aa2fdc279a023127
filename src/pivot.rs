use crate::error::{try_filled, try_with_capacity};
use crate::{Error, FromTotalOrder, Result, TotalOrder, PADDING};
use log::debug;
use rayon::prelude::*;

/// Check that `[min, max]` is a usable value range.
pub fn validate_range(min: f32, max: f32) -> Result<()> {
    if min.is_nan() || max.is_nan() {
        return Err(Error::InvalidRange(format!("range bounds must not be NaN, got [{min}, {max}]")));
    }
    if min > max {
        return Err(Error::InvalidRange(format!("min {min} is greater than max {max}")));
    }
    Ok(())
}

/// Uniform-width histogram of the keys over a value range.
#[derive(Clone, Debug)]
pub struct Histogram {
    counts: Vec<usize>,
    lo: f64,
    width: f64,
}

impl Histogram {
    /// Count `keys` into `bins` equally wide bins spanning `[min, max]`.
    ///
    /// Keys below the range fall into the first bin, keys above it and NaNs into the last.
    /// Infinite bounds are clamped to the finite `f32` range.
    pub fn build(keys: &[f32], min: f32, max: f32, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfig("histogram_bins must be at least 1".into()));
        }
        let lo = (min as f64).max(f32::MIN as f64);
        let hi = (max as f64).min(f32::MAX as f64);
        let mut histogram = Self {
            counts: Vec::new(),
            lo,
            width: (hi - lo) / bins as f64,
        };
        let counts = par_count(keys, bins, |key| histogram.bin_of(*key, bins))?;
        histogram.counts = counts;
        Ok(histogram)
    }

    #[inline(always)]
    fn bin_of(&self, key: f32, bins: usize) -> usize {
        let last = bins - 1;
        if key.is_nan() {
            return last;
        }
        let offset = (key as f64 - self.lo) / self.width;
        // also catches -inf and the 0/0 of a zero width range
        if !(offset >= 0.0) {
            return 0;
        }
        (offset as usize).min(last)
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Lower edge of bin `bin`.
    fn edge(&self, bin: usize) -> f64 {
        self.lo + self.width * bin as f64
    }
}

/// Count how many `items` fall into each of `len` slots, in parallel.
///
/// `slot` must return an index below `len`. Every per-thread count vector is allocated
/// fallibly, so an oversized `len` is reported as [`Error::Allocation`].
pub(crate) fn par_count<T: Sync>(
    items: &[T],
    len: usize,
    slot: impl Fn(&T) -> usize + Sync + Send,
) -> Result<Vec<usize>> {
    items
        .par_chunks(1 << 16)
        .fold(
            || try_filled(len, 0_usize),
            |counts, chunk| {
                counts.map(|mut counts| {
                    chunk.iter().for_each(|item| counts[slot(item)] += 1);
                    counts
                })
            },
        )
        .reduce(
            || try_filled(len, 0_usize),
            |left, right| {
                let (mut left, right) = (left?, right?);
                left.iter_mut().zip(&right).for_each(|(a, b)| *a += *b);
                Ok(left)
            },
        )
}

/// Bucket boundaries, stored as order codes in non-decreasing order.
///
/// A key belongs to the bucket whose index equals the number of boundaries less than or
/// equal to it, so a key equal to a boundary goes to the upper bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pivots {
    codes: Vec<u64>,
}

impl Pivots {
    /// Place `divisions - 1` boundaries so that every bucket receives roughly the same
    /// number of keys, interpolating linearly inside histogram bins.
    pub fn estimate(keys: &[f32], min: f32, max: f32, divisions: usize, bins: usize) -> Result<Self> {
        validate_range(min, max)?;
        if divisions == 0 {
            return Err(Error::InvalidConfig("divisions must be at least 1".into()));
        }
        if bins == 0 {
            return Err(Error::InvalidConfig("histogram_bins must be at least 1".into()));
        }
        if min == max || keys.is_empty() {
            return Self::single_bucket(divisions);
        }

        let histogram = Histogram::build(keys, min, max, bins)?;
        let counts = histogram.counts();
        let per_bucket = keys.len() as f64 / divisions as f64;
        let hi = (max as f64).min(f32::MAX as f64);

        let mut codes = try_with_capacity(divisions - 1)?;
        let mut cumulative = 0_usize;
        let mut bin = 0;
        let mut last_code = 0_u64;
        for k in 1..divisions {
            let target = per_bucket * k as f64;
            while bin < counts.len() && ((cumulative + counts[bin]) as f64) < target {
                cumulative += counts[bin];
                bin += 1;
            }
            let value = if bin == counts.len() {
                hi
            } else {
                // the loop stopped inside a bin holding the target, so the bin is not empty
                let fraction = (target - cumulative as f64) / counts[bin] as f64;
                histogram.edge(bin) + histogram.width * fraction
            };
            let code = (value.clamp(histogram.lo, hi) as f32).to_total_order().max(last_code);
            codes.push(code);
            last_code = code;
        }

        debug!(
            "estimated {} boundaries over [{min}, {max}] from {} histogram bins",
            codes.len(),
            counts.len()
        );
        Ok(Self { codes })
    }

    /// Use explicit boundaries, which must be non-decreasing and free of NaN.
    pub fn from_boundaries(boundaries: &[f32]) -> Result<Self> {
        if let Some(nan) = boundaries.iter().position(|b| b.is_nan()) {
            return Err(Error::InvalidRange(format!("boundary {nan} is NaN")));
        }
        let codes = boundaries.iter().map(TotalOrder::to_total_order).collect::<Vec<_>>();
        if let Some(i) = codes.windows(2).position(|pair| pair[0] > pair[1]) {
            return Err(Error::InvalidRange(format!(
                "boundaries must be non-decreasing, {} > {}",
                boundaries[i],
                boundaries[i + 1]
            )));
        }
        Ok(Self { codes })
    }

    /// Boundaries that send every key to bucket 0.
    pub fn single_bucket(divisions: usize) -> Result<Self> {
        Ok(Self {
            codes: try_filled(divisions.saturating_sub(1), PADDING)?,
        })
    }

    /// Number of buckets described by these boundaries.
    pub fn divisions(&self) -> usize {
        self.codes.len() + 1
    }

    /// The boundary between bucket `i` and `i + 1`, or `None` if nothing can reach bucket `i + 1`.
    pub fn boundary(&self, i: usize) -> Option<f32> {
        self.codes
            .get(i)
            .filter(|code| **code != PADDING)
            .map(|code| f32::from_total_order(*code))
    }

    pub fn bucket_of(&self, key: f32) -> usize {
        self.bucket_of_code(key.to_total_order())
    }

    #[inline(always)]
    pub(crate) fn bucket_of_code(&self, code: u64) -> usize {
        self.codes.partition_point(|boundary| *boundary <= code)
    }
}
