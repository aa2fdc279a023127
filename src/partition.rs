use crate::error::{try_filled, try_with_capacity};
use crate::pivot::par_count;
use crate::{Error, FromTotalOrder, Pivots, Result, TotalOrder, MAX_DIVISIONS, PADDING, VECTOR_WIDTH};
use log::debug;
use rayon::prelude::*;
use std::ops::Range;

/// Placement of one bucket inside the working buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Number of keys in the bucket.
    pub count: usize,
    /// `count` rounded up to a multiple of [`VECTOR_WIDTH`].
    pub padded: usize,
    /// Start of the bucket in the working buffer.
    pub offset: usize,
}

impl Bucket {
    pub fn padding(&self) -> usize {
        self.padded - self.count
    }

    /// Range of the working buffer owned by this bucket, padding included.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.padded
    }
}

/// Round `count` up to the vector width. Empty buckets stay empty.
pub fn padded_count(count: usize) -> Option<usize> {
    count.checked_next_multiple_of(VECTOR_WIDTH)
}

/// Per bucket counts and offsets, produced once by [`partition`] and read by later phases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BucketLayout {
    buckets: Vec<Bucket>,
    padded_len: usize,
}

impl BucketLayout {
    /// Lay out buckets holding `counts` keys back to back.
    pub fn from_counts(counts: &[usize]) -> Result<Self> {
        let mut buckets = try_with_capacity(counts.len())?;
        let mut offset = 0_usize;
        for &count in counts {
            let padded = padded_count(count).ok_or(Error::Overflow)?;
            buckets.push(Bucket { count, padded, offset });
            offset = offset.checked_add(padded).ok_or(Error::Overflow)?;
        }
        // the buffer must also be addressable in bytes
        offset
            .checked_mul(size_of::<u64>())
            .filter(|bytes| *bytes <= isize::MAX as usize)
            .ok_or(Error::Overflow)?;

        Ok(Self {
            buckets,
            padded_len: offset,
        })
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn divisions(&self) -> usize {
        self.buckets.len()
    }

    /// Number of keys, padding excluded.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.padded_len == 0
    }

    /// Size of the working buffer, padding included.
    pub fn padded_len(&self) -> usize {
        self.padded_len
    }

    pub fn max_padded(&self) -> usize {
        self.buckets.iter().map(|b| b.padded).max().unwrap_or(0)
    }

    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.iter().map(|b| b.count)
    }

    pub fn padded_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.iter().map(|b| b.padded)
    }

    /// Check that the buckets tile a buffer of `len` elements exactly.
    pub fn validate(&self, len: usize) -> Result<()> {
        let mut expected_offset = 0_usize;
        for (i, bucket) in self.buckets.iter().enumerate() {
            if bucket.offset != expected_offset {
                return Err(Error::Inconsistent(format!(
                    "bucket {i} starts at {} instead of {expected_offset}",
                    bucket.offset
                )));
            }
            if bucket.padded % VECTOR_WIDTH != 0 || padded_count(bucket.count) != Some(bucket.padded) {
                return Err(Error::Inconsistent(format!(
                    "bucket {i} pads {} keys to {}",
                    bucket.count, bucket.padded
                )));
            }
            expected_offset = expected_offset
                .checked_add(bucket.padded)
                .ok_or(Error::Overflow)?;
        }
        if expected_offset != self.padded_len || self.padded_len != len {
            return Err(Error::Inconsistent(format!(
                "buckets cover {expected_offset} slots, layout records {}, buffer holds {len}",
                self.padded_len
            )));
        }
        Ok(())
    }

    /// Split `buffer` into one disjoint region per bucket.
    pub(crate) fn split_mut<'a, T>(&self, buffer: &'a mut [T]) -> Result<Vec<&'a mut [T]>> {
        self.validate(buffer.len())?;
        let mut regions = try_with_capacity(self.buckets.len())?;
        let mut rest = buffer;
        for bucket in &self.buckets {
            let (region, tail) = std::mem::take(&mut rest).split_at_mut(bucket.padded);
            regions.push(region);
            rest = tail;
        }
        Ok(regions)
    }
}

/// Keys scattered into padded buckets, not yet sorted.
#[derive(Clone, Debug)]
pub struct Partitioned {
    buffer: Vec<u64>,
    layout: BucketLayout,
}

impl Partitioned {
    /// The working buffer as order codes.
    pub fn buffer(&self) -> &[u64] {
        &self.buffer
    }

    pub fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    /// Keys of bucket `i` in arrival order, padding excluded.
    pub fn bucket_keys(&self, i: usize) -> impl Iterator<Item = f32> + '_ {
        let bucket = self.layout.buckets()[i];
        self.buffer[bucket.offset..bucket.offset + bucket.count]
            .iter()
            .map(|code| f32::from_total_order(*code))
    }

    pub fn into_parts(self) -> (Vec<u64>, BucketLayout) {
        (self.buffer, self.layout)
    }
}

/// Scatter `keys` into the buckets described by `pivots`.
///
/// Keys keep their arrival order inside a bucket. Slots beyond a bucket's key count
/// hold [`PADDING`].
pub fn partition(keys: &[f32], pivots: &Pivots) -> Result<Partitioned> {
    let divisions = pivots.divisions();
    if divisions > MAX_DIVISIONS {
        return Err(Error::InvalidConfig(format!("{divisions} divisions exceed u32 bucket ids")));
    }

    let mut digits = try_filled(keys.len(), 0_u32)?;
    digits
        .par_iter_mut()
        .zip(keys.par_iter())
        .for_each(|(digit, key)| *digit = pivots.bucket_of(*key) as u32);

    let counts = par_count(&digits, divisions, |digit| *digit as usize)?;

    let layout = BucketLayout::from_counts(&counts)?;
    let mut buffer = try_filled(layout.padded_len(), PADDING)?;
    let mut cursors = try_with_capacity(divisions)?;
    cursors.extend(layout.buckets().iter().map(|b| b.offset));
    keys.iter().zip(&digits).for_each(|(key, digit)| {
        let cursor = &mut cursors[*digit as usize];
        buffer[*cursor] = key.to_total_order();
        *cursor += 1;
    });

    debug!(
        "partitioned {} keys into {} buckets, {} slots after padding",
        keys.len(),
        divisions,
        layout.padded_len()
    );
    Ok(Partitioned { buffer, layout })
}
