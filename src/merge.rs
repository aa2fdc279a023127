// Bucket local merge sort. Vector groups are sorted by a fixed network first, then
// sorted runs are merged pairwise, doubling the run length every pass, see
// https://en.wikipedia.org/wiki/Merge_sort#Bottom-up_implementation

use crate::error::try_filled;
use crate::{BucketLayout, Result, VECTOR_WIDTH};
use log::{debug, trace};
use rayon::prelude::*;

#[inline(always)]
fn compare_exchange(group: &mut [u64], i: usize, j: usize) {
    let (a, b) = (group[i], group[j]);
    group[i] = a.min(b);
    group[j] = a.max(b);
}

/// Optimal 5 comparator sorting network for one vector group of [`VECTOR_WIDTH`] codes.
#[inline(always)]
pub fn sort_vector_group(group: &mut [u64]) {
    assert_eq!(group.len(), VECTOR_WIDTH, "vector groups hold exactly {VECTOR_WIDTH} codes");
    compare_exchange(group, 0, 1);
    compare_exchange(group, 2, 3);
    compare_exchange(group, 0, 2);
    compare_exchange(group, 1, 3);
    compare_exchange(group, 1, 2);
}

/// Merge the sorted runs `left` and `right` into `output`.
#[inline(never)]
pub fn merge_runs(left: &[u64], right: &[u64], output: &mut [u64]) {
    debug_assert_eq!(left.len() + right.len(), output.len());
    let (mut i, mut j) = (0, 0);
    for slot in output.iter_mut() {
        // take from the left run on ties so the merge is deterministic
        if j == right.len() || (i < left.len() && left[i] <= right[j]) {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

/// One merge pass over every bucket: runs of length `run` in `source` are merged pairwise
/// into runs of length `2 * run` in `target`.
///
/// Every (bucket, run pair) is an independent task. The call returns once all of them
/// have completed.
fn merge_pass(source: &[u64], target: &mut [u64], layout: &BucketLayout, run: usize) -> Result<()> {
    let regions = layout.split_mut(target)?;
    regions
        .into_par_iter()
        .zip(layout.buckets().par_iter())
        .for_each(|(output, bucket)| {
            let input = &source[bucket.range()];
            if bucket.padded <= run {
                // already a single sorted run
                output.copy_from_slice(input);
                return;
            }
            output
                .par_chunks_mut(2 * run)
                .zip(input.par_chunks(2 * run))
                .for_each(|(output, input)| {
                    let (left, right) = input.split_at(run.min(input.len()));
                    merge_runs(left, right, output);
                });
        });
    Ok(())
}

/// Sort every bucket of the working `buffer` in ascending order of its codes.
///
/// Padding codes compare greater than every key and end up at the tail of their bucket.
pub fn sort_buckets(mut buffer: Vec<u64>, layout: &BucketLayout) -> Result<Vec<u64>> {
    layout.validate(buffer.len())?;

    // bucket offsets and sizes are multiples of the vector width, so no group straddles two buckets
    buffer.par_chunks_exact_mut(VECTOR_WIDTH).for_each(sort_vector_group);

    let max_padded = layout.max_padded();
    if max_padded <= VECTOR_WIDTH {
        return Ok(buffer);
    }

    let mut scratch = try_filled(buffer.len(), 0_u64)?;
    let mut run = VECTOR_WIDTH;
    let mut passes = 0;
    while run < max_padded {
        merge_pass(&buffer, &mut scratch, layout, run)?;
        std::mem::swap(&mut buffer, &mut scratch);
        trace!("merge pass {passes} produced runs of {} keys", 2 * run);
        run *= 2;
        passes += 1;
    }

    debug!(
        "sorted {} buckets in {} merge passes, largest bucket {} slots",
        layout.divisions(),
        passes,
        max_padded
    );
    Ok(buffer)
}
