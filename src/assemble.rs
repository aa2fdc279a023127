use crate::error::{try_filled, try_with_capacity};
use crate::{is_padding, BucketLayout, Error, FromTotalOrder, Result};
use log::debug;
use rayon::prelude::*;

/// Calculate the prefix sum of `counts`, resulting in the output index of every bucket.
///
/// Returns the total.
pub(crate) fn cumulative_counts(counts: &mut [usize]) -> usize {
    let mut sum = 0_usize;
    counts.iter_mut().for_each(|count| {
        let tmp = *count;
        *count = sum;
        sum += tmp;
    });
    sum
}

/// Concatenate the sorted buckets of `sorted` into the final key sequence, dropping padding.
///
/// Fails with [`Error::Inconsistent`] if a bucket's tail does not hold exactly its padding.
pub fn assemble(sorted: &[u64], layout: &BucketLayout) -> Result<Vec<f32>> {
    layout.validate(sorted.len())?;

    for (i, bucket) in layout.buckets().iter().enumerate() {
        let region = &sorted[bucket.range()];
        let (keys, padding) = region.split_at(bucket.count);
        if !padding.iter().copied().all(is_padding) || keys.last().copied().is_some_and(is_padding) {
            return Err(Error::Inconsistent(format!(
                "bucket {i} does not end in exactly {} padding slots",
                bucket.padding()
            )));
        }
    }

    let mut starts = try_with_capacity(layout.divisions())?;
    starts.extend(layout.counts());
    let len = cumulative_counts(&mut starts);
    let mut output = try_filled(len, 0.0_f32)?;

    // starts are ascending, so splitting off each start from the back yields disjoint regions
    let mut regions = try_with_capacity(layout.divisions())?;
    let mut rest = output.as_mut_slice();
    for start in starts.iter().rev() {
        let (head, region) = std::mem::take(&mut rest).split_at_mut(*start);
        regions.push(region);
        rest = head;
    }
    regions.reverse();

    regions
        .into_par_iter()
        .zip(layout.buckets().par_iter())
        .for_each(|(region, bucket)| {
            let codes = &sorted[bucket.offset..bucket.offset + bucket.count];
            region
                .iter_mut()
                .zip(codes)
                .for_each(|(key, code)| *key = f32::from_total_order(*code));
        });

    debug!("assembled {len} keys from {} buckets", layout.divisions());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TotalOrder, PADDING};

    fn codes(keys: &[f32]) -> Vec<u64> {
        keys.iter().map(TotalOrder::to_total_order).collect()
    }

    #[test]
    fn test_cumulative_counts() {
        let mut counts = [2, 0, 3, 1];
        assert_eq!(cumulative_counts(&mut counts), 6);
        assert_eq!(counts, [0, 2, 2, 5]);
    }

    #[test]
    fn test_assemble_strips_padding() {
        let layout = BucketLayout::from_counts(&[2, 0, 3]).unwrap();
        let mut sorted = codes(&[0.1, 0.3]);
        sorted.extend([PADDING, PADDING]);
        sorted.extend(codes(&[0.5, 0.7, 0.9]));
        sorted.push(PADDING);

        assert_eq!(assemble(&sorted, &layout).unwrap(), vec![0.1, 0.3, 0.5, 0.7, 0.9]);
    }

    #[test]
    fn test_assemble_rejects_misplaced_padding() {
        let layout = BucketLayout::from_counts(&[2]).unwrap();
        let mut sorted = codes(&[0.1]);
        sorted.extend([PADDING, PADDING, PADDING]);
        assert!(matches!(assemble(&sorted, &layout), Err(Error::Inconsistent(_))));

        let sorted = codes(&[0.1, 0.2, 0.3, 0.4]);
        assert!(matches!(assemble(&sorted, &layout), Err(Error::Inconsistent(_))));
    }

    #[test]
    fn test_assemble_empty() {
        let layout = BucketLayout::from_counts(&[0, 0]).unwrap();
        assert!(assemble(&[], &layout).unwrap().is_empty());
    }
}
