use crate::{
    assemble, partition, sort_buckets, validate_range, BucketLayout, Error, Pivots, Result, SortConfig,
};
use log::debug;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::{Arc, OnceLock};

/// Output of [`HybridSorter::sort_with_layout`].
#[derive(Clone, Debug)]
pub struct Sorted {
    /// The keys in ascending order.
    pub keys: Vec<f32>,
    /// How the keys were distributed over the buckets, for load balance reporting.
    pub layout: BucketLayout,
}

/// Bucket sort followed by a per bucket parallel merge sort.
///
/// With [`SortConfig::threads`] set, the dedicated pool is started on the first sort and
/// reused by every later call, including calls on clones of the sorter.
#[derive(Clone, Debug, Default)]
pub struct HybridSorter {
    config: SortConfig,
    pool: OnceLock<std::result::Result<Arc<ThreadPool>, String>>,
}

impl HybridSorter {
    pub fn new(config: SortConfig) -> Self {
        Self {
            config,
            pool: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort `keys`, all of which are expected to lie within `[min, max]`.
    ///
    /// `count` must equal `keys.len()`. Keys outside the range and NaNs are still sorted
    /// correctly, they only unbalance the first and last bucket.
    pub fn sort(&self, keys: &[f32], count: usize, min: f32, max: f32) -> Result<Vec<f32>> {
        self.sort_with_layout(keys, count, min, max).map(|sorted| sorted.keys)
    }

    /// Sort `keys`, taking the value range from the keys themselves.
    pub fn sort_slice(&self, keys: &[f32]) -> Result<Vec<f32>> {
        self.config.validate()?;
        self.install(|| {
            let (min, max) = value_range(keys);
            self.run(keys, min, max)
        })?
        .map(|sorted| sorted.keys)
    }

    /// Like [`sort`](Self::sort), but also return the bucket layout.
    pub fn sort_with_layout(&self, keys: &[f32], count: usize, min: f32, max: f32) -> Result<Sorted> {
        self.config.validate()?;
        if count != keys.len() {
            return Err(Error::CountMismatch { count, len: keys.len() });
        }
        self.install(|| self.run(keys, min, max))?
    }

    fn run(&self, keys: &[f32], min: f32, max: f32) -> Result<Sorted> {
        validate_range(min, max)?;
        if keys.is_empty() {
            return Ok(Sorted {
                keys: Vec::new(),
                layout: BucketLayout::default(),
            });
        }

        let pivots = Pivots::estimate(
            keys,
            min,
            max,
            self.config.divisions(),
            self.config.histogram_bins(),
        )?;
        let (buffer, layout) = partition(keys, &pivots)?.into_parts();
        let sorted = sort_buckets(buffer, &layout)?;
        let keys = assemble(&sorted, &layout)?;
        debug!("sorted {} keys over [{min}, {max}]", keys.len());
        Ok(Sorted { keys, layout })
    }

    /// Run `op` on the configured thread pool, or the global one if no thread count is set.
    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> Result<R> {
        let Some(threads) = self.config.thread_count() else {
            return Ok(op());
        };
        let pool = self.pool.get_or_init(|| {
            debug!("starting a dedicated pool of {threads} threads");
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(Arc::new)
                .map_err(|e| e.to_string())
        });
        match pool {
            Ok(pool) => Ok(pool.install(op)),
            Err(e) => Err(Error::ThreadPool(e.clone())),
        }
    }
}

/// Smallest and largest non-NaN key, `(0.0, 0.0)` when there is none.
pub fn value_range(keys: &[f32]) -> (f32, f32) {
    let (min, max) = keys
        .par_iter()
        .filter(|key| !key.is_nan())
        .fold(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), key| (min.min(*key), max.max(*key)),
        )
        .reduce(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)),
        );
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Sort `count` keys from `keys` within `[min, max]` using the default configuration.
pub fn sort(keys: &[f32], count: usize, min: f32, max: f32) -> Result<Vec<f32>> {
    HybridSorter::default().sort(keys, count, min, max)
}

/// Sort `keys` using the default configuration, deriving the value range from the keys.
pub fn sort_slice(keys: &[f32]) -> Result<Vec<f32>> {
    HybridSorter::default().sort_slice(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_from_two_buckets() {
        let sorter = HybridSorter::new(SortConfig::default().with_divisions(2));
        let sorted = sorter.sort_with_layout(&[0.9, 0.1, 0.5, 0.3, 0.7], 5, 0.1, 0.9).unwrap();
        assert_eq!(sorted.keys, vec![0.1, 0.3, 0.5, 0.7, 0.9]);
        assert_eq!(sorted.layout.divisions(), 2);
        assert_eq!(sorted.layout.len(), 5);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sort(&[], 0, 0.0, 1.0).unwrap(), Vec::<f32>::new());
        assert_eq!(sort_slice(&[]).unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(sort(&[1.0], 2, 0.0, 1.0), Err(Error::CountMismatch { count: 2, len: 1 }));
        assert!(matches!(sort(&[1.0], 1, 1.0, 0.0), Err(Error::InvalidRange(_))));
        assert!(matches!(sort(&[1.0], 1, f32::NAN, 1.0), Err(Error::InvalidRange(_))));
        let sorter = HybridSorter::new(SortConfig::default().with_divisions(0));
        assert!(matches!(sorter.sort(&[1.0], 1, 0.0, 1.0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_all_equal_keys_fill_one_bucket() {
        let keys = vec![3.5_f32; 37];
        let sorted = HybridSorter::default().sort_with_layout(&keys, 37, 3.5, 3.5).unwrap();
        assert_eq!(sorted.keys, keys);
        let non_empty = sorted.layout.counts().filter(|c| *c > 0).collect::<Vec<_>>();
        assert_eq!(non_empty, vec![37]);
    }

    #[test]
    fn test_nan_and_infinities() {
        let keys = [f32::NAN, 1.0, f32::INFINITY, -0.0, f32::NEG_INFINITY, 0.0, -2.5];
        let sorted = sort_slice(&keys).unwrap();
        assert_eq!(&sorted[..6], &[f32::NEG_INFINITY, -2.5, -0.0, 0.0, 1.0, f32::INFINITY]);
        assert!(sorted[0..3].iter().all(|k| k.is_sign_negative()));
        assert!(sorted[6].is_nan());
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let keys = (0..10_000).map(|i| ((i * 7919) % 10_000) as f32).collect::<Vec<_>>();
        let sorter = HybridSorter::new(SortConfig::default().threads(2).with_divisions(16));
        let sorted = sorter.sort_slice(&keys).unwrap();
        assert_eq!(sorted, (0..10_000).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_dedicated_thread_pool_is_reused() {
        let sorter = HybridSorter::new(SortConfig::default().threads(3).with_divisions(8));
        assert!(sorter.pool.get().is_none());

        sorter.sort(&[2.0, 1.0], 2, 1.0, 2.0).unwrap();
        let first = sorter.pool.get().unwrap().clone().unwrap();
        assert_eq!(first.current_num_threads(), 3);

        sorter.sort_slice(&[5.0, 4.0, 3.0]).unwrap();
        let second = sorter.pool.get().unwrap().clone().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sorter.install(rayon::current_num_threads).unwrap(), 3);
    }

    #[test]
    fn test_global_pool_without_thread_count() {
        let sorter = HybridSorter::default();
        sorter.sort(&[2.0, 1.0], 2, 1.0, 2.0).unwrap();
        assert!(sorter.pool.get().is_none());
    }

    #[test]
    fn test_huge_division_count_is_an_error() {
        let sorter = HybridSorter::new(SortConfig::default().with_divisions(1 << 62));
        assert!(matches!(
            sorter.sort(&[1.0, 2.0], 2, 0.0, 2.0),
            Err(Error::Allocation { .. } | Error::InvalidConfig(_))
        ));
        let sorter = HybridSorter::new(SortConfig::default().with_histogram_bins(1 << 62));
        assert!(matches!(sorter.sort(&[1.0, 2.0], 2, 0.0, 2.0), Err(Error::Allocation { .. })));
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range(&[2.0, f32::NAN, -1.0, 4.0]), (-1.0, 4.0));
        assert_eq!(value_range(&[f32::NAN]), (0.0, 0.0));
    }
}
