use crate::{Error, Result, DIVISIONS, HISTOGRAM_BINS, MAX_DIVISIONS};

/// Runtime parameters of a [`HybridSorter`](crate::HybridSorter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortConfig {
    divisions: usize,
    histogram_bins: usize,
    threads: Option<usize>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            divisions: DIVISIONS,
            histogram_bins: HISTOGRAM_BINS,
            threads: None,
        }
    }
}

impl SortConfig {
    /// Number of buckets the keys are distributed into (default: [`DIVISIONS`]).
    pub fn with_divisions(mut self, divisions: usize) -> Self {
        self.divisions = divisions;
        self
    }
    /// Resolution of the histogram used to place bucket boundaries (default: [`HISTOGRAM_BINS`]).
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }
    /// Run the sort on a dedicated pool of `n` threads instead of the global rayon pool.
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }
    pub fn histogram_bins(&self) -> usize {
        self.histogram_bins
    }
    pub(crate) fn thread_count(&self) -> Option<usize> {
        self.threads
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.divisions == 0 {
            return Err(Error::InvalidConfig("divisions must be at least 1".into()));
        }
        if self.divisions > MAX_DIVISIONS {
            return Err(Error::InvalidConfig(format!(
                "{} divisions exceed the limit of {MAX_DIVISIONS}",
                self.divisions
            )));
        }
        if self.histogram_bins == 0 {
            return Err(Error::InvalidConfig("histogram_bins must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidConfig("threads must be at least 1".into()));
        }
        Ok(())
    }
}
