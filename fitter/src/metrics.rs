use std::time::Duration;

/// Counters for one assimilation run.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Accepts plus exclusions.
    pub steps: u64,
    pub accepted: u64,
    pub excluded: u64,
    /// Fit exchanges issued, including the final refit.
    pub exchanges: u64,
    /// Total time spent waiting on the device.
    pub exchange_time: Duration,
}

impl RunMetrics {
    #[inline]
    pub fn bump_accepted(&mut self) {
        self.steps += 1;
        self.accepted += 1;
    }

    #[inline]
    pub fn bump_excluded(&mut self) {
        self.steps += 1;
        self.excluded += 1;
    }

    #[inline]
    pub fn add_exchange(&mut self, elapsed: Duration) {
        self.exchanges += 1;
        self.exchange_time += elapsed;
    }
}
