use crate::models::PriceSample;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of the most recent price samples
///
/// Pushing beyond capacity evicts the oldest sample, so the window never
/// holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window
    ///
    /// # Arguments
    /// * `capacity` - Number of samples kept (a capacity of zero is treated as one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the window overflows
    pub fn push(&mut self, sample: PriceSample) {
        self.samples.push_back(sample);

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<&PriceSample> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    /// The `n` most recent prices, oldest first
    pub fn recent_prices(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).map(|s| s.price()).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price()).collect()
    }

    /// Relative change between the newest and the oldest sample
    pub fn momentum(&self) -> Option<f64> {
        let oldest = self.oldest()?.price();
        let latest = self.latest()?.price();
        Some((latest - oldest) / oldest)
    }
}
