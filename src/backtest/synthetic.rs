use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::PriceSample;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MarketScenario {
    /// Steady uptrend with noise (+0.1% per sample on average)
    Uptrend,
    /// Steady downtrend with noise (-0.1% per sample on average)
    Downtrend,
    /// Choppy market pulled back towards the starting price
    Sideways,
    /// Large random swings (±3% per sample)
    Volatile,
}

/// Generates reproducible price series for backtesting
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 30_000.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_samples` prices spaced `interval_minutes` apart, ending now
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_samples: usize,
        interval_minutes: i64,
    ) -> Vec<PriceSample> {
        let start_time = Utc::now() - Duration::minutes(num_samples as i64 * interval_minutes);
        self.generate_from(start_time, scenario, num_samples, interval_minutes)
    }

    /// Same as [`generate`](Self::generate) with an explicit first timestamp
    pub fn generate_from(
        &mut self,
        start_time: DateTime<Utc>,
        scenario: MarketScenario,
        num_samples: usize,
        interval_minutes: i64,
    ) -> Vec<PriceSample> {
        let mut samples = Vec::with_capacity(num_samples);
        let mut current_price = self.base_price;
        let floor = self.base_price * 0.05;

        for i in 0..num_samples {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            let change = match scenario {
                MarketScenario::Uptrend => {
                    current_price * (0.001 + self.rng.gen_range(-0.003..0.003))
                }
                MarketScenario::Downtrend => {
                    current_price * (-0.001 + self.rng.gen_range(-0.003..0.003))
                }
                MarketScenario::Sideways => {
                    let reversion = (self.base_price - current_price) * 0.1;
                    reversion + current_price * self.rng.gen_range(-0.005..0.005)
                }
                MarketScenario::Volatile => current_price * self.rng.gen_range(-0.03..0.03),
            };
            current_price = (current_price + change).max(floor);

            // Price stays above the floor, so construction cannot fail
            if let Ok(sample) = PriceSample::new(timestamp, current_price) {
                samples.push(sample);
            }
        }

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uptrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let samples = gen.generate(MarketScenario::Uptrend, 500, 5);

        assert_eq!(samples.len(), 500);
        let first = samples.first().unwrap().price();
        let last = samples.last().unwrap().price();
        assert!(last > first, "uptrend should end higher: {} -> {}", first, last);
    }

    #[test]
    fn test_generate_downtrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let samples = gen.generate(MarketScenario::Downtrend, 500, 5);

        let first = samples.first().unwrap().price();
        let last = samples.last().unwrap().price();
        assert!(last < first, "downtrend should end lower: {} -> {}", first, last);
    }

    #[test]
    fn test_sideways_stays_near_base() {
        let mut gen = SyntheticDataGenerator::new(7).with_base_price(100.0);
        let samples = gen.generate(MarketScenario::Sideways, 1000, 5);

        for sample in &samples {
            assert!(sample.price() > 80.0 && sample.price() < 120.0);
        }
    }

    #[test]
    fn test_timestamps_are_evenly_spaced() {
        let mut gen = SyntheticDataGenerator::new(1);
        let samples = gen.generate(MarketScenario::Volatile, 10, 15);

        for pair in samples.windows(2) {
            assert_eq!(pair[1].timestamp() - pair[0].timestamp(), Duration::minutes(15));
        }
    }

    #[test]
    fn test_same_seed_same_series() {
        let start = Utc::now();
        let a = SyntheticDataGenerator::new(99).generate_from(start, MarketScenario::Volatile, 50, 1);
        let b = SyntheticDataGenerator::new(99).generate_from(start, MarketScenario::Volatile, 50, 1);
        assert_eq!(a, b);
    }
}
