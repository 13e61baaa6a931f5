//! Simulation metrics.

use std::collections::VecDeque;

/// Counters and latency samples for one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Total operations attempted.
    pub total_operations: u64,
    /// Operations the engine committed.
    pub completed_operations: u64,
    /// Rejections by a business rule (terminal).
    pub business_rejections: u64,
    /// Rejections from lock-wait timeouts or storage pressure (retryable).
    pub busy_rejections: u64,
    /// Latency samples (microseconds).
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_operations: 0,
            completed_operations: 0,
            business_rejections: 0,
            busy_rejections: 0,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record a committed operation.
    pub fn record_completed(&mut self, latency_us: u64) {
        self.total_operations += 1;
        self.completed_operations += 1;

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    /// Record a business-rule rejection.
    pub fn record_business_rejection(&mut self) {
        self.total_operations += 1;
        self.business_rejections += 1;
    }

    /// Record a retryable rejection.
    pub fn record_busy(&mut self) {
        self.total_operations += 1;
        self.busy_rejections += 1;
    }

    /// Get average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p50 latency.
    pub fn p50_latency_us(&self) -> u64 {
        self.percentile_latency(50)
    }

    /// Get p99 latency.
    pub fn p99_latency_us(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Fraction of operations the engine committed.
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }

        self.completed_operations as f64 / self.total_operations as f64
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_completed(100);
        metrics.record_completed(200);
        metrics.record_completed(150);
        metrics.record_business_rejection();

        assert_eq!(metrics.total_operations, 4);
        assert_eq!(metrics.completed_operations, 3);
        assert_eq!(metrics.business_rejections, 1);
        assert_eq!(metrics.busy_rejections, 0);
        assert_eq!(metrics.average_latency_us(), 150);
        assert_eq!(metrics.success_rate(), 0.75);
    }
}
