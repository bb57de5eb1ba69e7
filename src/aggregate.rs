//! Folds per-sample outcomes into a run summary.

use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::SampleError;

/// Result of executing one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Position of the sample in its scenario.
    pub index: usize,
    /// `None` when the transport never produced a response.
    pub status: Option<u16>,
    pub error: Option<SampleError>,
    pub elapsed: Duration,
}

/// Any 2xx status counts as success.
pub fn is_success_status(code: u16) -> bool {
    (200..300).contains(&code)
}

impl Outcome {
    pub fn is_success_status(&self) -> bool {
        self.status.is_some_and(is_success_status)
    }
}

/// Latency distribution over all samples, at microsecond resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub min: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub total_samples: usize,
    pub error_count: usize,
    pub non_success_count: usize,
    pub average_elapsed: Duration,
    /// `None` when no samples were recorded.
    pub latency: Option<LatencySummary>,
}

pub struct ResultAggregator {
    total_samples: usize,
    error_count: usize,
    non_success_count: usize,
    elapsed_sum: Duration,
    latency_us: Histogram<u64>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            total_samples: 0,
            error_count: 0,
            non_success_count: 0,
            elapsed_sum: Duration::ZERO,
            // auto-resizing, 3 significant digits
            latency_us: Histogram::new(3).expect("3 significant digits is a valid precision"),
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        self.total_samples += 1;
        if outcome.error.is_some() {
            self.error_count += 1;
        }
        if !outcome.is_success_status() {
            self.non_success_count += 1;
        }
        self.elapsed_sum = self.elapsed_sum.saturating_add(outcome.elapsed);

        let micros = u64::try_from(outcome.elapsed.as_micros()).unwrap_or(u64::MAX);
        let _ = self.latency_us.record(micros);
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn finish(self) -> AggregateResult {
        let average_elapsed = if self.total_samples == 0 {
            Duration::ZERO
        } else {
            let nanos = self.elapsed_sum.as_nanos() / self.total_samples as u128;
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        let latency = (self.total_samples > 0).then(|| {
            let hist = &self.latency_us;
            LatencySummary {
                min: Duration::from_micros(hist.min()),
                mean: Duration::from_secs_f64(hist.mean() / 1_000_000.0),
                p50: Duration::from_micros(hist.value_at_quantile(0.50)),
                p95: Duration::from_micros(hist.value_at_quantile(0.95)),
                p99: Duration::from_micros(hist.value_at_quantile(0.99)),
                max: Duration::from_micros(hist.max()),
            }
        });

        AggregateResult {
            total_samples: self.total_samples,
            error_count: self.error_count,
            non_success_count: self.non_success_count,
            average_elapsed,
            latency,
        }
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> FromIterator<&'a Outcome> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = &'a Outcome>>(iter: I) -> Self {
        let mut aggregator = ResultAggregator::new();
        for outcome in iter {
            aggregator.record(outcome);
        }
        aggregator.finish()
    }
}
