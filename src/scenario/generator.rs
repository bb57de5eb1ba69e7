//! Turns a duration and a target rate into jittered send-moments.
//!
//! The duration is cut into one-second windows. Every complete window gets
//! exactly `rate` uniformly drawn offsets, sorted. The trailing fraction `f`
//! of a second gets `floor(rate * f)` offsets drawn from `[0, floor(1e9 * f))`.
//! Arrivals are only independent inside a window; window boundaries are fixed.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::{Sample, Scenario};
use crate::events::{Event, EventSink, TracingSink};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Upper bound on the up-front allocation for generated moments.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

pub struct ScenarioGenerator<R> {
    rng: R,
    sink: Arc<dyn EventSink>,
}

impl<R: Rng> ScenarioGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Send-moments covering `[0, duration)`, ascending.
    pub fn moments(&mut self, duration: Duration, rate: u32) -> Vec<Duration> {
        let mut moments = Vec::with_capacity(capacity_hint(duration, rate));
        let per_window = rate as usize;

        let windows = duration.as_secs();
        for window in 0..windows {
            let start = Duration::from_secs(window);
            let offsets = sorted_random_offsets(&mut self.rng, per_window, NANOS_PER_SEC);
            moments.extend(offsets.into_iter().map(|ns| start + Duration::from_nanos(ns)));

            self.sink.emit(&Event::WindowGenerated {
                window,
                samples: per_window,
            });
        }

        let remainder = duration - Duration::from_secs(windows);
        if !remainder.is_zero() {
            let start = Duration::from_secs(windows);
            let count = partial_window_count(rate, remainder);
            // floor(1e9 * f) is exactly the remainder in whole nanoseconds
            let range = u64::from(remainder.subsec_nanos());
            let offsets = sorted_random_offsets(&mut self.rng, count, range);
            moments.extend(offsets.into_iter().map(|ns| start + Duration::from_nanos(ns)));

            self.sink.emit(&Event::PartialWindowGenerated {
                length: remainder,
                samples: count,
            });
        }

        moments
    }

    /// Builds a scenario whose samples carry `P::default()`.
    pub fn generate<P: Default>(&mut self, duration: Duration, rate: u32) -> Scenario<P> {
        self.build(duration, rate, P::default)
    }

    /// Builds a scenario, calling `producer` once per sample for its payload.
    pub fn generate_with<P, F>(&mut self, duration: Duration, rate: u32, producer: F) -> Scenario<P>
    where
        F: FnMut() -> P,
    {
        self.build(duration, rate, producer)
    }

    fn build<P>(&mut self, duration: Duration, rate: u32, mut payload: impl FnMut() -> P) -> Scenario<P> {
        let samples: Vec<Sample<P>> = self
            .moments(duration, rate)
            .into_iter()
            .map(|offset| Sample::new(offset, payload()))
            .collect();

        self.sink.emit(&Event::ScenarioGenerated {
            duration,
            samples: samples.len(),
        });

        samples.into()
    }
}

/// Number of samples [`ScenarioGenerator::moments`] produces for these inputs.
pub fn expected_samples(duration: Duration, rate: u32) -> usize {
    let windows = duration.as_secs() as usize;
    let remainder = duration - Duration::from_secs(duration.as_secs());
    windows
        .saturating_mul(rate as usize)
        .saturating_add(partial_window_count(rate, remainder))
}

fn capacity_hint(duration: Duration, rate: u32) -> usize {
    expected_samples(duration, rate).min(MAX_PREALLOCATED_SAMPLES)
}

/// `floor(rate * f)` for a sub-second remainder `f`, in exact integer arithmetic.
fn partial_window_count(rate: u32, remainder: Duration) -> usize {
    let nanos = u128::from(remainder.subsec_nanos());
    (u128::from(rate) * nanos / u128::from(NANOS_PER_SEC)) as usize
}

fn sorted_random_offsets<R: Rng + ?Sized>(rng: &mut R, count: usize, upper: u64) -> Vec<u64> {
    if count == 0 {
        return Vec::new();
    }
    if upper == 0 {
        return vec![0; count];
    }

    let mut offsets: Vec<u64> = (0..count).map(|_| rng.random_range(0..upper)).collect();
    offsets.sort_unstable();
    offsets
}

/// Seed derived from the wall clock, for runs without an explicit `--seed`.
pub fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sonic_rs::JsonValueTrait;
    use std::sync::Mutex;

    fn generator(seed: u64) -> ScenarioGenerator<StdRng> {
        ScenarioGenerator::new(StdRng::seed_from_u64(seed)).with_sink(Arc::new(NullSink))
    }

    fn in_window(moments: &[Duration], start: Duration, end: Duration) -> usize {
        moments.iter().filter(|m| **m >= start && **m < end).count()
    }

    #[test]
    fn two_seconds_at_one_per_second() {
        let moments = generator(1).moments(Duration::from_secs(2), 1);
        assert_eq!(moments.len(), 2);
        assert!(moments[0] < Duration::from_secs(1));
        assert!(moments[1] >= Duration::from_secs(1) && moments[1] < Duration::from_secs(2));
    }

    #[test]
    fn complete_windows_hold_exactly_rate_samples() {
        let moments = generator(7).moments(Duration::from_secs(5), 40);
        assert_eq!(moments.len(), 200);
        for i in 0..5 {
            let start = Duration::from_secs(i);
            assert_eq!(in_window(&moments, start, start + Duration::from_secs(1)), 40);
        }
    }

    #[test]
    fn partial_window_holds_floor_of_rate_times_fraction() {
        let duration = Duration::from_millis(2_750);
        let moments = generator(3).moments(duration, 10);
        // 2 full windows of 10, then floor(10 * 0.75) = 7
        assert_eq!(moments.len(), 27);
        assert_eq!(
            in_window(&moments, Duration::from_secs(2), Duration::from_millis(2_750)),
            7
        );
        assert_eq!(expected_samples(duration, 10), 27);
    }

    #[test]
    fn sub_second_duration_uses_only_partial_rule() {
        let moments = generator(11).moments(Duration::from_millis(300), 7);
        assert_eq!(moments.len(), 2);
        assert!(moments.iter().all(|m| *m < Duration::from_millis(300)));
    }

    #[test]
    fn tiny_partial_window_yields_no_samples() {
        let moments = generator(5).moments(Duration::from_millis(50), 10);
        assert!(moments.is_empty());
    }

    #[test]
    fn zero_rate_yields_nothing() {
        let moments = generator(5).moments(Duration::from_millis(4_500), 0);
        assert!(moments.is_empty());
    }

    #[test]
    fn zero_duration_yields_nothing() {
        assert!(generator(5).moments(Duration::ZERO, 100).is_empty());
    }

    #[test]
    fn offsets_are_in_range_and_monotonic() {
        let duration = Duration::from_millis(6_400);
        let moments = generator(99).moments(duration, 250);
        assert!(moments.windows(2).all(|w| w[0] <= w[1]));
        assert!(moments.iter().all(|m| *m < duration));
    }

    #[test]
    fn same_seed_same_scenario() {
        let a: Scenario<u32> = generator(42).generate_with(Duration::from_secs(3), 5, || 1);
        let b: Scenario<u32> = generator(42).generate_with(Duration::from_secs(3), 5, || 1);
        assert_eq!(a, b);
    }

    #[test]
    fn producer_called_once_per_sample() {
        let mut calls = 0u32;
        let scenario = generator(8).generate_with(Duration::from_millis(1_500), 4, || {
            calls += 1;
            calls
        });
        assert_eq!(scenario.len(), 6);
        assert_eq!(calls, 6);
        let payloads: Vec<u32> = scenario.iter().map(|s| s.payload).collect();
        assert_eq!(payloads, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn generate_without_producer_leaves_payload_null() {
        let scenario: Scenario = generator(8).generate(Duration::from_secs(2), 3);
        assert_eq!(scenario.len(), 6);
        assert!(scenario.iter().all(|s| s.payload.is_null()));
    }

    #[test]
    fn huge_inputs_do_not_preallocate_everything() {
        assert_eq!(expected_samples(Duration::MAX, u32::MAX), usize::MAX);
        assert_eq!(capacity_hint(Duration::MAX, u32::MAX), MAX_PREALLOCATED_SAMPLES);
        assert_eq!(capacity_hint(Duration::from_secs(2), 3), 6);
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Event>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn windows_are_reported_to_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let mut generator = ScenarioGenerator::new(StdRng::seed_from_u64(0)).with_sink(sink.clone());
        let _: Scenario = generator.generate(Duration::from_millis(2_500), 2);

        let events = sink.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                Event::WindowGenerated { window: 0, samples: 2 },
                Event::WindowGenerated { window: 1, samples: 2 },
                Event::PartialWindowGenerated {
                    length: Duration::from_millis(500),
                    samples: 1,
                },
                Event::ScenarioGenerated {
                    duration: Duration::from_millis(2_500),
                    samples: 5,
                },
            ]
        );
    }
}
