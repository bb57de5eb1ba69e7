//! Structured events emitted by generation and execution.
//!
//! The generator and executor never log directly. They hand [`Event`]s to an
//! [`EventSink`], and [`TracingSink`] turns those into `tracing` records.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::aggregate::is_success_status;
use crate::error::SampleError;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A complete one-second window was filled.
    WindowGenerated { window: u64, samples: usize },

    /// The trailing fractional window was filled.
    PartialWindowGenerated { length: Duration, samples: usize },

    ScenarioGenerated { duration: Duration, samples: usize },

    /// Every request was built and dispatch tasks are about to be spawned.
    DispatchStarted { samples: usize },

    SampleCompleted {
        index: usize,
        status: Option<u16>,
        error: Option<SampleError>,
        elapsed: Duration,
    },

    RunCompleted {
        samples: usize,
        errors: usize,
        average_elapsed: Duration,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Default sink, writes every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        match event {
            Event::WindowGenerated { window, samples } => {
                debug!("Window {} generated with {} samples", window, samples);
            }
            Event::PartialWindowGenerated { length, samples } => {
                debug!(
                    "Partial window of {:?} generated with {} samples",
                    length, samples
                );
            }
            Event::ScenarioGenerated { duration, samples } => {
                info!("Generated {} samples over {:?}", samples, duration);
            }
            Event::DispatchStarted { samples } => {
                info!("Dispatching {} requests", samples);
            }
            Event::SampleCompleted {
                index,
                status,
                error,
                elapsed,
            } => {
                if let Some(e) = error {
                    warn!("Sample {} received error: {}", index, e);
                }
                match status {
                    Some(code) if is_success_status(*code) => {
                        debug!("Sample {} completed with {} in {:?}", index, code, elapsed);
                    }
                    Some(code) => warn!("Sample {} received status code: {}", index, code),
                    None => {}
                }
            }
            Event::RunCompleted {
                samples,
                errors,
                average_elapsed,
            } => {
                info!(
                    "Run completed: {} samples, {} errors, average response time {:?}",
                    samples, errors, average_elapsed
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &Event) {}
}
