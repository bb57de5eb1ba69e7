//! Timed replay of a scenario.
//!
//! Every request is built up front; a single build failure aborts the run
//! before anything is sent. Then one task per sample sleeps until its offset,
//! sends through the shared transport and reports an [`Outcome`] on a channel
//! that the orchestrating future drains in completion order.
//!
//! There is no orchestration-level timeout. A request that never completes
//! and is not bounded by a transport timeout keeps the run waiting forever.

pub mod http;
pub mod transport;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep_until, Instant};

use crate::aggregate::{AggregateResult, Outcome, ResultAggregator};
use crate::error::{BuildError, ExecuteError, HandlerError, SampleError, SetupError};
use crate::events::{Event, EventSink, TracingSink};
use crate::scenario::{store, Scenario};

pub use http::{HttpTransport, JsonRequestBuilder};
pub use transport::{Response, ResponseHandler, Transport};

pub struct ScenarioExecutor<T: Transport> {
    transport: Arc<T>,
    handler: Option<ResponseHandler>,
    sink: Arc<dyn EventSink>,
    max_in_flight: Option<usize>,
}

pub struct ExecutorBuilder<T: Transport> {
    transport: Option<Arc<T>>,
    handler: Option<ResponseHandler>,
    sink: Arc<dyn EventSink>,
    max_in_flight: Option<usize>,
}

impl<T: Transport> ExecutorBuilder<T> {
    pub fn transport(mut self, transport: Arc<T>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn response_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&Response) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Caps outstanding requests. Samples still wait for their own offset
    /// first, then queue for a permit.
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    pub fn build(self) -> Result<ScenarioExecutor<T>, SetupError> {
        let transport = self.transport.ok_or(SetupError::MissingTransport)?;
        if self.max_in_flight == Some(0) {
            return Err(SetupError::ZeroInFlightLimit);
        }

        Ok(ScenarioExecutor {
            transport,
            handler: self.handler,
            sink: self.sink,
            max_in_flight: self.max_in_flight,
        })
    }
}

impl<T: Transport> Default for ExecutorBuilder<T> {
    fn default() -> Self {
        Self {
            transport: None,
            handler: None,
            sink: Arc::new(TracingSink),
            max_in_flight: None,
        }
    }
}

struct PlannedRequest<R> {
    index: usize,
    offset: Duration,
    request: R,
}

impl<T: Transport> ScenarioExecutor<T> {
    pub fn builder() -> ExecutorBuilder<T> {
        ExecutorBuilder::default()
    }

    /// Loads a scenario file and replays it. Load failures are setup errors.
    pub async fn execute_file<P, B>(
        &self,
        path: impl AsRef<Path>,
        build: B,
    ) -> Result<AggregateResult, ExecuteError>
    where
        P: DeserializeOwned,
        B: FnMut(&P) -> Result<T::Request, BuildError>,
    {
        let scenario: Scenario<P> = store::load(path)?;
        self.execute(scenario, build).await
    }

    pub async fn execute<P, B>(
        &self,
        scenario: Scenario<P>,
        build: B,
    ) -> Result<AggregateResult, ExecuteError>
    where
        B: FnMut(&P) -> Result<T::Request, BuildError>,
    {
        let planned = build_requests(scenario, build)?;
        let expected = planned.len();

        self.sink.emit(&Event::DispatchStarted { samples: expected });

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let limit = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let start = Instant::now();

        for planned in planned {
            tokio::spawn(dispatch(
                planned.index,
                start + planned.offset,
                planned.request,
                Arc::clone(&self.transport),
                self.handler.clone(),
                limit.clone(),
                results_tx.clone(),
            ));
        }
        drop(results_tx);

        let mut aggregator = ResultAggregator::new();
        while aggregator.total_samples() < expected {
            let Some(outcome) = results_rx.recv().await else {
                return Err(ExecuteError::Incomplete {
                    expected,
                    received: aggregator.total_samples(),
                });
            };

            self.sink.emit(&Event::SampleCompleted {
                index: outcome.index,
                status: outcome.status,
                error: outcome.error.clone(),
                elapsed: outcome.elapsed,
            });
            aggregator.record(&outcome);
        }

        let result = aggregator.finish();
        self.sink.emit(&Event::RunCompleted {
            samples: result.total_samples,
            errors: result.error_count,
            average_elapsed: result.average_elapsed,
        });

        Ok(result)
    }
}

fn build_requests<P, R, B>(
    scenario: Scenario<P>,
    mut build: B,
) -> Result<Vec<PlannedRequest<R>>, ExecuteError>
where
    B: FnMut(&P) -> Result<R, BuildError>,
{
    scenario
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let request = build(&sample.payload)
                .map_err(|source| ExecuteError::Build { index, source })?;
            Ok(PlannedRequest {
                index,
                offset: sample.offset,
                request,
            })
        })
        .collect()
}

async fn dispatch<T: Transport>(
    index: usize,
    at: Instant,
    request: T::Request,
    transport: Arc<T>,
    handler: Option<ResponseHandler>,
    limit: Option<Arc<Semaphore>>,
    results: mpsc::UnboundedSender<Outcome>,
) {
    sleep_until(at).await;

    let outcome = {
        let _permit = match limit {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };

        let issued = Instant::now();
        let sent = transport.send(request).await;
        let elapsed = issued.elapsed();

        let (status, error) = match sent {
            Ok(response) => {
                let rejected = handler
                    .as_ref()
                    .and_then(|handle| handle(&response).err())
                    .map(SampleError::from);
                (Some(response.status), rejected)
            }
            Err(e) => (None, Some(SampleError::from(e))),
        };

        Outcome {
            index,
            status,
            error,
            elapsed,
        }
    };

    // only fails when the run has already been abandoned
    let _ = results.send(outcome);
}
