/// web-tester library: scenario generation, persistence and timed replay.
pub mod aggregate;
pub mod error;
pub mod events;
pub mod executor;
pub mod scenario;

pub use aggregate::{AggregateResult, LatencySummary, Outcome, ResultAggregator};
pub use error::{
    BuildError, ExecuteError, HandlerError, SampleError, SetupError, StoreError, TransportError,
};
pub use events::{Event, EventSink, NullSink, TracingSink};
pub use executor::{
    ExecutorBuilder, HttpTransport, JsonRequestBuilder, Response, ResponseHandler,
    ScenarioExecutor, Transport,
};
pub use scenario::{store, Payload, Sample, Scenario, ScenarioGenerator};
