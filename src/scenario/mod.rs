//! Scenario data model: timed samples with opaque payloads.

pub mod generator;
pub mod store;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use generator::ScenarioGenerator;

/// Default payload type, an arbitrary JSON value.
pub type Payload = sonic_rs::Value;

/// One planned request: when to send it and what to send.
///
/// A sample without a payload carries `P::default()`, which is JSON `null`
/// for the default [`Payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<P = Payload> {
    /// Offset from scenario start. Legacy files name this field `time`.
    #[serde(rename = "offsetNanoseconds", alias = "time", with = "offset_nanos")]
    pub offset: Duration,

    pub payload: P,
}

impl<P> Sample<P> {
    pub fn new(offset: Duration, payload: P) -> Self {
        Self { offset, payload }
    }
}

/// An ordered plan of samples. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario<P = Payload> {
    samples: Vec<Sample<P>>,
}

impl<P> Scenario<P> {
    pub fn samples(&self) -> &[Sample<P>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample<P>> {
        self.samples.iter()
    }
}

impl<P> From<Vec<Sample<P>>> for Scenario<P> {
    fn from(samples: Vec<Sample<P>>) -> Self {
        Self { samples }
    }
}

/// Offsets are stored as whole nanoseconds.
mod offset_nanos {
    use std::time::Duration;

    use serde::{ser::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(offset.as_nanos())
            .map_err(|_| S::Error::custom("offset does not fit in u64 nanoseconds"))?;
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
