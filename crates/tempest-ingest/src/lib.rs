//! Weather observation producers
//!
//! Each source yields fully populated [`Observation`]s in canonical units;
//! the store performs no unit conversion. Three producers are provided: a
//! cloud REST poller, a local UDP broadcast listener, and a synthetic
//! generator for running without hardware.

pub mod api;
pub mod simulator;
pub mod udp;

pub use api::*;
pub use simulator::*;
pub use udp::*;

use tempest_core::Observation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Timeout waiting for data")]
    Timeout,
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Trait for all observation sources
#[async_trait::async_trait]
pub trait StationSource: Send + Sync {
    /// Source name/identifier
    fn name(&self) -> &str;

    /// Initialize the source and start data collection
    async fn start(&mut self) -> IngestResult<()>;

    /// Stop the source and clean up resources
    async fn stop(&mut self) -> IngestResult<()>;

    /// Wait for and return the next observation
    async fn next_observation(&mut self) -> IngestResult<Observation>;

    /// Check if the source is currently active
    fn is_active(&self) -> bool;
}
