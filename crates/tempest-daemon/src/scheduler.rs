//! Observation collection loop

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use tempest_core::ObservationStore;
use tempest_ingest::StationSource;

/// Pulls observations from the active source and merges them into the store
pub struct Scheduler {
    source: Box<dyn StationSource>,
    store: Arc<ObservationStore>,
    running: bool,
}

impl Scheduler {
    pub fn new(source: Box<dyn StationSource>, store: Arc<ObservationStore>) -> Self {
        Self {
            source,
            store,
            running: false,
        }
    }

    /// Run the main collection loop
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;

        info!("Collection loop started: {}", self.source.name());

        while self.running {
            match self.collect_one().await {
                Ok(()) => {}
                Err(e) => {
                    // Continue running despite errors; the source retries on
                    // its next interval
                    error!("Error collecting observation: {}", e);
                }
            }
        }

        info!("Collection loop stopped");
        Ok(())
    }

    /// Collect a single observation and merge it into the store
    async fn collect_one(&mut self) -> Result<()> {
        let obs = self
            .source
            .next_observation()
            .await
            .context("Failed to get observation from source")?;

        debug!(
            timestamp = obs.timestamp,
            temperature = obs.air_temperature,
            pressure = obs.station_pressure,
            "observation received"
        );

        self.store.insert(obs);
        Ok(())
    }

    /// Stop the collection loop and shut the source down
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping collection loop...");
        self.running = false;

        if let Err(e) = self.source.stop().await {
            warn!("Error stopping source: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempest_core::Observation;
    use tempest_ingest::{IngestError, IngestResult};

    /// Source yielding a fixed list of observations, then an error
    struct ScriptedSource {
        queue: Vec<Observation>,
        active: bool,
    }

    #[async_trait::async_trait]
    impl StationSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn start(&mut self) -> IngestResult<()> {
            self.active = true;
            Ok(())
        }

        async fn stop(&mut self) -> IngestResult<()> {
            self.active = false;
            Ok(())
        }

        async fn next_observation(&mut self) -> IngestResult<Observation> {
            if self.queue.is_empty() {
                return Err(IngestError::Timeout);
            }
            Ok(self.queue.remove(0))
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    #[tokio::test]
    async fn test_collect_one_inserts_into_store() {
        let store = Arc::new(ObservationStore::new(1000));
        let source = ScriptedSource {
            queue: vec![Observation::at(1_700_000_000), Observation::at(1_700_000_060)],
            active: true,
        };
        let mut scheduler = Scheduler::new(Box::new(source), Arc::clone(&store));

        scheduler.collect_one().await.unwrap();
        scheduler.collect_one().await.unwrap();
        assert_eq!(store.len(), 2);

        // Source exhausted: the error propagates but the store is untouched
        assert!(scheduler.collect_one().await.is_err());
        assert_eq!(store.len(), 2);
    }
}
