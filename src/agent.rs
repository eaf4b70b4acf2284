use crate::collectors::{HostSampler, SampleError};
use crate::connection::{ConnectionManager, Dialer};
use crate::report::assemble;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("critical sampler failure: {0}")]
    Sampler(#[from] SampleError),
}

/// Drives the collect-and-send loop: one sample, one report, one send attempt
/// per tick, strictly sequential on a single task.
pub struct Agent<D: Dialer, S: HostSampler> {
    interval: Duration,
    auth_token: String,
    manager: ConnectionManager<D>,
    sampler: S,
}

impl<D: Dialer, S: HostSampler> Agent<D, S> {
    pub fn new(
        interval: Duration,
        auth_token: String,
        manager: ConnectionManager<D>,
        sampler: S,
    ) -> Self {
        Self {
            interval,
            auth_token,
            manager,
            sampler,
        }
    }

    /// Runs until shutdown or a critical sampler failure. A failed send drops
    /// that tick's report and reconnects before the next tick; the report is
    /// never retried.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), AgentError> {
        if self.manager.connect(&mut shutdown).await.is_err() {
            info!("shutdown requested before a connection was established");
            return Ok(());
        }

        let mut loop_shutdown = shutdown.clone();
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = loop_shutdown.changed() => {
                    info!("shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let sample = match self.sampler.sample() {
                        Ok(sample) => sample,
                        Err(err) => {
                            error!(error = %err, "critical sampler failed, stopping agent");
                            self.manager.shutdown().await;
                            return Err(err.into());
                        }
                    };
                    let report = assemble(&sample, &self.auth_token);
                    match self.manager.send(&report).await {
                        Ok(()) => debug!(host = %report.hostname, "report delivered"),
                        Err(err) => {
                            warn!(error = %err, "send failed, report dropped, reconnecting");
                            if self.manager.connect(&mut shutdown).await.is_err() {
                                info!("shutdown requested during reconnect");
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.manager.shutdown().await;
        Ok(())
    }
}
