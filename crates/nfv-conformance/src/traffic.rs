//! Background traffic worker.
//!
//! A [`TrafficWorker`] repeatedly asks a [`TrafficGenerator`] to start until
//! the generator reports that the target effect was achieved, the budget
//! runs out, or the worker is cancelled. Progress is published on a `watch`
//! channel so the scenario can wait for it without polling shared flags.

use crate::config::TrafficConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Source of test traffic towards an instantiated VNF.
#[async_trait]
pub trait TrafficGenerator: Send + Sync {
    /// Makes one attempt. Returns `Ok(true)` once the target effect is
    /// observed, `Ok(false)` if it is not there yet.
    async fn start(&self) -> Result<bool>;

    /// Stops whatever `start` set in motion.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// How a traffic run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficOutcome {
    Achieved { attempts: u32 },
    GaveUp { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl TrafficOutcome {
    pub fn achieved(&self) -> bool {
        matches!(self, TrafficOutcome::Achieved { .. })
    }
}

/// Handle to a running traffic task.
pub struct TrafficWorker {
    cancel: CancellationToken,
    achieved: watch::Receiver<bool>,
    task: JoinHandle<TrafficOutcome>,
}

impl TrafficWorker {
    /// Spawns the worker on the current runtime.
    pub fn spawn(generator: Arc<dyn TrafficGenerator>, config: &TrafficConfig) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(
            generator,
            config.retry_interval(),
            config.budget(),
            cancel.clone(),
            tx,
        ));
        Self {
            cancel,
            achieved: rx,
            task,
        }
    }

    /// Returns true once the generator has reported success.
    pub fn is_achieved(&self) -> bool {
        *self.achieved.borrow()
    }

    /// Waits up to `timeout` for the target effect. Returns false on timeout
    /// or if the worker ended without achieving it.
    pub async fn wait_achieved(&mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.achieved.wait_for(|achieved| *achieved)).await,
            Ok(Ok(_))
        )
    }

    /// Asks the worker to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the worker to finish.
    pub async fn join(self) -> Result<TrafficOutcome> {
        self.task
            .await
            .map_err(|e| HarnessError::Traffic(format!("traffic task failed: {}", e)))
    }
}

async fn run(
    generator: Arc<dyn TrafficGenerator>,
    retry_interval: Duration,
    budget: Duration,
    cancel: CancellationToken,
    achieved: watch::Sender<bool>,
) -> TrafficOutcome {
    let deadline = Instant::now() + budget;
    let mut attempts = 0u32;

    let outcome = loop {
        attempts += 1;
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break TrafficOutcome::Cancelled { attempts },
            result = generator.start() => result,
        };
        match attempt {
            Ok(true) => {
                tracing::info!(attempts, "Traffic target effect achieved");
                achieved.send_replace(true);
                break TrafficOutcome::Achieved { attempts };
            }
            Ok(false) => tracing::debug!(attempts, "Traffic not flowing yet"),
            Err(e) => tracing::warn!(attempts, error = %e, "Traffic attempt failed"),
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(attempts, ?budget, "Traffic budget exhausted");
            break TrafficOutcome::GaveUp { attempts };
        }
        tokio::select! {
            _ = cancel.cancelled() => break TrafficOutcome::Cancelled { attempts },
            _ = tokio::time::sleep(retry_interval.min(deadline - now)) => {}
        }
    };

    if let Err(e) = generator.stop().await {
        tracing::warn!(error = %e, "Failed to stop traffic generator");
    }
    outcome
}

/// Generator that succeeds once a TCP connection to `target` can be opened.
#[derive(Debug, Clone)]
pub struct TcpConnectProbe {
    target: String,
    connect_timeout: Duration,
}

impl TcpConnectProbe {
    pub fn new(target: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            target: target.into(),
            connect_timeout,
        }
    }

    /// Builds the probe from the `[traffic]` section, if a target is set.
    pub fn from_config(config: &TrafficConfig) -> Option<Self> {
        config
            .target
            .as_ref()
            .map(|target| Self::new(target.clone(), config.connect_timeout()))
    }
}

#[async_trait]
impl TrafficGenerator for TcpConnectProbe {
    async fn start(&self) -> Result<bool> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                tracing::debug!(target = %self.target, error = %e, "Connect failed");
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}
