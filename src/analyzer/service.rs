//! Async runner supervision: one task and one queue per analyzer

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::analyzer::core::{AnalyzerCore, AnalyzerMetrics};
use crate::common::errors::{EngineError, Result};
use crate::common::traits::MarketFeed;
use crate::common::types::MarketEvent;
use crate::strategy::{BoxedStrategyRunner, RunnerMetrics, Subscription};

/// Message to a runner task
#[derive(Debug)]
pub enum RunnerCommand {
    Event(MarketEvent),
    Metrics(oneshot::Sender<RunnerMetrics>),
}

struct RunnerHandle {
    id: String,
    symbol: String,
    subscriptions: Vec<Subscription>,
    sender: mpsc::Sender<RunnerCommand>,
    task: JoinHandle<RunnerMetrics>,
}

impl RunnerHandle {
    fn wants(&self, event: &MarketEvent) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| subscription.matches(&self.symbol, event))
    }
}

/// Drives each runner on its own tokio task
///
/// Events for one runner are queued in arrival order and processed one at
/// a time; different runners progress independently. A full queue applies
/// backpressure to [`dispatch`](Self::dispatch).
pub struct AnalyzerService {
    handles: Vec<RunnerHandle>,
}

impl AnalyzerService {
    pub fn spawn(runners: Vec<BoxedStrategyRunner>, queue_size: usize) -> Self {
        let handles = runners
            .into_iter()
            .map(|runner| {
                let (sender, receiver) = mpsc::channel(queue_size.max(1));
                let handle = RunnerHandle {
                    id: runner.id().to_string(),
                    symbol: runner.symbol().to_string(),
                    subscriptions: runner.subscriptions(),
                    sender,
                    task: tokio::spawn(run_worker(runner, receiver)),
                };
                debug!(analyzer = %handle.id, "Runner task started");
                handle
            })
            .collect::<Vec<_>>();

        info!(runners = handles.len(), "Analyzer service started");
        Self { handles }
    }

    pub fn from_core(core: AnalyzerCore, queue_size: usize) -> Self {
        Self::spawn(core.into_runners(), queue_size)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Queue `event` for every subscribed runner, returning how many got it
    pub async fn dispatch(&self, event: MarketEvent) -> Result<usize> {
        let mut delivered = 0;
        for handle in self.handles.iter().filter(|h| h.wants(&event)) {
            handle
                .sender
                .send(RunnerCommand::Event(event.clone()))
                .await?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Pump `feed` until it is exhausted
    #[instrument(skip_all, fields(feed = feed.feed_name()))]
    pub async fn run<F: MarketFeed + ?Sized>(&self, feed: &mut F) -> Result<usize> {
        let mut events = 0;
        while let Some(event) = feed.next_event().await {
            if self.dispatch(event).await? == 0 {
                debug!("Event matched no runner");
            }
            events += 1;
        }
        info!(events, "Market feed exhausted");
        Ok(events)
    }

    /// Current metrics of every runner, after its queued events
    pub async fn metrics(&self) -> Result<Vec<RunnerMetrics>> {
        let mut replies = Vec::with_capacity(self.handles.len());
        for handle in &self.handles {
            let (reply, receiver) = oneshot::channel();
            handle.sender.send(RunnerCommand::Metrics(reply)).await?;
            replies.push(receiver);
        }

        join_all(replies)
            .await
            .into_iter()
            .map(|reply| reply.map_err(EngineError::from))
            .collect()
    }

    pub async fn totals(&self) -> Result<AnalyzerMetrics> {
        Ok(AnalyzerMetrics::aggregate(&self.metrics().await?))
    }

    /// Close the queues, let every runner drain, return final metrics
    pub async fn shutdown(self) -> Result<Vec<RunnerMetrics>> {
        let (ids, tasks): (Vec<String>, Vec<JoinHandle<RunnerMetrics>>) = self
            .handles
            .into_iter()
            .map(|handle| (handle.id, handle.task))
            .unzip();

        let mut metrics = Vec::with_capacity(tasks.len());
        for (id, result) in ids.into_iter().zip(join_all(tasks).await) {
            match result {
                Ok(m) => metrics.push(m),
                Err(e) => {
                    warn!(analyzer = %id, "Runner task failed: {}", e);
                    return Err(EngineError::Internal(format!("runner {} failed: {}", id, e)));
                }
            }
        }
        info!(runners = metrics.len(), "Analyzer service stopped");
        Ok(metrics)
    }
}

async fn run_worker(
    mut runner: BoxedStrategyRunner,
    mut receiver: mpsc::Receiver<RunnerCommand>,
) -> RunnerMetrics {
    while let Some(command) = receiver.recv().await {
        match command {
            RunnerCommand::Event(event) => runner.accept_event(&event),
            RunnerCommand::Metrics(reply) => {
                // requester may have gone away
                let _ = reply.send(runner.metrics());
            }
        }
    }
    runner.metrics()
}
