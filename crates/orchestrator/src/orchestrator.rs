// crates/orchestrator/src/orchestrator.rs
//! Coordinator - bounded worker pool and per-item fault isolation

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument, Span};

use camscout_common::{Outcome, WorkItem};
use crate::progress::{Progress, ProgressTracker};
use crate::rate_limiter::RateLimiter;

/// Default pool size for connect-level port sweeps.
pub const PORT_SCAN_CONCURRENCY: usize = 50;
/// Default pool size for channel probing; each item is a full RTSP exchange.
pub const CHANNEL_SCAN_CONCURRENCY: usize = 20;

/// Coordinator drains a queue of independent work items through a fixed pool of workers.
#[derive(Clone)]
pub struct Coordinator {
    concurrency: usize,
    cancel: CancellationToken,
    rate_limiter: Option<Arc<RateLimiter>>,
    session_progress: Option<Arc<ProgressTracker>>,
    span: Span,
}

impl Coordinator {
    /// Create a coordinator running at most `concurrency` items at once.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel: CancellationToken::new(),
            rate_limiter: None,
            session_progress: None,
            span: Span::none(),
        }
    }

    /// Share a cancellation flag; once cancelled no new item is dispatched.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pace dispatches to at most `rate` items per second.
    pub fn with_rate_limit(mut self, rate: Option<u32>) -> Self {
        self.rate_limiter = rate.map(|r| Arc::new(RateLimiter::new(r)));
        self
    }

    /// Also feed completions into a longer-lived tracker (e.g. a session's).
    pub fn with_session_progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.session_progress = Some(tracker);
        self
    }

    /// Logging handle events of this coordinator are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `worker` over every item and return the outputs in input order.
    ///
    /// Each item runs in its own task: an `Err` or a panic becomes `item.fault(..)`
    /// instead of aborting the batch. `on_progress` is called after every completion
    /// and may be invoked from several workers at once. Items still queued when the
    /// cancellation flag is raised produce no output.
    pub async fn run<T, F, Fut, P>(&self, items: Vec<T>, worker: F, on_progress: P) -> Vec<T::Output>
    where
        T: WorkItem,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T::Output>> + Send + 'static,
        P: Fn(Progress) + Send + Sync + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }
        if let Some(session) = &self.session_progress {
            session.add_total(total);
        }

        let progress = Arc::new(ProgressTracker::new(total));
        let queue = Arc::new(Mutex::new(items.into_iter().enumerate().collect::<VecDeque<_>>()));
        let results: Arc<Mutex<Vec<(usize, T::Output)>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let worker = Arc::new(worker);
        let on_progress = Arc::new(on_progress);
        let pool = self.concurrency.min(total);

        info!(parent: &self.span, "dispatching {} item(s) over {} worker(s)", total, pool);

        let mut workers = Vec::with_capacity(pool);
        for worker_id in 0..pool {
            let queue = queue.clone();
            let results = results.clone();
            let worker = worker.clone();
            let on_progress = on_progress.clone();
            let progress = progress.clone();
            let session = self.session_progress.clone();
            let limiter = self.rate_limiter.clone();
            let cancel = self.cancel.clone();
            let span = self.span.clone();

            let task = async move {
                loop {
                    if cancel.is_cancelled() {
                        debug!("worker {} stopping: scan cancelled", worker_id);
                        break;
                    }

                    let next = queue.lock().await.pop_front();
                    let (index, item) = match next {
                        Some(entry) => entry,
                        None => break, // queue drained
                    };

                    if let Some(limiter) = &limiter {
                        limiter.acquire().await;
                    }

                    let fallback = item.clone();
                    let output = match tokio::spawn((*worker)(item)).await {
                        Ok(Ok(output)) => output,
                        Ok(Err(e)) => {
                            debug!("item {} failed: {:#}", index, e);
                            progress.increment_failed();
                            fallback.fault(&format!("{e:#}"))
                        }
                        Err(join) => {
                            let reason = if join.is_panic() {
                                panic_message(join.into_panic())
                            } else {
                                "worker task cancelled".to_string()
                            };
                            warn!("item {} faulted: {}", index, reason);
                            progress.increment_failed();
                            fallback.fault(&reason)
                        }
                    };

                    let matched = output.is_match();
                    results.lock().await.push((index, output));
                    if let Some(session) = &session {
                        session.complete(matched);
                    }
                    on_progress(progress.complete(matched));
                }
            };
            workers.push(tokio::spawn(task.instrument(span)));
        }

        for w in workers {
            if let Err(e) = w.await {
                warn!(parent: &self.span, "worker task ended abnormally: {}", e);
            }
        }

        progress.log_summary("run");

        let mut collected = std::mem::take(&mut *results.lock().await);
        collected.sort_by_key(|(index, _)| *index);
        collected.into_iter().map(|(_, output)| output).collect()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(PORT_SCAN_CONCURRENCY)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}
