//! Job status polling lifecycle.
//!
//! [`JobPoller::start`] spawns one task per job that queries the status
//! endpoint on a fixed interval until the job reaches a terminal state. The
//! returned [`PollHandle`] owns that task: dropping or stopping it cancels the
//! loop. The success and cancellation hooks sit behind a one-shot latch, so at
//! most one of them ever fires, and only once, whether the terminal state is
//! observed by a poll or by a user-initiated cancel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ApiError;
use crate::api::{JobApi, JobStatus};
use crate::config::{DEFAULT_MAX_POLL_DURATION, DEFAULT_POLL_INTERVAL};
use crate::job::{JobId, JobMetrics, JobPhase, JobResult};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up with an error after this long. `None` polls indefinitely.
    pub max_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_duration: Some(DEFAULT_MAX_POLL_DURATION),
        }
    }
}

/// Terminal callbacks for one job.
pub struct JobHooks {
    on_done: Box<dyn FnOnce(JobResult) + Send>,
    on_cancelled: Box<dyn FnOnce() + Send>,
}

impl JobHooks {
    pub fn new(
        on_done: impl FnOnce(JobResult) + Send + 'static,
        on_cancelled: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            on_done: Box::new(on_done),
            on_cancelled: Box::new(on_cancelled),
        }
    }
}

impl std::fmt::Debug for JobHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHooks").finish_non_exhaustive()
    }
}

/// What a view displays while a job is being polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    pub job_id: JobId,
    pub phase: JobPhase,
    pub metrics: JobMetrics,
    /// A cancel request has been sent and not yet answered.
    pub cancelling: bool,
    /// Number of non-terminal status responses applied so far.
    pub polls: u64,
}

impl PollSnapshot {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            phase: JobPhase::Processing,
            metrics: JobMetrics::default(),
            cancelling: false,
            polls: 0,
        }
    }

    /// Processing and error states are shown; done and cancelled are not.
    pub fn is_visible(&self) -> bool {
        matches!(self.phase, JobPhase::Processing | JobPhase::Error(_))
    }
}

/// A terminal state the poll loop observed.
enum Outcome {
    Done(JobResult),
    Cancelled,
    Failed(String),
}

impl Outcome {
    fn phase(&self) -> JobPhase {
        match self {
            Outcome::Done(_) => JobPhase::Done,
            Outcome::Cancelled => JobPhase::Cancelled,
            Outcome::Failed(message) => JobPhase::Error(message.clone()),
        }
    }
}

/// Terminal bookkeeping. While a cancel request is in flight, outcomes from
/// the poll loop are held here until the request is answered.
struct Lifecycle {
    hooks: Option<JobHooks>,
    cancelling: bool,
    held: Option<Outcome>,
}

/// Hooks taken out of the latch, fired once the lifecycle lock is released.
struct Settled {
    hooks: JobHooks,
    outcome: Outcome,
}

impl Settled {
    fn fire(self) {
        match self.outcome {
            Outcome::Done(result) => (self.hooks.on_done)(result),
            Outcome::Cancelled => (self.hooks.on_cancelled)(),
            // Errors surface locally only; neither hook fires.
            Outcome::Failed(_) => {}
        }
    }
}

/// State shared between the poll task, the handle and any cancellers.
struct Shared {
    snapshot: watch::Sender<PollSnapshot>,
    lifecycle: Mutex<Lifecycle>,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to a terminal phase. Returns false if already terminal.
    fn transition(&self, phase: JobPhase) -> bool {
        self.snapshot.send_if_modified(|s| {
            if s.phase.is_terminal() {
                return false;
            }
            s.phase = phase;
            s.cancelling = false;
            true
        })
    }

    /// Apply `outcome` under the lifecycle lock. Returns the hooks to fire if
    /// this call moved the job to a terminal phase.
    fn finish(&self, state: &mut Lifecycle, outcome: Outcome) -> Option<Settled> {
        state.cancelling = false;
        if !self.transition(outcome.phase()) {
            return None;
        }
        state.hooks.take().map(|hooks| Settled { hooks, outcome })
    }

    /// Report a terminal outcome from the poll loop, or hold it while a
    /// cancel request is unanswered.
    fn settle(&self, outcome: Outcome) {
        let settled = {
            let mut state = self.lifecycle();
            if state.cancelling {
                state.held = Some(outcome);
                return;
            }
            self.finish(&mut state, outcome)
        };
        if let Some(settled) = settled {
            settled.fire();
        }
    }

    fn record_progress(&self, metrics: Option<&JobMetrics>) {
        self.snapshot.send_if_modified(|s| {
            if s.phase.is_terminal() {
                return false;
            }
            s.polls += 1;
            if let Some(update) = metrics {
                s.metrics.merge(update);
            }
            true
        });
    }

    fn set_cancelling(&self, cancelling: bool) {
        self.snapshot.send_if_modified(|s| {
            if s.phase.is_terminal() || s.cancelling == cancelling {
                return false;
            }
            s.cancelling = cancelling;
            true
        });
    }

    fn is_terminal(&self) -> bool {
        self.snapshot.borrow().phase.is_terminal()
    }
}

/// Starts polling loops against a [`JobApi`].
pub struct JobPoller<A> {
    api: Arc<A>,
    config: PollConfig,
}

impl<A: JobApi> JobPoller<A> {
    /// Intervals below one millisecond are raised to one millisecond.
    pub fn new(api: Arc<A>, mut config: PollConfig) -> Self {
        config.interval = config.interval.max(MIN_POLL_INTERVAL);
        Self { api, config }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Spawn the polling task for `job_id`. Must be called inside a tokio runtime.
    pub fn start(&self, job_id: JobId, hooks: JobHooks) -> PollHandle<A> {
        let (snapshot, _) = watch::channel(PollSnapshot::new(job_id.clone()));
        let shared = Arc::new(Shared {
            snapshot,
            lifecycle: Mutex::new(Lifecycle {
                hooks: Some(hooks),
                cancelling: false,
                held: None,
            }),
        });
        let cancel = CancellationToken::new();

        log::info!("polling job {} every {:?}", job_id, self.config.interval);
        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            job_id.clone(),
            self.config,
            shared.clone(),
            cancel.clone(),
        ));

        PollHandle {
            job_id,
            api: self.api.clone(),
            shared,
            cancel,
            task: Some(task),
        }
    }
}

/// Poll loop: one status request per tick, awaited before the next tick, until
/// a terminal response, a failure, the time limit or cancellation.
async fn poll_loop<A: JobApi>(
    api: Arc<A>,
    job_id: JobId,
    config: PollConfig,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if let Some(limit) = config.max_duration {
            if started.elapsed() >= limit {
                log::warn!("job {}: no terminal status after {:?}", job_id, limit);
                shared.settle(Outcome::Failed(format!(
                    "polling timed out after {}s without a final status",
                    limit.as_secs()
                )));
                return;
            }
        }

        // A cancel that lands while the request is in flight discards its response.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            response = api.fetch_status(&job_id) => response,
        };

        let status = match response {
            Ok(status) => status,
            Err(e) => {
                log::warn!("job {}: status request failed: {}", job_id, e);
                shared.settle(Outcome::Failed(e.to_string()));
                return;
            }
        };

        match status.status {
            JobStatus::Done => {
                match status.job_result() {
                    Ok(result) => {
                        log::info!("job {} done", job_id);
                        shared.settle(Outcome::Done(result));
                    }
                    Err(e) => {
                        log::warn!("job {}: undecodable result: {}", job_id, e);
                        shared.settle(Outcome::Failed(format!(
                            "could not decode job result: {e}"
                        )));
                    }
                }
                return;
            }
            JobStatus::Cancelled => {
                log::info!("job {} cancelled by backend", job_id);
                shared.settle(Outcome::Cancelled);
                return;
            }
            JobStatus::Error => {
                let message = status
                    .error_message()
                    .unwrap_or_else(|| "processing failed".to_string());
                log::warn!("job {} failed: {}", job_id, message);
                shared.settle(Outcome::Failed(message));
                return;
            }
            JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {
                shared.record_progress(status.metrics.as_ref());
            }
        }
    }
}

/// Owner of one job's polling task. Dropping it stops the task.
pub struct PollHandle<A> {
    job_id: JobId,
    api: Arc<A>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<A: JobApi> PollHandle<A> {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn snapshot(&self) -> PollSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Receive every snapshot change (metrics, phase, cancelling flag).
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// A cloneable handle for cancelling this job from another task.
    pub fn canceller(&self) -> JobCanceller<A> {
        JobCanceller {
            job_id: self.job_id.clone(),
            api: self.api.clone(),
            shared: self.shared.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Ask the backend to cancel the job. See [`JobCanceller::cancel`].
    pub async fn cancel_job(&self) -> Result<(), ApiError> {
        self.canceller().cancel().await
    }

    /// Wait for the polling task to end on its own.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    /// Stop polling and wait until the task is gone. No hook fires.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        log::debug!("stopped polling job {}", self.job_id);
    }
}

impl<A> Drop for PollHandle<A> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sends the cancel command for one job and settles the lifecycle on success.
pub struct JobCanceller<A> {
    job_id: JobId,
    api: Arc<A>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl<A> Clone for JobCanceller<A> {
    fn clone(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            api: self.api.clone(),
            shared: self.shared.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<A: JobApi> JobCanceller<A> {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// On acknowledgement, polling stops immediately and the cancellation hook
    /// fires (unless the job already reached a terminal state). On failure the
    /// job stays `Processing` and the error is returned so the caller can retry.
    ///
    /// A terminal status that arrives while the request is unanswered is held:
    /// an acknowledged cancel discards it, a failed one applies it.
    pub async fn cancel(&self) -> Result<(), ApiError> {
        {
            let mut state = self.shared.lifecycle();
            if self.shared.is_terminal() {
                return Ok(());
            }
            state.cancelling = true;
        }
        self.shared.set_cancelling(true);

        let reply = self.api.send_cancel(&self.job_id).await;
        let settled = {
            let mut state = self.shared.lifecycle();
            let held = state.held.take();
            match &reply {
                Ok(()) => {
                    self.cancel.cancel();
                    if held.is_some() {
                        log::debug!("job {}: discarding status held during cancel", self.job_id);
                    }
                    log::info!("job {} cancelled", self.job_id);
                    self.shared.finish(&mut state, Outcome::Cancelled)
                }
                Err(e) => {
                    log::warn!("job {}: cancel failed: {}", self.job_id, e);
                    state.cancelling = false;
                    self.shared.set_cancelling(false);
                    held.and_then(|held| self.shared.finish(&mut state, held))
                }
            }
        };
        if let Some(settled) = settled {
            settled.fire();
        }
        reply
    }
}

/// Keeps at most one job polled at a time, as a single view does.
pub struct JobWatcher<A> {
    poller: JobPoller<A>,
    active: Option<PollHandle<A>>,
}

impl<A: JobApi> JobWatcher<A> {
    pub fn new(poller: JobPoller<A>) -> Self {
        Self {
            poller,
            active: None,
        }
    }

    /// Stop any previous job's task (and wait for it), then start polling `job_id`.
    pub async fn watch(&mut self, job_id: JobId, hooks: JobHooks) -> &mut PollHandle<A> {
        if let Some(previous) = self.active.take() {
            previous.stop().await;
        }
        self.active.insert(self.poller.start(job_id, hooks))
    }

    pub fn active(&self) -> Option<&PollHandle<A>> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut PollHandle<A>> {
        self.active.as_mut()
    }

    pub async fn clear(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.stop().await;
        }
    }
}
