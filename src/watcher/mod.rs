//! Background thread watching.
//!
//! [`ThreadWatcher`] wakes on a fixed interval, fetches every watched thread
//! concurrently, waits for all of them, and merges the results into the
//! [`WatchStore`] in one step. A [`NewActivity`] event is broadcast at most
//! once per cycle when any thread gains unseen posts.

mod store;

pub use store::{CycleReport, PollOutcome, PollStatus, WatchStore};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

use crate::api::ImageboardApi;
use crate::models::WatchedThread;

/// Capacity of the activity broadcast channel
const ACTIVITY_CHANNEL_CAPACITY: usize = 16;

/// Signal that at least one watched thread has new posts.
///
/// Carries no details; read the watch-list for specifics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewActivity;

/// Whether a polling cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Waiting for the timer
    Idle,
    /// Fetches in flight
    Polling,
}

/// Periodic poller for watched threads
pub struct ThreadWatcher<A> {
    inner: Arc<Inner<A>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<A> {
    api: Arc<A>,
    store: Arc<WatchStore>,
    interval: Duration,
    activity: broadcast::Sender<NewActivity>,
    rearm: Notify,
    /// Held for the whole of a cycle so cycles never overlap
    cycle: tokio::sync::Mutex<()>,
    polling: AtomicBool,
}

impl<A: ImageboardApi + 'static> ThreadWatcher<A> {
    /// Create a watcher polling every `interval`
    pub fn new(api: Arc<A>, store: Arc<WatchStore>, interval: Duration) -> Self {
        let (activity, _) = broadcast::channel(ACTIVITY_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                interval,
                activity,
                rearm: Notify::new(),
                cycle: tokio::sync::Mutex::new(()),
                polling: AtomicBool::new(false),
            }),
            task: Mutex::new(None),
        }
    }

    /// The watch-list this watcher updates
    pub fn store(&self) -> &Arc<WatchStore> {
        &self.inner.store
    }

    /// Polling interval
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Receive [`NewActivity`] events
    pub fn subscribe(&self) -> broadcast::Receiver<NewActivity> {
        self.inner.activity.subscribe()
    }

    /// Current state
    pub fn state(&self) -> WatcherState {
        if self.inner.polling.load(Ordering::Acquire) {
            WatcherState::Polling
        } else {
            WatcherState::Idle
        }
    }

    /// Arm the timer for the first cycle.
    ///
    /// Calling again restarts the timer; a cycle already in flight runs to
    /// completion and the timer restarts after it.
    pub fn start(&self) {
        let mut task = self
            .task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("Watch timer reset");
            self.inner.rearm.notify_one();
            return;
        }

        tracing::info!(
            "Watching threads every {}s",
            self.inner.interval.as_secs()
        );
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(inner.run()));
    }

    /// Run one polling cycle now.
    ///
    /// Waits for a timer-driven cycle already in flight to finish first.
    pub async fn poll_once(&self) -> CycleReport {
        self.inner.poll_once().await
    }
}

impl<A> Drop for ThreadWatcher<A> {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock()
            && let Some(task) = task.take()
        {
            task.abort();
        }
    }
}

impl<A: ImageboardApi + 'static> Inner<A> {
    async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {
                    self.poll_once().await;
                }
                () = self.rearm.notified() => {}
            }
        }
    }

    async fn poll_once(&self) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        self.polling.store(true, Ordering::Release);

        let snapshot = self.store.snapshot();
        let polls: Vec<_> = snapshot
            .threads
            .iter()
            .map(|entry| self.poll_thread(entry))
            .collect();
        let results = join_all(polls).await;

        let failed = results.iter().filter(|r| r.is_none()).count();
        let outcomes: Vec<PollOutcome> = results.into_iter().flatten().collect();
        let report = self.store.commit(&outcomes, failed);

        if report.new_activity {
            // No receivers is fine
            let _ = self.activity.send(NewActivity);
        }

        if report.committed {
            tracing::info!(
                "Watch-list updated: {} new-post changes, {} newer posts, {} archived, {} deleted",
                report.new_post_changes,
                report.last_post_changes,
                report.archived_changes,
                report.deleted_changes
            );
        } else {
            tracing::debug!("Polled {} threads, no changes", report.polled);
        }

        self.polling.store(false, Ordering::Release);
        report
    }

    async fn poll_thread(&self, entry: &WatchedThread) -> Option<PollOutcome> {
        match self.api.fetch_posts(&entry.thread).await {
            Ok(posts) => Some(PollOutcome::fetched(entry, &posts)),
            Err(e) if e.is_not_found() => {
                tracing::info!("/{}/{} is gone", entry.board(), entry.thread_id());
                Some(PollOutcome::deleted(entry))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to poll /{}/{}: {e}",
                    entry.board(),
                    entry.thread_id()
                );
                None
            }
        }
    }
}
