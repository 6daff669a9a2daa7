//! Single-writer watch-list storage

use tokio::sync::watch;

use crate::models::{Post, Thread, WatchList, WatchedThread};

/// Result of polling one watched thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Board of the polled thread
    pub board: String,
    /// Number of the polled thread
    pub thread_id: u64,
    /// What the server reported
    pub status: PollStatus,
}

/// Server answer for one watched thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Posts were fetched
    Fetched {
        /// Post numbers, oldest first
        post_ids: Vec<u64>,
        /// Archival flag of the root post
        archived: bool,
        /// Snapshot rebuilt from the root post
        thread: Option<Thread>,
    },
    /// The thread no longer exists
    Deleted,
}

impl PollOutcome {
    /// Outcome of a successful fetch
    pub fn fetched(entry: &WatchedThread, posts: &[Post]) -> Self {
        let root = posts.first();
        Self {
            board: entry.board().to_string(),
            thread_id: entry.thread_id(),
            status: PollStatus::Fetched {
                post_ids: posts.iter().map(|p| p.id).collect(),
                // Archival is only reported on the root post
                archived: root.is_some_and(|p| p.archived),
                thread: root.map(Post::to_thread),
            },
        }
    }

    /// Outcome of a fetch that reported the thread as gone
    pub fn deleted(entry: &WatchedThread) -> Self {
        Self {
            board: entry.board().to_string(),
            thread_id: entry.thread_id(),
            status: PollStatus::Deleted,
        }
    }

    /// Apply this outcome on top of the live entry
    fn apply(&self, entry: &WatchedThread) -> WatchedThread {
        let mut next = entry.clone();
        match &self.status {
            PollStatus::Fetched {
                post_ids,
                archived,
                thread,
            } => {
                next.total_new_posts = WatchedThread::count_new_posts(post_ids, entry.last_post_id);
                next.now_archived = *archived;
                next.now_deleted = false;
                if let Some(last) = post_ids.last() {
                    next.current_last_post_id = *last;
                }
                if let Some(thread) = thread {
                    next.thread = thread.clone();
                }
            }
            PollStatus::Deleted => next.now_deleted = true,
        }
        next
    }
}

/// What a polling cycle changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Threads whose fetch succeeded or reported deletion
    pub polled: usize,
    /// Threads whose fetch failed and were left untouched
    pub failed: usize,
    /// Results dropped because the thread was unwatched mid-cycle
    pub unwatched: usize,
    /// Threads whose new-post count changed
    pub new_post_changes: usize,
    /// Threads whose archival flag flipped
    pub archived_changes: usize,
    /// Threads whose deletion flag flipped
    pub deleted_changes: usize,
    /// Threads whose newest known post changed
    pub last_post_changes: usize,
    /// Some thread went from zero to a positive new-post count
    pub new_activity: bool,
    /// The watch-list was replaced
    pub committed: bool,
}

impl CycleReport {
    /// Whether anything justifies replacing the watch-list
    pub const fn has_changes(&self) -> bool {
        self.unwatched > 0
            || self.new_post_changes > 0
            || self.archived_changes > 0
            || self.deleted_changes > 0
            || self.last_post_changes > 0
    }
}

/// Owner of the watch-list.
///
/// Every mutation goes through the `watch` sender, so readers only ever see
/// a complete list and the revision grows by one per replacement.
#[derive(Debug)]
pub struct WatchStore {
    tx: watch::Sender<WatchList>,
}

impl Default for WatchStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WatchStore {
    /// Create a store holding `threads`
    pub fn new(threads: Vec<WatchedThread>) -> Self {
        let (tx, _rx) = watch::channel(WatchList::new(threads));
        Self { tx }
    }

    /// Copy of the current list
    pub fn snapshot(&self) -> WatchList {
        self.tx.borrow().clone()
    }

    /// Current revision
    pub fn revision(&self) -> u64 {
        self.tx.borrow().revision
    }

    /// Receiver notified whenever the list is replaced
    pub fn subscribe(&self) -> watch::Receiver<WatchList> {
        self.tx.subscribe()
    }

    /// Start watching `thread`; returns `false` if it was already watched
    pub fn watch(&self, thread: Thread, last_post_id: u64) -> bool {
        self.tx.send_if_modified(|list| {
            if list.get(&thread.board, thread.id).is_some() {
                return false;
            }
            tracing::info!("Watching /{}/{}", thread.board, thread.id);
            list.threads.push(WatchedThread::new(thread, last_post_id));
            list.revision += 1;
            true
        })
    }

    /// Stop watching a thread; returns `false` if it was not watched
    pub fn unwatch(&self, board: &str, thread_id: u64) -> bool {
        self.tx.send_if_modified(|list| {
            let before = list.threads.len();
            list.threads.retain(|w| !w.matches(board, thread_id));
            if list.threads.len() == before {
                return false;
            }
            tracing::info!("Unwatched /{board}/{thread_id}");
            list.revision += 1;
            true
        })
    }

    /// Mark all known posts of a thread as seen
    pub fn acknowledge(&self, board: &str, thread_id: u64) -> bool {
        self.tx.send_if_modified(|list| {
            let Some(entry) = list.threads.iter_mut().find(|w| w.matches(board, thread_id)) else {
                return false;
            };
            if entry.last_post_id == entry.current_last_post_id && entry.total_new_posts == 0 {
                return false;
            }
            entry.acknowledge();
            list.revision += 1;
            true
        })
    }

    /// Merge one cycle's outcomes into the list in a single replacement.
    ///
    /// Each outcome is diffed against the live entry. Outcomes for threads
    /// no longer watched are dropped. Nothing is replaced unless a count,
    /// archival or deletion flag, or the newest known post changed, or an
    /// unwatch was detected.
    pub fn commit(&self, outcomes: &[PollOutcome], failed: usize) -> CycleReport {
        let mut report = CycleReport {
            polled: outcomes.len(),
            failed,
            ..CycleReport::default()
        };

        self.tx.send_if_modified(|list| {
            let mut updated = list.threads.clone();

            for outcome in outcomes {
                let Some(entry) = updated
                    .iter_mut()
                    .find(|w| w.matches(&outcome.board, outcome.thread_id))
                else {
                    report.unwatched += 1;
                    continue;
                };

                let next = outcome.apply(entry);
                if next.total_new_posts != entry.total_new_posts {
                    report.new_post_changes += 1;
                    if entry.total_new_posts == 0 {
                        report.new_activity = true;
                    }
                }
                if next.now_archived != entry.now_archived {
                    report.archived_changes += 1;
                }
                if next.now_deleted != entry.now_deleted {
                    report.deleted_changes += 1;
                }
                // Acknowledging copies this id, so it must never go stale
                if next.current_last_post_id != entry.current_last_post_id {
                    report.last_post_changes += 1;
                }
                *entry = next;
            }

            if !report.has_changes() {
                return false;
            }

            list.threads = updated;
            list.revision += 1;
            report.committed = true;
            true
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts(ids: &[u64]) -> Vec<Post> {
        ids.iter()
            .map(|id| Post::new("g", ids[0], *id))
            .collect()
    }

    fn store_with(ids: &[u64]) -> WatchStore {
        WatchStore::new(
            ids.iter()
                .map(|id| WatchedThread::new(Thread::new("g", *id), *id))
                .collect(),
        )
    }

    #[test]
    fn test_watch_and_unwatch() {
        let store = WatchStore::default();
        assert!(store.watch(Thread::new("g", 1), 1));
        assert!(!store.watch(Thread::new("g", 1), 1));
        assert!(store.watch(Thread::new("v", 1), 1));
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.revision(), 2);

        assert!(store.unwatch("g", 1));
        assert!(!store.unwatch("g", 1));
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_commit_counts_new_posts() {
        let store = store_with(&[10]);
        let entry = store.snapshot().threads[0].clone();

        let report = store.commit(&[PollOutcome::fetched(&entry, &posts(&[10, 11, 12]))], 0);
        assert!(report.committed && report.new_activity);

        let list = store.snapshot();
        assert_eq!(list.threads[0].total_new_posts, 2);
        assert_eq!(list.threads[0].current_last_post_id, 12);
        assert_eq!(list.threads[0].last_post_id, 10);
        assert_eq!(list.revision, 1);
    }

    #[test]
    fn test_commit_without_changes_keeps_revision() {
        let store = store_with(&[10]);
        let entry = store.snapshot().threads[0].clone();
        let outcome = PollOutcome::fetched(&entry, &posts(&[10]));

        let report = store.commit(&[outcome], 0);
        assert!(!report.committed);
        assert!(!report.new_activity);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_commit_drops_unwatched() {
        let store = store_with(&[10, 20]);
        let list = store.snapshot();
        let outcomes = vec![
            PollOutcome::fetched(&list.threads[0], &posts(&[10])),
            PollOutcome::fetched(&list.threads[1], &posts(&[20, 21])),
        ];

        assert!(store.unwatch("g", 20));
        let report = store.commit(&outcomes, 0);

        assert_eq!(report.unwatched, 1);
        assert!(report.committed);
        assert!(!report.new_activity);
        assert_eq!(store.snapshot().len(), 1);
        assert!(store.snapshot().get("g", 20).is_none());
    }

    #[test]
    fn test_commit_respects_acknowledge_during_cycle() {
        let store = store_with(&[10]);
        let entry = store.snapshot().threads[0].clone();

        store.commit(&[PollOutcome::fetched(&entry, &posts(&[10, 11]))], 0);
        // Acknowledged while the next cycle was in flight
        assert!(store.acknowledge("g", 10));
        let report = store.commit(&[PollOutcome::fetched(&entry, &posts(&[10, 11]))], 0);

        assert!(!report.committed);
        assert_eq!(store.snapshot().threads[0].total_new_posts, 0);
        assert_eq!(store.snapshot().threads[0].last_post_id, 11);
    }

    #[test]
    fn test_commit_tracks_replaced_last_post() {
        let store = WatchStore::new(vec![WatchedThread::new(Thread::new("g", 100), 102)]);
        let entry = store.snapshot().threads[0].clone();

        store.commit(&[PollOutcome::fetched(&entry, &posts(&[100, 101, 102, 103]))], 0);

        // 103 deleted, 104 arrived: same count, new tail
        let report = store.commit(&[PollOutcome::fetched(&entry, &posts(&[100, 101, 102, 104]))], 0);
        assert!(report.committed);
        assert!(!report.new_activity);
        assert_eq!(report.last_post_changes, 1);
        assert_eq!(store.snapshot().threads[0].current_last_post_id, 104);
        assert_eq!(store.snapshot().threads[0].total_new_posts, 1);

        assert!(store.acknowledge("g", 100));
        let report = store.commit(&[PollOutcome::fetched(&entry, &posts(&[100, 101, 102, 104]))], 0);
        assert!(!report.committed);
        assert!(!report.new_activity);
        assert_eq!(store.snapshot().threads[0].total_new_posts, 0);
        assert_eq!(store.snapshot().threads[0].last_post_id, 104);
    }

    #[test]
    fn test_commit_archived_and_deleted() {
        let store = store_with(&[10, 20]);
        let list = store.snapshot();

        let mut archived = posts(&[10]);
        archived[0].archived = true;

        let report = store.commit(
            &[
                PollOutcome::fetched(&list.threads[0], &archived),
                PollOutcome::deleted(&list.threads[1]),
            ],
            0,
        );

        assert_eq!(report.archived_changes, 1);
        assert_eq!(report.deleted_changes, 1);
        assert!(!report.new_activity);

        let list = store.snapshot();
        assert!(list.threads[0].now_archived);
        assert!(list.threads[1].now_deleted);
    }

    #[test]
    fn test_acknowledge() {
        let store = store_with(&[10]);
        let entry = store.snapshot().threads[0].clone();
        store.commit(&[PollOutcome::fetched(&entry, &posts(&[10, 11, 12]))], 0);

        assert!(store.acknowledge("g", 10));
        assert!(!store.acknowledge("g", 10));
        assert!(!store.acknowledge("g", 99));

        let watched = &store.snapshot().threads[0];
        assert_eq!(watched.last_post_id, 12);
        assert_eq!(watched.total_new_posts, 0);
    }

    #[test]
    fn test_subscribers_see_whole_list() {
        let store = store_with(&[10, 20]);
        let mut rx = store.subscribe();
        let list = store.snapshot();

        store.commit(
            &[
                PollOutcome::fetched(&list.threads[0], &posts(&[10, 11])),
                PollOutcome::fetched(&list.threads[1], &posts(&[20, 21])),
            ],
            0,
        );

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update();
        assert_eq!(seen.revision, 1);
        assert!(seen.threads.iter().all(|w| w.total_new_posts == 1));
    }
}
