//! Watched thread subscriptions

use serde::{Deserialize, Serialize};

use super::Thread;

/// A subscription to a thread's new replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedThread {
    /// Last known thread snapshot
    pub thread: Thread,
    /// Most recent post the user has seen
    pub last_post_id: u64,
    /// Most recent post known to exist as of the last poll
    pub current_last_post_id: u64,
    /// Posts strictly after `last_post_id` in the last fetched list
    pub total_new_posts: usize,
    /// Thread was archived by the server
    pub now_archived: bool,
    /// Thread no longer exists on the server
    pub now_deleted: bool,
}

impl WatchedThread {
    /// Start watching `thread`, treating `last_post_id` as already seen
    pub fn new(thread: Thread, last_post_id: u64) -> Self {
        Self {
            thread,
            last_post_id,
            current_last_post_id: last_post_id,
            total_new_posts: 0,
            now_archived: false,
            now_deleted: false,
        }
    }

    /// Board identifier of the watched thread
    pub fn board(&self) -> &str {
        &self.thread.board
    }

    /// Thread number of the watched thread
    pub const fn thread_id(&self) -> u64 {
        self.thread.id
    }

    /// Whether this entry tracks `(board, thread_id)`
    pub fn matches(&self, board: &str, thread_id: u64) -> bool {
        self.thread.is(board, thread_id)
    }

    /// Whether the user has unseen posts
    pub const fn has_unread(&self) -> bool {
        self.total_new_posts > 0
    }

    /// Mark everything known as seen
    pub fn acknowledge(&mut self) {
        self.last_post_id = self.current_last_post_id;
        self.total_new_posts = 0;
    }

    /// Count posts strictly after `last_post_id` in an ordered post list.
    ///
    /// When `last_post_id` is missing from the list every post except the
    /// root is counted, so notifications are over-reported rather than lost.
    pub fn count_new_posts(post_ids: &[u64], last_post_id: u64) -> usize {
        let index = post_ids
            .iter()
            .position(|id| *id == last_post_id)
            .unwrap_or(0);
        post_ids.len().saturating_sub(index).saturating_sub(1)
    }
}

/// The ordered set of watched threads, versioned by commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchList {
    /// Bumped every time the list is replaced
    pub revision: u64,
    /// Watched threads in subscription order
    pub threads: Vec<WatchedThread>,
}

impl WatchList {
    /// Create a list at revision zero
    pub const fn new(threads: Vec<WatchedThread>) -> Self {
        Self {
            revision: 0,
            threads,
        }
    }

    /// Find the entry for `(board, thread_id)`
    pub fn get(&self, board: &str, thread_id: u64) -> Option<&WatchedThread> {
        self.threads.iter().find(|w| w.matches(board, thread_id))
    }

    /// Total unseen posts across all watched threads
    pub fn total_unread(&self) -> usize {
        self.threads.iter().map(|w| w.total_new_posts).sum()
    }

    /// Number of watched threads
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Whether nothing is watched
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_new_posts_after_seen_post() {
        let ids = [100, 101, 102, 103, 104];
        assert_eq!(WatchedThread::count_new_posts(&ids, 102), 2);
        assert_eq!(WatchedThread::count_new_posts(&ids, 104), 0);
    }

    #[test]
    fn test_count_new_posts_missing_seen_post() {
        let ids = [100, 101, 102, 103, 104];
        assert_eq!(WatchedThread::count_new_posts(&ids, 99), 4);
        assert_eq!(WatchedThread::count_new_posts(&[], 99), 0);
    }

    #[test]
    fn test_acknowledge() {
        let mut watched = WatchedThread::new(Thread::new("g", 100), 100);
        watched.current_last_post_id = 105;
        watched.total_new_posts = 5;
        assert!(watched.has_unread());

        watched.acknowledge();
        assert_eq!(watched.last_post_id, 105);
        assert_eq!(watched.total_new_posts, 0);
    }
}
