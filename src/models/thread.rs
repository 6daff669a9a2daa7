//! Thread model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attachment;
use crate::content;

/// Aggregate statistics the server reports for a thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStats {
    /// Number of replies (root post excluded)
    pub replies: u32,
    /// Number of image replies
    pub images: u32,
    /// Number of unique posters, when the board reports it
    pub unique_posters: Option<u32>,
    /// Thread reached the bump limit
    pub bump_limit: bool,
    /// Thread reached the image limit
    pub image_limit: bool,
    /// Catalog page the thread was last seen on
    pub page: Option<u32>,
}

/// A thread as listed in a board catalog
///
/// Replaced wholesale on every fetch, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Root post number, unique per board
    pub id: u64,
    /// Owning board identifier
    pub board: String,
    /// Author name of the root post
    pub author: String,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// Subject line (entity-decoded)
    pub subject: Option<String>,
    /// Raw markup of the root post
    pub content: Option<String>,
    /// Pinned to the top of the catalog
    pub sticky: bool,
    /// Closed to new replies
    pub closed: bool,
    /// Root attachment is spoilered
    pub spoiler: bool,
    /// Root attachment, if any
    pub attachment: Option<Attachment>,
    /// Aggregate statistics
    pub stats: ThreadStats,
}

impl Thread {
    /// Create a bare thread reference with unknown metadata
    pub fn new(board: &str, id: u64) -> Self {
        Self {
            id,
            board: board.to_string(),
            author: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            subject: None,
            content: None,
            sticky: false,
            closed: false,
            spoiler: false,
            attachment: None,
            stats: ThreadStats::default(),
        }
    }

    /// Display title: the subject, or an excerpt of the root post
    pub fn title(&self, max_len: usize) -> String {
        if let Some(subject) = self.subject.as_deref().filter(|s| !s.trim().is_empty()) {
            return subject.to_string();
        }

        let text = self
            .content
            .as_deref()
            .map(content::plain_text)
            .unwrap_or_default()
            .replace('\n', " ");

        if text.chars().count() <= max_len {
            text
        } else {
            let cut: String = text.chars().take(max_len.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }

    /// Whether this thread is the same as `(board, id)`
    pub fn is(&self, board: &str, id: u64) -> bool {
        self.id == id && self.board == board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prefers_subject() {
        let mut thread = Thread::new("g", 1);
        thread.subject = Some("Desktop thread".to_string());
        thread.content = Some("post your desktops".to_string());
        assert_eq!(thread.title(60), "Desktop thread");
    }

    #[test]
    fn test_title_excerpt() {
        let mut thread = Thread::new("g", 1);
        thread.subject = Some("  ".to_string());
        thread.content = Some("<span class=\"quote\">&gt;be me</span><br>write a long post".to_string());

        assert_eq!(thread.title(60), ">be me write a long post");
        assert_eq!(thread.title(10), ">be me ...");
    }

    #[test]
    fn test_is() {
        let thread = Thread::new("g", 1);
        assert!(thread.is("g", 1));
        assert!(!thread.is("v", 1));
        assert!(!thread.is("g", 2));
    }
}
