//! Post model

use chrono::{DateTime, Utc};
use ratatui::text::Text;
use serde::{Deserialize, Serialize};

use super::{Thread, ThreadStats};

/// A single post in a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Post number (globally unique in practice)
    pub id: u64,
    /// Number of the thread this post belongs to
    pub thread_id: u64,
    /// Owning board identifier
    pub board: String,
    /// Whether this post started the thread
    pub is_root: bool,
    /// Author name
    pub author: String,
    /// Tripcode, if the author used one
    pub tripcode: Option<String>,
    /// When the post was made
    pub created_at: DateTime<Utc>,
    /// Subject line (root posts mostly)
    pub subject: Option<String>,
    /// Markup as returned by the server
    pub content_raw: Option<String>,
    /// Normalized markup (set by the content pipeline)
    pub content: Option<String>,
    /// Styled body for display (set by the content pipeline)
    #[serde(skip)]
    pub body: Text<'static>,
    /// Pinned thread
    pub sticky: bool,
    /// Closed thread
    pub closed: bool,
    /// Attachment is spoilered
    pub spoiler: bool,
    /// Attachment, if any
    pub attachment: Option<Attachment>,
    /// Thread statistics, only carried by the root post
    pub stats: Option<ThreadStats>,
    /// Thread has been archived (reported on the root post)
    pub archived: bool,
    /// When the thread was archived
    pub archived_at: Option<DateTime<Utc>>,
    /// Posts in the same batch that reply to this one
    pub replies: Vec<u64>,
}

/// File attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Server-side media identifier (upload timestamp)
    pub media_id: i64,
    /// Original filename without extension
    pub filename: String,
    /// Extension including the dot, e.g. `.png`
    pub extension: String,
    /// File size in bytes
    pub size: u64,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Thumbnail width
    pub thumbnail_width: u32,
    /// Thumbnail height
    pub thumbnail_height: u32,
    /// File was deleted by staff
    pub deleted: bool,
}

impl Attachment {
    /// Full media URL under `media_url` for `board`
    pub fn url(&self, media_url: &str, board: &str) -> String {
        format!(
            "{}/{}/{}{}",
            media_url.trim_end_matches('/'),
            board,
            self.media_id,
            self.extension
        )
    }

    /// Thumbnail URL under `media_url` for `board`
    pub fn thumbnail_url(&self, media_url: &str, board: &str) -> String {
        format!(
            "{}/{}/{}s.jpg",
            media_url.trim_end_matches('/'),
            board,
            self.media_id
        )
    }

    /// Original filename with extension
    pub fn display_name(&self) -> String {
        format!("{}{}", self.filename, self.extension)
    }
}

impl Post {
    /// Create an empty post
    pub fn new(board: &str, thread_id: u64, id: u64) -> Self {
        Self {
            id,
            thread_id,
            board: board.to_string(),
            is_root: id == thread_id,
            author: String::new(),
            tripcode: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            subject: None,
            content_raw: None,
            content: None,
            body: Text::default(),
            sticky: false,
            closed: false,
            spoiler: false,
            attachment: None,
            stats: None,
            archived: false,
            archived_at: None,
            replies: Vec::new(),
        }
    }

    /// Build the thread snapshot described by a root post
    pub fn to_thread(&self) -> Thread {
        Thread {
            id: self.thread_id,
            board: self.board.clone(),
            author: self.author.clone(),
            created_at: self.created_at,
            subject: self.subject.clone(),
            content: self.content_raw.clone(),
            sticky: self.sticky,
            closed: self.closed,
            spoiler: self.spoiler,
            attachment: self.attachment.clone(),
            stats: self.stats.clone().unwrap_or_default(),
        }
    }

    /// Get relative time string (e.g., "5m", "2h", "3d")
    pub fn relative_time(&self) -> String {
        let now = Utc::now();
        let duration = now.signed_duration_since(self.created_at);

        if duration.num_seconds() < 60 {
            format!("{}s", duration.num_seconds())
        } else if duration.num_minutes() < 60 {
            format!("{}m", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d", duration.num_days())
        } else {
            self.created_at.format("%b %d").to_string()
        }
    }
}
