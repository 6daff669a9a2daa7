//! Board model

use serde::{Deserialize, Serialize};

/// A board (topic partition of the imageboard)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board identifier, e.g. `g`
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Short description of the board
    pub description: String,
    /// Whether `[code]` blocks are rendered on this board
    pub code_tags: bool,
    /// Whether spoiler markup is enabled
    pub spoilers: bool,
    /// Whether the board is work-safe
    pub worksafe: bool,
    /// Number of catalog pages
    pub pages: u32,
    /// Threads per catalog page
    pub per_page: u32,
}

impl Board {
    /// Create a board with default capabilities
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            code_tags: false,
            spoilers: false,
            worksafe: true,
            pages: 10,
            per_page: 15,
        }
    }

    /// Whether code-block highlighting applies to posts on this board
    pub const fn supports_code(&self) -> bool {
        self.code_tags
    }

    /// Path-style label, e.g. `/g/`
    pub fn path(&self) -> String {
        format!("/{}/", self.id)
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/ - {}", self.id, self.title)
    }
}
