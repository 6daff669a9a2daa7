//! # Lurk
//!
//! A terminal imageboard reader that watches threads for new replies.
//!
//! ## Overview
//!
//! Lurk browses boards, catalogs and threads of a 4chan-compatible JSON API
//! and keeps a watch-list of threads. A background poller refreshes every
//! watched thread, counts unseen replies and notices archived or deleted
//! threads. Post markup is normalized into styled terminal text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          CLI                                │
//! │      Loads config and watch-list, runs the poll loop        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Config      │ │       API       │ │     Content     │
//! │                 │ │                 │ │                 │
//! │ • Load/Save     │ │ • 4chan JSON    │ │ • Reply links   │
//! │ • Theme         │ │ • Typed errors  │ │ • Code blocks   │
//! │ • Intervals     │ │ • Api trait     │ │ • Styled text   │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    Database     │ │     Watcher     │ │     Models      │
//! │                 │ │                 │ │                 │
//! │ • Watch-list    │ │ • Timer         │ │ • Board         │
//! │ • Schema        │ │ • Fan-out poll  │ │ • Thread, Post  │
//! │   version       │ │ • Activity      │ │ • Watched       │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: Imageboard API client (4chan)
//! - [`config`]: Configuration management
//! - [`content`]: Post markup normalization
//! - [`db`]: `SQLite` storage for the watch-list
//! - [`models`]: Data models (Board, Thread, Post, `WatchedThread`)
//! - [`paths`]: Data directory layout
//! - [`theme`]: Theme support via ratatui-themes
//! - [`watcher`]: Background thread polling
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lurk::{Config, FourChanClient, ThreadWatcher, WatchStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let api = Arc::new(FourChanClient::from_config(&config)?);
//!     let store = Arc::new(WatchStore::default());
//!
//!     let watcher = ThreadWatcher::new(api, store, config.watch_interval());
//!     let report = watcher.poll_once().await;
//!     println!("{} threads polled", report.polled);
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/lurk/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::similar_names)]
#![allow(clippy::if_same_then_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::branches_sharing_code)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod config;
pub mod content;
pub mod db;
pub mod models;
pub mod paths;
pub mod theme;
pub mod watcher;

// Re-export main types for convenience
pub use api::{ApiError, FourChanClient, ImageboardApi};
pub use config::Config;
pub use content::ContentProvider;
pub use db::{Database, StoreError};
pub use models::{Board, Post, Thread, WatchList, WatchedThread};
pub use theme::{Theme, ThemeColors};
pub use watcher::{NewActivity, ThreadWatcher, WatchStore};

// Re-export theme types from ratatui-themes crate
pub use ratatui_themes::{ThemeName, ThemePalette};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
