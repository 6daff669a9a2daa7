//! Data models for Lurk

mod board;
mod post;
mod thread;
mod watched;

pub use board::Board;
pub use post::{Attachment, Post};
pub use thread::{Thread, ThreadStats};
pub use watched::{WatchList, WatchedThread};
