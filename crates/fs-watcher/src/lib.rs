//! Shortcut sweeping for a single directory.
//!
//! [`DirectoryWatcher`] observes one directory and hands every newly created or
//! modified shortcut file to a [`Deleter`], which removes it on a detached task
//! while backing off from whoever still has the file open.

mod classify;
mod deleter;
mod error;
mod watcher;

pub use classify::{is_shortcut, SHORTCUT_EXTENSIONS};
pub use deleter::{Deleter, FileRemover, FsRemover, RetryPolicy};
pub use error::FsWatcherError;
pub use watcher::DirectoryWatcher;

pub type Result<T> = std::result::Result<T, FsWatcherError>;
