//! Lnkreaper core: keeps the desktop free of shortcut files.
//!
//! The [`Reconciler`] binds the pieces together. It owns the
//! [`DirectoryWatcher`](lr_fs_watcher::DirectoryWatcher) pointed at the current desktop and
//! retargets it whenever the [`KnownFolderWatcher`](lr_known_folder::KnownFolderWatcher)
//! reports that the desktop may have moved.

mod config;
mod reconciler;

pub use config::ReaperConfig;
pub use reconciler::{Reconciler, ReconcilerError};

pub use lr_fs_watcher::{FileRemover, FsRemover, RetryPolicy};
pub use lr_known_folder::{
	open_platform_signal, ChangeSignal, DesktopResolver, LocationResolver, ManualSignal,
	ManualTrigger,
};
