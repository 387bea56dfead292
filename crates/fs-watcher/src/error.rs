use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsWatcherError {
	#[error("Watcher error: (error: {0})")]
	Watcher(#[from] notify::Error),
}
