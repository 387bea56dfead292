use crate::{classify::is_shortcut, deleter::Deleter, Result};

use lr_utils::{error::FileIOError, ShutdownFlag};

use std::{
	path::{Path, PathBuf},
	pin::pin,
	sync::Arc,
};

use async_channel as chan;
use futures::StreamExt;
use futures_concurrency::stream::Merge;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::{fs, spawn, sync::RwLock, task::JoinHandle};
use tracing::{debug, error, info, instrument, trace, Instrument};

/// Watches one directory and deletes the shortcut files that show up in it.
///
/// The current target sits behind a lock: event handling takes it for reading, a
/// [`retarget`](Self::retarget) takes it for writing, which suspends event
/// delivery for the whole swap.
#[derive(Debug)]
pub struct DirectoryWatcher {
	watcher: RecommendedWatcher,
	target: Arc<RwLock<PathBuf>>,
	deleter: Deleter,
	shutdown: ShutdownFlag,
	handle: Option<JoinHandle<()>>,
	stop_tx: chan::Sender<()>,
}

impl DirectoryWatcher {
	/// Starts watching `path`, then sweeps the shortcuts already in it.
	#[instrument(
		name = "directory_watcher",
		skip(path, deleter, shutdown),
		fields(path = %path.display()),
	)]
	pub async fn new(path: PathBuf, deleter: Deleter, shutdown: ShutdownFlag) -> Result<Self> {
		let (events_tx, events_rx) = chan::unbounded();
		let (stop_tx, stop_rx) = chan::bounded(1);

		let mut watcher = RecommendedWatcher::new(
			move |result: notify::Result<Event>| {
				if !events_tx.is_closed() {
					// Never blocks, the channel is unbounded
					if events_tx.send_blocking(result).is_err() {
						error!("Unable to send watcher event to directory watcher;");
					}
				} else {
					trace!("Directory watcher is gone, dropping file system event");
				}
			},
			Config::default(),
		)?;

		watcher.watch(&path, RecursiveMode::NonRecursive)?;
		trace!("Now watching directory");

		let target = Arc::new(RwLock::new(path));

		let handle = spawn(
			handle_watch_events(
				events_rx,
				stop_rx,
				Arc::clone(&target),
				deleter.clone(),
				shutdown.clone(),
			)
			.in_current_span(),
		);

		let this = Self {
			watcher,
			target,
			deleter,
			shutdown,
			handle: Some(handle),
			stop_tx,
		};

		sweep(&*this.target.read().await, &this.deleter, &this.shutdown).await;

		Ok(this)
	}

	pub async fn current_path(&self) -> PathBuf {
		self.target.read().await.clone()
	}

	/// Points the watcher at `new_path` and sweeps it.
	///
	/// Returns `Ok(false)` when there was nothing to do: the path is unchanged or the
	/// watcher was disposed. If `new_path` can't be watched the old target stays in place.
	#[instrument(skip(self, new_path), fields(new_path = %new_path.display()))]
	pub async fn retarget(&mut self, new_path: PathBuf) -> Result<bool> {
		let mut target = self.target.write().await;

		if self.shutdown.is_set() {
			return Ok(false);
		}

		if *target == new_path {
			trace!("Directory unchanged");
			return Ok(false);
		}

		self.watcher.watch(&new_path, RecursiveMode::NonRecursive)?;

		if let Err(e) = self.watcher.unwatch(&target) {
			// The old directory may have been moved or deleted along with the relocation
			error!(?e, old_path = %target.display(), "Unable to unwatch previous directory;");
		}

		info!(old_path = %target.display(), "Desktop path changed;");

		*target = new_path;

		sweep(&target, &self.deleter, &self.shutdown).await;

		Ok(true)
	}

	/// Marks everything inert: queued events, sweeps and backing off deletions are dropped.
	pub async fn dispose(mut self) {
		self.shutdown.trigger();

		if let Some(handle) = self.handle.take() {
			if self.stop_tx.send(()).await.is_err() {
				trace!("Directory watcher event task already gone");
			}

			if let Err(e) = handle.await {
				error!(?e, "Failed to join directory watcher task;");
			}
		}

		debug!("Directory watcher disposed");
	}
}

impl Drop for DirectoryWatcher {
	fn drop(&mut self) {
		if self.handle.take().is_some() {
			self.shutdown.trigger();
			// The task also stops by itself once the notify watcher drops its sender
			if let Err(e) = self.stop_tx.try_send(()) {
				trace!(?e, "Directory watcher event task already gone or stopping");
			}
		}
	}
}

async fn handle_watch_events(
	events_rx: chan::Receiver<notify::Result<Event>>,
	stop_rx: chan::Receiver<()>,
	target: Arc<RwLock<PathBuf>>,
	deleter: Deleter,
	shutdown: ShutdownFlag,
) {
	enum StreamMessage {
		NewEvent(notify::Result<Event>),
		Stop,
	}

	let mut msg_stream = pin!((
		events_rx.map(StreamMessage::NewEvent),
		stop_rx.map(|()| StreamMessage::Stop),
	)
		.merge());

	while let Some(msg) = msg_stream.next().await {
		match msg {
			StreamMessage::NewEvent(Ok(event)) => {
				let target = target.read().await;

				if shutdown.is_set() {
					trace!("Disposed, discarding file system event");
					continue;
				}

				handle_single_event(event, &target, &deleter);
			}

			StreamMessage::NewEvent(Err(e)) => error!(?e, "Watcher error;"),

			StreamMessage::Stop => {
				debug!("Stopping directory watcher event handler");
				break;
			}
		}
	}
}

fn handle_single_event(event: Event, target: &Path, deleter: &Deleter) {
	// A shortcut may be created empty and get its content on a later write
	if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
		return;
	}

	for path in event.paths {
		if path.parent() != Some(target) {
			trace!(path = %path.display(), "Event outside the watched directory, ignoring");
			continue;
		}

		if is_shortcut(&path) {
			deleter.spawn(path);
		}
	}
}

/// Hands every shortcut currently in `dir` to the deleter.
#[instrument(skip(deleter, shutdown))]
async fn sweep(dir: &Path, deleter: &Deleter, shutdown: &ShutdownFlag) {
	debug!("Clearing directory");

	if let Err(e) = try_sweep(dir, deleter, shutdown).await {
		error!(%e, "Failed to sweep directory;");
	}
}

async fn try_sweep(
	dir: &Path,
	deleter: &Deleter,
	shutdown: &ShutdownFlag,
) -> std::result::Result<(), FileIOError> {
	let mut read_dir = fs::read_dir(dir)
		.await
		.map_err(|e| FileIOError::from((dir, e, "read directory")))?;

	while let Some(entry) = read_dir
		.next_entry()
		.await
		.map_err(|e| FileIOError::from((dir, e, "read directory entry")))?
	{
		if shutdown.is_set() {
			return Ok(());
		}

		let path = entry.path();

		let is_file = entry
			.file_type()
			.await
			.map_err(|e| FileIOError::from((&path, e, "read file type")))?
			.is_file();

		if is_file && is_shortcut(&path) {
			deleter.spawn(path);
		}
	}

	Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
	use super::*;

	use crate::RetryPolicy;

	use std::time::Duration;

	use tempfile::tempdir;
	use tokio::time::sleep;

	fn fast_deleter(shutdown: &ShutdownFlag) -> Deleter {
		Deleter::new(
			RetryPolicy {
				max_attempts: 5,
				base_delay: Duration::from_millis(10),
				step: Duration::from_millis(10),
			},
			shutdown.clone(),
		)
	}

	async fn wait_until_gone(path: &Path) -> bool {
		for _ in 0..100 {
			if !path.exists() {
				return true;
			}
			sleep(Duration::from_millis(50)).await;
		}
		false
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn sweep_deletes_preexisting_shortcuts_only() {
		let dir = tempdir().unwrap();
		let link = dir.path().join("shortcut.lnk");
		let appref = dir.path().join("app.appref-ms");
		let notes = dir.path().join("notes.txt");
		for path in [&link, &appref, &notes] {
			fs::write(path, b"content").await.unwrap();
		}

		let shutdown = ShutdownFlag::new();
		let watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		assert!(wait_until_gone(&link).await);
		assert!(wait_until_gone(&appref).await);
		sleep(Duration::from_millis(200)).await;
		assert!(notes.exists());

		watcher.dispose().await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn live_shortcut_is_deleted() {
		let dir = tempdir().unwrap();

		let shutdown = ShutdownFlag::new();
		let watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		let link = dir.path().join("Installer Created.LNK");
		let notes = dir.path().join("notes.txt");
		fs::write(&link, b"content").await.unwrap();
		fs::write(&notes, b"content").await.unwrap();

		assert!(wait_until_gone(&link).await);
		sleep(Duration::from_millis(200)).await;
		assert!(notes.exists());

		watcher.dispose().await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn retarget_sweeps_new_directory_and_drops_old_one() {
		let old_dir = tempdir().unwrap();
		let new_dir = tempdir().unwrap();

		let waiting = new_dir.path().join("waiting.lnk");
		fs::write(&waiting, b"content").await.unwrap();

		let shutdown = ShutdownFlag::new();
		let mut watcher = DirectoryWatcher::new(
			old_dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		sleep(Duration::from_millis(200)).await;
		assert!(waiting.exists());

		assert!(watcher
			.retarget(new_dir.path().to_path_buf())
			.await
			.unwrap());
		assert_eq!(watcher.current_path().await, new_dir.path());
		assert!(wait_until_gone(&waiting).await);

		let late = old_dir.path().join("late.lnk");
		fs::write(&late, b"content").await.unwrap();
		sleep(Duration::from_millis(500)).await;
		assert!(late.exists());

		let fresh = new_dir.path().join("fresh.lnk");
		fs::write(&fresh, b"content").await.unwrap();
		assert!(wait_until_gone(&fresh).await);

		watcher.dispose().await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn retarget_to_same_path_is_a_no_op() {
		let dir = tempdir().unwrap();

		let shutdown = ShutdownFlag::new();
		let mut watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		assert!(!watcher.retarget(dir.path().to_path_buf()).await.unwrap());
		assert_eq!(watcher.current_path().await, dir.path());

		watcher.dispose().await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn failed_retarget_keeps_previous_target() {
		let dir = tempdir().unwrap();

		let shutdown = ShutdownFlag::new();
		let mut watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		let missing = dir.path().join("does-not-exist");
		assert!(watcher.retarget(missing).await.is_err());
		assert_eq!(watcher.current_path().await, dir.path());

		let link = dir.path().join("still-watched.lnk");
		fs::write(&link, b"content").await.unwrap();
		assert!(wait_until_gone(&link).await);

		watcher.dispose().await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn disposed_watcher_is_inert() {
		let dir = tempdir().unwrap();

		let shutdown = ShutdownFlag::new();
		let watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		watcher.dispose().await;
		assert!(shutdown.is_set());

		let link = dir.path().join("after.lnk");
		fs::write(&link, b"content").await.unwrap();
		sleep(Duration::from_millis(500)).await;
		assert!(link.exists());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn dropped_watcher_is_inert() {
		let dir = tempdir().unwrap();

		let shutdown = ShutdownFlag::new();
		let watcher = DirectoryWatcher::new(
			dir.path().to_path_buf(),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.unwrap();

		drop(watcher);
		assert!(shutdown.is_set());

		let link = dir.path().join("after-drop.lnk");
		fs::write(&link, b"content").await.unwrap();
		sleep(Duration::from_millis(500)).await;
		assert!(link.exists());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn watching_a_missing_directory_fails() {
		let dir = tempdir().unwrap();
		let shutdown = ShutdownFlag::new();

		assert!(DirectoryWatcher::new(
			dir.path().join("nope"),
			fast_deleter(&shutdown),
			shutdown.clone(),
		)
		.await
		.is_err());
	}
}
