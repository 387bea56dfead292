use crate::{event::Wake, signal::ChangeSignal, KnownFolderError, Result};

use lr_utils::ShutdownFlag;

use std::{fmt, sync::Arc, thread};

use async_channel as chan;
use tracing::{debug, error, trace};

const READER_THREAD_NAME: &str = "Registry Change Reader";

/// Posted into the host's dispatch channel whenever the desktop may have moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationChanged;

/// Blocks a dedicated thread on a [`ChangeSignal`] and posts a [`LocationChanged`] for
/// every firing.
///
/// Errors hit by the reader thread are kept until [`shutdown`](Self::shutdown), which
/// is where they surface.
pub struct KnownFolderWatcher {
	waker: Arc<dyn Wake>,
	shutdown: ShutdownFlag,
	handle: Option<thread::JoinHandle<Result<()>>>,
}

impl fmt::Debug for KnownFolderWatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KnownFolderWatcher")
			.field("shutdown", &self.shutdown)
			.field("is_running", &self.handle.is_some())
			.finish_non_exhaustive()
	}
}

impl KnownFolderWatcher {
	pub fn new(
		signal: impl ChangeSignal,
		changes_tx: chan::Sender<LocationChanged>,
		shutdown: ShutdownFlag,
	) -> Result<Self> {
		let waker = signal.waker();

		let handle = thread::Builder::new()
			.name(READER_THREAD_NAME.to_string())
			.spawn({
				let shutdown = shutdown.clone();
				move || read_changes(signal, &changes_tx, &shutdown)
			})
			.map_err(KnownFolderError::Spawn)?;

		debug!("Known folder watcher started");

		Ok(Self {
			waker,
			shutdown,
			handle: Some(handle),
		})
	}

	/// Stops the reader thread and reports whatever went wrong on it.
	pub fn shutdown(mut self) -> Result<()> {
		self.stop()
	}

	fn stop(&mut self) -> Result<()> {
		let Some(handle) = self.handle.take() else {
			return Ok(());
		};

		self.shutdown.trigger();
		self.waker.wake();

		match handle.join() {
			Ok(Ok(())) => {
				debug!("Known folder watcher stopped");
				Ok(())
			}
			Ok(Err(e)) => Err(KnownFolderError::ReadThread(Box::new(e))),
			Err(_) => Err(KnownFolderError::ThreadPanicked),
		}
	}
}

impl Drop for KnownFolderWatcher {
	fn drop(&mut self) {
		if let Err(e) = self.stop() {
			error!(%e, "Known folder watcher failed;");
		}
	}
}

fn read_changes(
	mut signal: impl ChangeSignal,
	changes_tx: &chan::Sender<LocationChanged>,
	shutdown: &ShutdownFlag,
) -> Result<()> {
	loop {
		signal.arm()?;
		signal.wait()?;

		if shutdown.is_set() {
			trace!("Shutting down known folder reader");
			return Ok(());
		}

		trace!("Known folder configuration changed");

		// Never blocks, the channel is unbounded
		if changes_tx.send_blocking(LocationChanged).is_err() {
			debug!("Nobody listens to location changes anymore, stopping reader");
			return Ok(());
		}
	}
}
