use crate::ReaperConfig;

use lr_fs_watcher::{Deleter, DirectoryWatcher, FileRemover, FsRemover, FsWatcherError};
use lr_known_folder::{
	ChangeSignal, KnownFolderError, KnownFolderWatcher, LocationChanged, LocationResolver,
};
use lr_utils::{error::report_error, ShutdownFlag};

use std::{sync::Arc, time::Duration};

use async_channel as chan;
use thiserror::Error;
use tokio::{
	spawn,
	task::{spawn_blocking, JoinError, JoinHandle},
	time::sleep,
};
use tracing::{debug, error, info, instrument, Instrument};

#[derive(Error, Debug)]
pub enum ReconcilerError {
	#[error("Unable to resolve the desktop directory at startup: {0}")]
	ResolveDesktop(#[source] KnownFolderError),
	#[error(transparent)]
	FsWatcher(#[from] FsWatcherError),
	#[error(transparent)]
	KnownFolder(#[from] KnownFolderError),
	#[error("Failed to join reconciler task: {0}")]
	TaskJoin(#[from] JoinError),
}

/// Keeps one [`DirectoryWatcher`] pointed at wherever the desktop currently is.
///
/// Location changes are handled one at a time on a single task, in the order the
/// [`KnownFolderWatcher`] posted them.
#[derive(Debug)]
pub struct Reconciler {
	shutdown: ShutdownFlag,
	known_folder: KnownFolderWatcher,
	handle: JoinHandle<DirectoryWatcher>,
}

impl Reconciler {
	/// Sweeps the current desktop and starts following it.
	pub async fn start(
		config: ReaperConfig,
		resolver: impl LocationResolver,
		signal: impl ChangeSignal,
	) -> Result<Self, ReconcilerError> {
		Self::start_with_remover(config, resolver, signal, Arc::new(FsRemover)).await
	}

	/// Same as [`start`](Self::start), deleting shortcuts through `remover`.
	#[instrument(name = "reconciler", skip_all)]
	pub async fn start_with_remover(
		config: ReaperConfig,
		resolver: impl LocationResolver,
		signal: impl ChangeSignal,
		remover: Arc<dyn FileRemover>,
	) -> Result<Self, ReconcilerError> {
		let shutdown = ShutdownFlag::new();

		let desktop = resolver
			.resolve()
			.map_err(ReconcilerError::ResolveDesktop)?;
		info!(desktop = %desktop.display(), "Watching desktop;");

		let dir_watcher = DirectoryWatcher::new(
			desktop,
			Deleter::with_remover(config.retry, shutdown.clone(), remover),
			shutdown.clone(),
		)
		.await?;

		let (changes_tx, changes_rx) = chan::unbounded();

		let known_folder = match KnownFolderWatcher::new(signal, changes_tx, shutdown.clone()) {
			Ok(known_folder) => known_folder,
			Err(e) => {
				dir_watcher.dispose().await;
				return Err(e.into());
			}
		};

		let handle = spawn(
			reconcile(
				changes_rx,
				dir_watcher,
				resolver,
				config.debounce,
				shutdown.clone(),
			)
			.in_current_span(),
		);

		Ok(Self {
			shutdown,
			known_folder,
			handle,
		})
	}

	/// Tears everything down, surfacing errors the change reader kept to itself.
	///
	/// The shutdown flag goes up first so neither watcher acts on a disposed
	/// [`DirectoryWatcher`]. Deletions sleeping in their backoff notice it when they
	/// wake up, they are not waited for.
	pub async fn shutdown(self) -> Result<(), ReconcilerError> {
		let Self {
			shutdown,
			known_folder,
			handle,
		} = self;

		shutdown.trigger();

		let known_folder_res = spawn_blocking(move || known_folder.shutdown()).await?;

		// With the reader thread gone the change channel is closed, ending the task
		handle.await?.dispose().await;

		debug!("Reconciler stopped");

		known_folder_res.map_err(Into::into)
	}
}

/// Follows location changes until the change channel closes, handing the watcher back
/// for disposal.
///
/// A channel closed without the shutdown flag means the change reader died: the
/// desktop stays watched where it is, relocations go unnoticed until teardown.
async fn reconcile(
	changes_rx: chan::Receiver<LocationChanged>,
	mut dir_watcher: DirectoryWatcher,
	resolver: impl LocationResolver,
	debounce: Duration,
	shutdown: ShutdownFlag,
) -> DirectoryWatcher {
	while let Ok(LocationChanged) = changes_rx.recv().await {
		if shutdown.is_set() {
			break;
		}

		// Superstitious: the change may be reported before the new path reads back
		sleep(debounce).await;

		if shutdown.is_set() {
			break;
		}

		match resolver.resolve() {
			Ok(desktop) => report_error(&dir_watcher.retarget(desktop).await.map(|_| ())),
			Err(e) => error!(%e, "Could not retrieve desktop dir path;"),
		}
	}

	if !shutdown.is_set() {
		let desktop = dir_watcher.current_path().await;
		error!(
			desktop = %desktop.display(),
			"Known folder watcher stopped, desktop relocations won't be followed anymore;",
		);
	}

	dir_watcher
}
