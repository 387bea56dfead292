use crate::classify::is_shortcut;

use lr_utils::{error::FileIOError, ShutdownFlag};

use std::{
	fmt, io,
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use async_trait::async_trait;
use tokio::{fs, spawn, time::sleep};
use tracing::{debug, info, instrument, trace, warn, Instrument};

const HUNDRED_MILLIS: Duration = Duration::from_millis(100);

/// How many times a deletion is attempted and how long to back off before each attempt.
///
/// The delay before attempt `n` (zero based) is `base_delay + step * n`, so with the
/// defaults the sleeps are 100ms, 200ms, ... 1000ms. Shell processes that briefly hold
/// a new shortcut open (icon and thumbnail caches mostly) get more time on every retry.
///
/// Delays saturate instead of overflowing, and a [`Deleter`] always makes at least one
/// attempt whatever `max_attempts` says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub step: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 10,
			base_delay: HUNDRED_MILLIS,
			step: HUNDRED_MILLIS,
		}
	}
}

impl RetryPolicy {
	#[must_use]
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.base_delay
			.saturating_add(self.step.saturating_mul(attempt))
	}
}

/// The filesystem call a [`Deleter`] retries.
#[async_trait]
pub trait FileRemover: Send + Sync + 'static {
	async fn remove_file(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

#[async_trait]
impl FileRemover for FsRemover {
	async fn remove_file(&self, path: &Path) -> io::Result<()> {
		fs::remove_file(path).await
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeletionOutcome {
	Rejected,
	Deleted { attempt: u32 },
	AlreadyGone { attempt: u32 },
	Abandoned { attempt: u32 },
	Exhausted,
}

/// Deletes shortcut files on detached tasks, retrying while they are locked.
///
/// Callers never learn how a deletion went: success and final failure both end
/// up in the logs only.
#[derive(Clone)]
pub struct Deleter {
	policy: RetryPolicy,
	remover: Arc<dyn FileRemover>,
	shutdown: ShutdownFlag,
}

impl fmt::Debug for Deleter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deleter")
			.field("policy", &self.policy)
			.field("shutdown", &self.shutdown)
			.finish_non_exhaustive()
	}
}

impl Deleter {
	#[must_use]
	pub fn new(policy: RetryPolicy, shutdown: ShutdownFlag) -> Self {
		Self::with_remover(policy, shutdown, Arc::new(FsRemover))
	}

	#[must_use]
	pub fn with_remover(
		policy: RetryPolicy,
		shutdown: ShutdownFlag,
		remover: Arc<dyn FileRemover>,
	) -> Self {
		Self {
			policy: RetryPolicy {
				max_attempts: policy.max_attempts.max(1),
				..policy
			},
			remover,
			shutdown,
		}
	}

	/// Fire and forget: schedules the deletion of `path` and returns immediately.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(&self, path: PathBuf) {
		let this = self.clone();
		spawn(
			async move {
				this.delete(path).await;
			}
			.in_current_span(),
		);
	}

	#[instrument(skip(self, path), fields(path = %path.display()))]
	pub(crate) async fn delete(&self, path: PathBuf) -> DeletionOutcome {
		// Queued work may refer to a path that stopped matching after a race
		if !is_shortcut(&path) {
			trace!("Not a shortcut anymore, skipping");
			return DeletionOutcome::Rejected;
		}

		debug!("Attempting to delete shortcut");

		let last_attempt = self.policy.max_attempts.saturating_sub(1);

		for attempt in 0..self.policy.max_attempts {
			sleep(self.policy.delay_for(attempt)).await;

			if self.shutdown.is_set() {
				trace!(attempt, "Shutting down, abandoning deletion;");
				return DeletionOutcome::Abandoned { attempt };
			}

			match self.remover.remove_file(&path).await {
				Ok(()) => {
					info!(attempt, "Deleted shortcut;");
					return DeletionOutcome::Deleted { attempt };
				}
				Err(e) if e.kind() == io::ErrorKind::NotFound => {
					debug!(attempt, "Shortcut already gone;");
					return DeletionOutcome::AlreadyGone { attempt };
				}
				Err(e) if attempt < last_attempt => {
					trace!(attempt, ?e, "Failed to delete shortcut, will retry;");
				}
				Err(e) => {
					warn!(
						attempt,
						e = %FileIOError::from((&path, e, "delete shortcut")),
						"Giving up on shortcut;",
					);
				}
			}
		}

		DeletionOutcome::Exhausted
	}
}
