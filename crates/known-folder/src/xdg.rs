//! On XDG systems the desktop path lives in `$XDG_CONFIG_HOME/user-dirs.dirs`, so a
//! write to that file is our relocation notification.

use crate::{
	event::{AutoResetEvent, Wake},
	signal::ChangeSignal,
	KnownFolderError, Result,
};

use std::{
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, trace};

const USER_DIRS_FILE: &str = "user-dirs.dirs";

#[derive(Debug)]
pub struct UserDirsSignal {
	_watcher: RecommendedWatcher,
	user_dirs: PathBuf,
	armed: Arc<AtomicBool>,
	event: Arc<AutoResetEvent>,
}

impl UserDirsSignal {
	pub fn open() -> Result<Self> {
		Self::open_in(dirs::config_dir().ok_or(KnownFolderError::ConfigDirUnavailable)?)
	}

	/// Watches `config_dir` for changes to its `user-dirs.dirs`, which may not exist yet.
	pub fn open_in(config_dir: impl AsRef<Path>) -> Result<Self> {
		let config_dir = config_dir.as_ref();
		let user_dirs = config_dir.join(USER_DIRS_FILE);
		let armed = Arc::new(AtomicBool::new(false));
		let event = Arc::new(AutoResetEvent::new());

		let mut watcher = RecommendedWatcher::new(
			{
				let user_dirs = user_dirs.clone();
				let armed = Arc::clone(&armed);
				let event = Arc::clone(&event);
				move |result: notify::Result<Event>| match result {
					Ok(Event { kind, paths, .. })
						if !matches!(kind, EventKind::Access(_))
							&& paths.iter().any(|path| path == &user_dirs) =>
					{
						// Registrations are one-shot, a change while disarmed is lost
						if armed.swap(false, Ordering::AcqRel) {
							event.set();
						} else {
							trace!("User dirs changed while not armed");
						}
					}
					Ok(_) => {}
					Err(e) => error!(?e, "User dirs watcher error;"),
				}
			},
			Config::default(),
		)?;

		watcher.watch(config_dir, RecursiveMode::NonRecursive)?;

		Ok(Self {
			_watcher: watcher,
			user_dirs,
			armed,
			event,
		})
	}

	#[must_use]
	pub fn user_dirs_path(&self) -> &Path {
		&self.user_dirs
	}
}

impl ChangeSignal for UserDirsSignal {
	fn arm(&mut self) -> Result<()> {
		self.armed.store(true, Ordering::Release);
		Ok(())
	}

	fn wait(&mut self) -> Result<()> {
		self.event.wait();
		Ok(())
	}

	fn waker(&self) -> Arc<dyn Wake> {
		Arc::clone(&self.event) as Arc<dyn Wake>
	}
}
