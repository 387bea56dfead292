use crate::{KnownFolderError, Result};

use std::path::PathBuf;

/// Answers where the desktop currently lives. Results are never cached.
pub trait LocationResolver: Send + Sync + 'static {
	fn resolve(&self) -> Result<PathBuf>;
}

/// Asks the OS: the known folder API on Windows, `user-dirs.dirs` on XDG systems.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopResolver;

impl LocationResolver for DesktopResolver {
	fn resolve(&self) -> Result<PathBuf> {
		dirs::desktop_dir().ok_or(KnownFolderError::DesktopUnresolved)
	}
}
