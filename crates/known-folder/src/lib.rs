//! Desktop location tracking.
//!
//! The desktop is a user-configurable known folder, so its path may change while we
//! run. [`KnownFolderWatcher`] parks a thread on the platform's "configuration changed"
//! notification and posts a [`LocationChanged`] for every firing; [`LocationResolver`]
//! answers where the desktop currently is.

mod error;
mod event;
mod resolve;
mod signal;
mod watcher;

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod xdg;

pub use error::KnownFolderError;
pub use event::{AutoResetEvent, Wake};
pub use resolve::{DesktopResolver, LocationResolver};
pub use signal::{ChangeSignal, ManualSignal, ManualTrigger};
pub use watcher::{KnownFolderWatcher, LocationChanged};

#[cfg(windows)]
pub use windows::RegistrySignal;

#[cfg(not(windows))]
pub use xdg::UserDirsSignal;

#[cfg(windows)]
pub type PlatformSignal = RegistrySignal;

#[cfg(not(windows))]
pub type PlatformSignal = UserDirsSignal;

pub type Result<T> = std::result::Result<T, KnownFolderError>;

/// Opens the change notification for the platform's known folder configuration.
///
/// Failing here is not retried, the configuration store is expected to always exist.
pub fn open_platform_signal() -> Result<PlatformSignal> {
	PlatformSignal::open()
}
