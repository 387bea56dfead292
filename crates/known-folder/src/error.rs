use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnownFolderError {
	#[error("Could not open User Shell Folders key: (error: {0})")]
	OpenKey(#[source] io::Error),
	#[error("Unable to create change notification event: (error: {0})")]
	CreateEvent(#[source] io::Error),
	#[error("Unable to register for known folder change notifications: (error: {0})")]
	Notify(#[source] io::Error),
	#[error("Failed waiting for a known folder change notification: (error: {0})")]
	Wait(#[source] io::Error),

	#[error("Could not determine the user configuration directory")]
	ConfigDirUnavailable,
	#[error("Could not resolve the desktop directory")]
	DesktopUnresolved,

	#[cfg(not(windows))]
	#[error("Watcher error: (error: {0})")]
	Watcher(#[from] notify::Error),

	#[error("Unable to spawn registry change reader thread: (error: {0})")]
	Spawn(#[source] io::Error),
	#[error("Exception from read thread: {0}")]
	ReadThread(#[source] Box<KnownFolderError>),
	#[error("Registry change reader thread panicked")]
	ThreadPanicked,
}
