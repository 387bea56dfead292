//! `HKCU\...\User Shell Folders` holds the desktop path, so a value write under that key
//! is our relocation notification.

use crate::{event::Wake, signal::ChangeSignal, KnownFolderError, Result};

use std::{ffi::OsStr, io, iter, os::windows::ffi::OsStrExt, ptr, sync::Arc};

use tracing::error;
use windows_sys::Win32::{
	Foundation::{CloseHandle, ERROR_SUCCESS, HANDLE, WAIT_OBJECT_0},
	System::{
		Registry::{
			RegCloseKey, RegNotifyChangeKeyValue, RegOpenKeyExW, HKEY, HKEY_CURRENT_USER,
			KEY_READ, REG_NOTIFY_CHANGE_LAST_SET,
		},
		Threading::{CreateEventW, SetEvent, WaitForSingleObject, INFINITE},
	},
};

const USER_SHELL_FOLDERS: &str =
	r"Software\Microsoft\Windows\CurrentVersion\Explorer\User Shell Folders";

/// Auto-reset kernel event, shared between the reader thread and its waker.
#[derive(Debug)]
struct OwnedEvent(HANDLE);

impl OwnedEvent {
	fn new() -> Result<Self> {
		// SAFETY: no security attributes and no name, auto-reset and initially unsignaled
		let handle = unsafe { CreateEventW(ptr::null(), 0, 0, ptr::null()) };
		if handle == 0 {
			return Err(KnownFolderError::CreateEvent(io::Error::last_os_error()));
		}

		Ok(Self(handle))
	}
}

impl Wake for OwnedEvent {
	fn wake(&self) {
		// SAFETY: the handle stays open for as long as this value lives
		if unsafe { SetEvent(self.0) } == 0 {
			error!(e = ?io::Error::last_os_error(), "Failed to signal change notification event;");
		}
	}
}

impl Drop for OwnedEvent {
	fn drop(&mut self) {
		// SAFETY: we own the handle and nobody can use it after this
		unsafe { CloseHandle(self.0) };
	}
}

#[derive(Debug)]
pub struct RegistrySignal {
	key: HKEY,
	event: Arc<OwnedEvent>,
}

impl RegistrySignal {
	pub fn open() -> Result<Self> {
		let sub_key = OsStr::new(USER_SHELL_FOLDERS)
			.encode_wide()
			.chain(iter::once(0))
			.collect::<Vec<_>>();

		let mut key: HKEY = 0;

		// SAFETY: `sub_key` is a nul terminated wide string that outlives the call
		let status =
			unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, sub_key.as_ptr(), 0, KEY_READ, &mut key) };
		if status != ERROR_SUCCESS {
			return Err(KnownFolderError::OpenKey(io::Error::from_raw_os_error(
				status as i32,
			)));
		}

		let event = match OwnedEvent::new() {
			Ok(event) => event,
			Err(e) => {
				// SAFETY: the key was just opened by us
				unsafe { RegCloseKey(key) };
				return Err(e);
			}
		};

		Ok(Self {
			key,
			event: Arc::new(event),
		})
	}
}

impl ChangeSignal for RegistrySignal {
	fn arm(&mut self) -> Result<()> {
		// SAFETY: key and event are both owned by `self`
		let status = unsafe {
			RegNotifyChangeKeyValue(self.key, 0, REG_NOTIFY_CHANGE_LAST_SET, self.event.0, 1)
		};
		if status != ERROR_SUCCESS {
			return Err(KnownFolderError::Notify(io::Error::from_raw_os_error(
				status as i32,
			)));
		}

		Ok(())
	}

	fn wait(&mut self) -> Result<()> {
		// SAFETY: the event handle is owned by `self`
		if unsafe { WaitForSingleObject(self.event.0, INFINITE) } != WAIT_OBJECT_0 {
			return Err(KnownFolderError::Wait(io::Error::last_os_error()));
		}

		Ok(())
	}

	fn waker(&self) -> Arc<dyn Wake> {
		Arc::clone(&self.event) as Arc<dyn Wake>
	}
}

impl Drop for RegistrySignal {
	fn drop(&mut self) {
		// SAFETY: we own the key and nobody can use it after this
		unsafe { RegCloseKey(self.key) };
	}
}
