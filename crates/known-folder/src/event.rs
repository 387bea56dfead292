use std::sync::{Condvar, Mutex, PoisonError};

/// Something a blocked change reader can be woken up with.
pub trait Wake: Send + Sync + 'static {
	fn wake(&self);
}

/// A set releases exactly one waiter, then the event resets itself.
///
/// Sets with nobody waiting are remembered, but only once: two sets before the next
/// wait are seen as one.
#[derive(Debug, Default)]
pub struct AutoResetEvent {
	signaled: Mutex<bool>,
	condvar: Condvar,
}

impl AutoResetEvent {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self) {
		*self.signaled.lock().unwrap_or_else(PoisonError::into_inner) = true;
		self.condvar.notify_one();
	}

	pub fn wait(&self) {
		let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
		while !*signaled {
			signaled = self
				.condvar
				.wait(signaled)
				.unwrap_or_else(PoisonError::into_inner);
		}
		*signaled = false;
	}
}

impl Wake for AutoResetEvent {
	fn wake(&self) {
		self.set();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::{sync::Arc, thread, time::Duration};

	#[test]
	fn set_before_wait_is_remembered_once() {
		let event = AutoResetEvent::new();
		event.set();
		event.set();

		event.wait();

		assert!(!*event.signaled.lock().unwrap());
	}

	#[test]
	fn set_releases_blocked_waiter() {
		let event = Arc::new(AutoResetEvent::new());

		let waiter = thread::spawn({
			let event = Arc::clone(&event);
			move || event.wait()
		});

		thread::sleep(Duration::from_millis(50));
		event.wake();

		waiter.join().unwrap();
	}
}
