use crate::{
	event::{AutoResetEvent, Wake},
	Result,
};

use std::sync::Arc;

/// A one-shot "configuration changed" registration that a thread can block on.
///
/// Each [`arm`](Self::arm) registers for the next change only, so the reader re-arms
/// after every firing. Changes landing between a firing and the next arm are missed.
pub trait ChangeSignal: Send + 'static {
	fn arm(&mut self) -> Result<()>;

	/// Blocks until the armed registration fires or the [`waker`](Self::waker) is used.
	fn wait(&mut self) -> Result<()>;

	fn waker(&self) -> Arc<dyn Wake>;
}

/// A signal fired from code, for hosts that learn about relocations on their own.
#[derive(Debug)]
pub struct ManualSignal {
	event: Arc<AutoResetEvent>,
}

#[derive(Debug, Clone)]
pub struct ManualTrigger {
	event: Arc<AutoResetEvent>,
}

impl ManualSignal {
	#[must_use]
	pub fn new() -> (Self, ManualTrigger) {
		let event = Arc::new(AutoResetEvent::new());

		(
			Self {
				event: Arc::clone(&event),
			},
			ManualTrigger { event },
		)
	}
}

impl ManualTrigger {
	pub fn fire(&self) {
		self.event.set();
	}
}

impl ChangeSignal for ManualSignal {
	fn arm(&mut self) -> Result<()> {
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
