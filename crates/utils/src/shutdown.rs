use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

/// Process-wide "is disposed" flag.
///
/// Every background operation reads it before each unit of work and abandons
/// the work once it is set. It is written once and never reverts.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` if this call was the one that set the flag.
	pub fn trigger(&self) -> bool {
		!self.0.swap(true, Ordering::AcqRel)
	}

	#[must_use]
	pub fn is_set(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trigger_is_shared_and_sticky() {
		let flag = ShutdownFlag::new();
		let other = flag.clone();
		assert!(!other.is_set());

		assert!(flag.trigger());
		assert!(other.is_set());

		assert!(!other.trigger());
		assert!(flag.is_set());
	}
}
