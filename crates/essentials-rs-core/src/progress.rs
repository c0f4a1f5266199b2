//! Progress reporting and cancellation for long sequential passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives progress from bulk indexing and installing.
///
/// Cancellation is polled between items, never in the middle of a request.
pub trait ProgressObserver {
	/// Called after each item. `completed` counts from 1.
	fn progress(&mut self, completed: usize, total: usize, item: &str);

	fn is_cancelled(&self) -> bool {
		false
	}
}

/// Observer that ignores progress and never cancels.
impl ProgressObserver for () {
	fn progress(&mut self, _completed: usize, _total: usize, _item: &str) {}
}

/// Shared flag a signal handler or another task can raise to stop a pass.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// Logs progress at `info` and stops when its [`CancelFlag`] is raised.
#[derive(Debug, Clone)]
pub struct LogProgress {
	action: String,
	cancel: CancelFlag,
}

impl LogProgress {
	pub fn new(action: impl Into<String>, cancel: CancelFlag) -> Self {
		Self { action: action.into(), cancel }
	}
}

impl ProgressObserver for LogProgress {
	fn progress(&mut self, completed: usize, total: usize, item: &str) {
		let percent = completed * 100 / total.max(1);
		log::info!("{} {} ({}/{}, {}%)", self.action, item, completed, total, percent);
	}

	fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_the_flag() {
		let flag = CancelFlag::default();
		let observer = LogProgress::new("Indexing", flag.clone());
		assert!(!observer.is_cancelled());
		flag.cancel();
		assert!(observer.is_cancelled());
	}
}
