use crate::{Error, Result};

/// The lifecycle of a pipeline.
///
/// There's exactly one forward path, `Idle -> Fetching -> Feeding -> Ready`,
/// with `Failed` reachable from `Fetching` or `Feeding`. No phase is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
	#[default]
	Idle,
	Fetching,
	Feeding,
	Ready,
	Failed,
}

impl Phase {
	/// Returns true once the pipeline can't change anymore.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Ready | Self::Failed)
	}
}

/// Combines feeder exhaustion and outstanding conversions into a single readiness transition.
///
/// Every method is a named transition; the ones that can make the pipeline ready return `true`
/// exactly once, the first time both conditions hold.
#[derive(Debug, Default)]
pub struct Tracker {
	phase: Phase,

	// Set when the decoder has consumed everything and has nothing left to emit.
	exhausted: bool,

	// The number of conversions started but not finished.
	outstanding: usize,
}

impl Tracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn outstanding(&self) -> usize {
		self.outstanding
	}

	pub fn is_exhausted(&self) -> bool {
		self.exhausted
	}

	/// `Idle -> Fetching`
	pub fn start(&mut self) -> Result<()> {
		if self.phase != Phase::Idle {
			return Err(Error::AlreadyStarted);
		}

		self.phase = Phase::Fetching;
		Ok(())
	}

	/// `Fetching -> Feeding`, returning false if the pipeline isn't fetching.
	pub fn feeding(&mut self) -> bool {
		if self.phase != Phase::Fetching {
			return false;
		}

		self.phase = Phase::Feeding;
		true
	}

	/// A conversion was scheduled.
	pub fn enqueued(&mut self) {
		self.outstanding += 1;
	}

	/// A conversion finished, returning true if that made the pipeline ready.
	pub fn converted(&mut self) -> bool {
		debug_assert!(self.outstanding > 0, "more conversions finished than started");
		self.outstanding = self.outstanding.saturating_sub(1);
		self.evaluate()
	}

	/// The feeder ran out of input, returning true if that made the pipeline ready.
	pub fn exhaust(&mut self) -> bool {
		self.exhausted = true;
		self.evaluate()
	}

	/// Move to `Failed`, returning false if the pipeline already finished.
	pub fn fail(&mut self) -> bool {
		match self.phase {
			Phase::Fetching | Phase::Feeding => {
				self.phase = Phase::Failed;
				true
			}
			_ => false,
		}
	}

	fn evaluate(&mut self) -> bool {
		if self.phase != Phase::Feeding || !self.exhausted || self.outstanding > 0 {
			return false;
		}

		self.phase = Phase::Ready;
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn feeding() -> Tracker {
		let mut tracker = Tracker::new();
		tracker.start().unwrap();
		assert!(tracker.feeding());
		tracker
	}

	#[test]
	fn test_start_twice() {
		let mut tracker = Tracker::new();
		tracker.start().unwrap();
		assert!(matches!(tracker.start(), Err(Error::AlreadyStarted)));
		assert_eq!(tracker.phase(), Phase::Fetching);
	}

	#[test]
	fn test_ready_after_last_conversion() {
		let mut tracker = feeding();
		tracker.enqueued();
		tracker.enqueued();

		assert!(!tracker.exhaust());
		assert!(!tracker.converted());
		assert_eq!(tracker.phase(), Phase::Feeding);

		assert!(tracker.converted());
		assert_eq!(tracker.phase(), Phase::Ready);
	}

	#[test]
	fn test_ready_after_exhaust() {
		let mut tracker = feeding();
		tracker.enqueued();

		// Conversions draining before the feeder finishes isn't enough.
		assert!(!tracker.converted());
		assert_eq!(tracker.outstanding(), 0);

		assert!(tracker.exhaust());
		assert_eq!(tracker.phase(), Phase::Ready);
	}

	#[test]
	fn test_ready_fires_once() {
		let mut tracker = feeding();
		tracker.enqueued();
		tracker.exhaust();

		let mut fired = 0;
		fired += tracker.converted() as usize;
		fired += tracker.exhaust() as usize;
		fired += tracker.exhaust() as usize;
		assert_eq!(fired, 1);
	}

	#[test]
	fn test_not_ready_before_feeding() {
		let mut tracker = Tracker::new();
		tracker.start().unwrap();
		assert!(!tracker.exhaust());
		assert_eq!(tracker.phase(), Phase::Fetching);
	}

	#[test]
	fn test_fail() {
		let mut tracker = feeding();
		tracker.enqueued();
		assert!(tracker.fail());
		assert_eq!(tracker.phase(), Phase::Failed);

		// Failed is terminal.
		assert!(!tracker.fail());
		assert!(!tracker.exhaust());
		assert!(!tracker.converted());
		assert_eq!(tracker.phase(), Phase::Failed);
	}

	#[test]
	fn test_fail_after_ready() {
		let mut tracker = feeding();
		assert!(tracker.exhaust());
		assert!(!tracker.fail());
		assert_eq!(tracker.phase(), Phase::Ready);
	}

	#[test]
	fn test_fail_from_idle() {
		let mut tracker = Tracker::new();
		assert!(!tracker.fail());
		assert_eq!(tracker.phase(), Phase::Idle);
	}
}
