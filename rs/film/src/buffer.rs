//! An ordered store of converted frames.
//!
//! Each decoded frame reserves a slot when it is handed to the converter, and the conversion
//! fills that slot whenever it finishes. Conversions can finish in any order, but a frame only
//! becomes visible once every frame before it has been filled too.
use std::fmt;

use crate::RasterFrame;

#[derive(Default)]
pub struct FrameBuffer {
	// One slot per decoded frame, in decode order.
	slots: Vec<Option<RasterFrame>>,

	// The length of the contiguous prefix of filled slots.
	filled: usize,

	// The number of filled slots, including any after a gap.
	converted: usize,

	// Set once the frame count is known; no more slots may be reserved.
	finalized: bool,
}

impl fmt::Debug for FrameBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FrameBuffer")
			.field("reserved", &self.slots.len())
			.field("filled", &self.filled)
			.field("converted", &self.converted)
			.field("finalized", &self.finalized)
			.finish()
	}
}

impl FrameBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserve the next slot in decode order, returning its index.
	pub fn reserve(&mut self) -> usize {
		debug_assert!(!self.finalized, "reserved a slot after finalize");

		self.slots.push(None);
		self.slots.len() - 1
	}

	/// Fill a reserved slot with its converted frame.
	pub fn fill(&mut self, index: usize, frame: RasterFrame) {
		let Some(slot) = self.slots.get_mut(index) else {
			tracing::warn!(index, "filled a slot that was never reserved");
			return;
		};

		debug_assert!(slot.is_none(), "filled slot {index} twice");
		if slot.replace(frame).is_none() {
			self.converted += 1;
		}

		while self.slots.get(self.filled).is_some_and(Option::is_some) {
			self.filled += 1;
		}
	}

	/// The number of frames that can be read, all of them in order.
	pub fn len(&self) -> usize {
		self.filled
	}

	pub fn is_empty(&self) -> bool {
		self.filled == 0
	}

	/// The number of reserved slots still waiting on a conversion.
	pub fn pending(&self) -> usize {
		self.slots.len() - self.converted
	}

	/// Return the frame at the given index, if it and every frame before it is converted.
	pub fn get(&self, index: usize) -> Option<&RasterFrame> {
		if index >= self.filled {
			return None;
		}

		self.slots[index].as_ref()
	}

	/// Freeze the buffer, returning the final frame count.
	pub fn finalize(&mut self) -> usize {
		debug_assert_eq!(self.pending(), 0, "finalized with pending conversions");

		self.finalized = true;
		self.filled
	}

	pub fn is_finalized(&self) -> bool {
		self.finalized
	}
}
