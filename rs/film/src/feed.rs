//! Feeding a compressed buffer through a stateful decoder.
//!
//! The [Feeder] owns the compressed bytes and pushes them to a [Decoder] one bounded chunk at a
//! time. Each call to [Feeder::advance] does one unit of work so the caller can yield between
//! them, letting conversions make progress while the stream is still being decoded.
use std::num::NonZeroUsize;

use bytes::Bytes;

use crate::{Error, PlanarFrame, Result};

/// The outcome of a single decoder step.
#[derive(Debug)]
pub enum Step<'a> {
	/// The decoder made progress but has nothing to hand out.
	Ok,

	/// The decoder can't continue until it gets more input (or is flushed).
	NeedInput,

	/// A decoded frame, borrowed until it is dropped.
	Frame(PlanarFrame<'a>),

	/// A decoder-specific error code; see [Decoder::error_text].
	Error(i32),
}

/// A stateful decoder that consumes compressed bytes and emits planar frames.
///
/// Status codes are decoder-specific and translated with [Decoder::error_text].
pub trait Decoder {
	/// Append compressed bytes to the decoder's input.
	fn push(&mut self, data: &[u8]) -> std::result::Result<(), i32>;

	/// Signal that no more input is coming.
	fn flush(&mut self) -> std::result::Result<(), i32>;

	/// Decode as much as possible, returning at most one frame.
	fn step(&mut self) -> Step<'_>;

	/// Returns true if the decoder still has buffered output to drain.
	fn has_pending(&self) -> bool;

	/// A human readable description of an error code.
	fn error_text(&self, code: i32) -> String;
}

/// Drives a [Decoder] through push / step / flush until it is exhausted.
pub struct Feeder<D> {
	data: Bytes,
	position: usize,
	chunk_size: usize,
	flushed: bool,
	decoder: D,
}

impl<D: Decoder> Feeder<D> {
	pub fn new(data: Bytes, decoder: D, chunk_size: NonZeroUsize) -> Self {
		Self {
			data,
			position: 0,
			chunk_size: chunk_size.get(),
			flushed: false,
			decoder,
		}
	}

	/// The number of bytes already pushed to the decoder.
	pub fn position(&self) -> usize {
		self.position
	}

	/// The number of bytes still to push.
	pub fn remaining(&self) -> usize {
		self.data.len() - self.position
	}

	pub fn is_flushed(&self) -> bool {
		self.flushed
	}

	/// Push the next chunk (or flush), then step the decoder until it stops emitting frames.
	///
	/// Every emitted frame is passed to `on_frame`, which must be done with it before returning.
	/// Returns true once all input is consumed and the decoder has nothing left to emit.
	pub fn advance<F>(&mut self, mut on_frame: F) -> Result<bool>
	where
		F: FnMut(PlanarFrame<'_>) -> Result<()>,
	{
		let remaining = self.remaining();
		if remaining > 0 {
			let size = remaining.min(self.chunk_size);
			let end = self.position + size;

			tracing::debug!(size, position = self.position, "pushing chunk");
			if let Err(code) = self.decoder.push(&self.data[self.position..end]) {
				return Err(self.error(code));
			}

			self.position = end;
		} else if !self.flushed {
			tracing::debug!(size = self.data.len(), "end of stream, flushing decoder");
			if let Err(code) = self.decoder.flush() {
				return Err(self.error(code));
			}

			self.flushed = true;
		}

		let failed = loop {
			match self.decoder.step() {
				Step::Frame(frame) => on_frame(frame)?,
				Step::NeedInput => {
					tracing::trace!("decoder waiting for input");
					break None;
				}
				Step::Ok => break None,
				Step::Error(code) => break Some(code),
			}
		};

		if let Some(code) = failed {
			return Err(self.error(code));
		}

		if self.remaining() > 0 || !self.flushed {
			return Ok(false);
		}

		if self.decoder.has_pending() {
			tracing::debug!("all data pushed but the decoder has more frames");
			return Ok(false);
		}

		Ok(true)
	}

	/// Give back the decoder.
	pub fn into_decoder(self) -> D {
		self.decoder
	}

	fn error(&self, code: i32) -> Error {
		let text = self.decoder.error_text(code);
		tracing::error!(code, %text, "decoder error");
		Error::Decoder { code, text }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Format, Plane};

	#[derive(Debug, PartialEq)]
	enum Call {
		Push(usize),
		Flush,
	}

	/// Emits one 1x1 gray frame per `every` bytes pushed, holding them until stepped.
	#[derive(Default)]
	struct Mock {
		calls: Vec<Call>,
		every: usize,
		received: usize,
		queued: usize,
		flushed: bool,
		picture: [u8; 1],
		fail_step: Option<i32>,
		fail_push: Option<i32>,
	}

	impl Decoder for Mock {
		fn push(&mut self, data: &[u8]) -> std::result::Result<(), i32> {
			self.calls.push(Call::Push(data.len()));
			if let Some(code) = self.fail_push {
				return Err(code);
			}

			if self.every > 0 {
				let before = self.received / self.every;
				self.received += data.len();
				self.queued += self.received / self.every - before;
			}

			Ok(())
		}

		fn flush(&mut self) -> std::result::Result<(), i32> {
			self.calls.push(Call::Flush);
			self.flushed = true;
			Ok(())
		}

		fn step(&mut self) -> Step<'_> {
			if let Some(code) = self.fail_step {
				return Step::Error(code);
			}

			if self.queued > 0 {
				self.queued -= 1;
				self.picture[0] += 1;
				return Step::Frame(PlanarFrame {
					width: 1,
					height: 1,
					format: Format::Gray,
					planes: vec![Plane {
						data: &self.picture,
						stride: 1,
					}],
				});
			}

			match self.flushed {
				true => Step::Ok,
				false => Step::NeedInput,
			}
		}

		fn has_pending(&self) -> bool {
			self.queued > 0
		}

		fn error_text(&self, code: i32) -> String {
			format!("mock error {code}")
		}
	}

	fn feeder(size: usize, decoder: Mock) -> Feeder<Mock> {
		Feeder::new(Bytes::from(vec![0u8; size]), decoder, NonZeroUsize::new(4096).unwrap())
	}

	fn run(feeder: &mut Feeder<Mock>) -> Result<(usize, Vec<u8>)> {
		let mut units = 0;
		let mut frames = Vec::new();

		loop {
			units += 1;
			let exhausted = feeder.advance(|frame| {
				frames.push(frame.planes[0].data[0]);
				Ok(())
			})?;

			if exhausted {
				return Ok((units, frames));
			}
		}
	}

	#[test]
	fn test_chunks_then_one_flush() {
		let mut feeder = feeder(10000, Mock::default());
		let (units, _) = run(&mut feeder).unwrap();

		assert_eq!(units, 4);
		assert_eq!(feeder.position(), 10000);
		assert_eq!(feeder.remaining(), 0);
		assert!(feeder.is_flushed());

		let decoder = feeder.into_decoder();
		assert_eq!(
			decoder.calls,
			vec![Call::Push(4096), Call::Push(4096), Call::Push(1808), Call::Flush]
		);
	}

	#[test]
	fn test_empty_buffer_flushes() {
		let mut feeder = feeder(0, Mock::default());
		let (units, frames) = run(&mut feeder).unwrap();

		assert_eq!(units, 1);
		assert!(frames.is_empty());
		assert_eq!(feeder.into_decoder().calls, vec![Call::Flush]);
	}

	#[test]
	fn test_frames_in_emission_order() {
		let mock = Mock {
			every: 2048,
			..Default::default()
		};

		let mut feeder = feeder(10000, mock);
		let (_, frames) = run(&mut feeder).unwrap();

		// 10000 / 2048 = 4 frames, handed out in the order they were stepped.
		assert_eq!(frames, vec![1, 2, 3, 4]);
	}

	#[test]
	fn test_step_error() {
		let mock = Mock {
			fail_step: Some(7),
			..Default::default()
		};

		let mut feeder = feeder(100, mock);
		let err = feeder.advance(|_| Ok(())).unwrap_err();
		match err {
			Error::Decoder { code, text } => {
				assert_eq!(code, 7);
				assert_eq!(text, "mock error 7");
			}
			err => panic!("unexpected error: {err}"),
		}
	}

	#[test]
	fn test_push_error() {
		let mock = Mock {
			fail_push: Some(3),
			..Default::default()
		};

		let mut feeder = feeder(100, mock);
		assert!(matches!(feeder.advance(|_| Ok(())), Err(Error::Decoder { code: 3, .. })));
		// The cursor doesn't move past a rejected chunk.
		assert_eq!(feeder.position(), 0);
	}

	#[test]
	fn test_frame_handler_error_stops() {
		let mock = Mock {
			every: 10,
			..Default::default()
		};

		let mut feeder = feeder(100, mock);
		let res = feeder.advance(|_| Err(Error::Convert("nope".into())));
		assert!(matches!(res, Err(Error::Convert(_))));
	}

	#[test]
	fn test_custom_chunk_size() {
		let mut feeder = Feeder::new(
			Bytes::from(vec![0u8; 10]),
			Mock::default(),
			NonZeroUsize::new(4).unwrap(),
		);
		run(&mut feeder).unwrap();

		assert_eq!(
			feeder.into_decoder().calls,
			vec![Call::Push(4), Call::Push(4), Call::Push(2), Call::Flush]
		);
	}
}
