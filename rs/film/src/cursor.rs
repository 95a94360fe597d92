use crate::{Error, FrameBuffer, RasterFrame, Renderer, Result};

/// Tracks which frame is on screen and validates draw and seek requests.
///
/// Before the pipeline is ready only buffered frames can be drawn and seeking is unavailable.
/// Once ready, every frame up to the final count can be drawn.
#[derive(Debug, Default)]
pub struct Cursor {
	current: Option<usize>,
}

impl Cursor {
	pub fn new() -> Self {
		Self::default()
	}

	/// The index of the frame on screen, if any.
	pub fn current(&self) -> Option<usize> {
		self.current
	}

	/// Paint the frame at `index`, returning false if it was already on screen.
	///
	/// `count` is the final frame count, known only once the pipeline is ready.
	pub fn draw<R: Renderer + ?Sized>(
		&mut self,
		index: usize,
		frames: &FrameBuffer,
		count: Option<usize>,
		renderer: &mut R,
	) -> Result<bool> {
		if self.current == Some(index) {
			return Ok(false);
		}

		let buffered = frames.len();

		match count {
			Some(count) if index >= count => {
				tracing::error!(index, count, "requested frame is out of range");
				return Err(Error::OutOfRange { index, count });
			}
			Some(_) => tracing::debug!(index, "drawing frame"),
			None if index < buffered => {
				tracing::warn!(index, buffered, "drawing a frame before the footage is fully prepared")
			}
			None => {
				tracing::error!(index, buffered, "requested frame is not ready yet");
				return Err(Error::NotReady { buffered });
			}
		}

		let frame = frames.get(index).ok_or(Error::NotReady { buffered })?;
		self.show(index, frame, renderer);

		Ok(true)
	}

	/// Paint `frame` as the one at `index` without any checks.
	pub fn show<R: Renderer + ?Sized>(&mut self, index: usize, frame: &RasterFrame, renderer: &mut R) {
		renderer.paint(frame, 0, 0);
		self.current = Some(index);
	}

	/// Map a fraction of the footage to a frame index.
	pub fn seek_index(fraction: f64, count: Option<usize>) -> Result<usize> {
		let Some(count) = count else {
			tracing::error!(fraction, "seek is unavailable until the footage is completely decoded");
			return Err(Error::NotReady { buffered: 0 });
		};

		if !(0.0..=1.0).contains(&fraction) {
			tracing::error!(fraction, "seek fraction must be within [0, 1]");
			return Err(Error::InvalidSeek(fraction));
		}

		if count == 0 {
			tracing::error!("seek on empty footage");
			return Err(Error::OutOfRange { index: 0, count });
		}

		Ok(((count - 1) as f64 * fraction).floor() as usize)
	}
}
