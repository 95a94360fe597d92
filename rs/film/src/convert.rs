//! Converting decoded planar frames into display-ready raster frames.
//!
//! Conversion happens in two halves:
//! 1. [Converter::rasterize] copies what's needed out of the decoder's picture, synchronously,
//!    so the picture can be released straight away.
//! 2. [Converter::convert] turns that copy into a [RasterFrame] asynchronously.
//!
//! The [Scheduler] runs every frame through both halves and stores the result in the slot that was
//! reserved when the frame was decoded, so the output order never depends on completion order.
use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use image::RgbaImage;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{Error, PlanarFrame, RasterBytes, RasterFrame, Renderer, Result, film::State};

/// Turns planar frames into raster frames.
pub trait Converter: Send + Sync + 'static {
	/// Returns false if [Self::convert] can't run in the current environment.
	fn supported(&self) -> bool {
		true
	}

	/// Copy what's needed out of the frame before it is handed back to the decoder.
	fn rasterize(&self, frame: &PlanarFrame<'_>) -> Result<RasterBytes> {
		RasterBytes::copy_from(frame)
	}

	/// Produce the display-ready frame.
	fn convert(&self, raster: RasterBytes) -> BoxFuture<'static, Result<RasterFrame>>;
}

/// BT.601 limited-range YUV to RGBA, converted on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgba;

impl Converter for Rgba {
	fn supported(&self) -> bool {
		tokio::runtime::Handle::try_current().is_ok()
	}

	fn convert(&self, raster: RasterBytes) -> BoxFuture<'static, Result<RasterFrame>> {
		async move {
			tokio::task::spawn_blocking(move || to_rgba(&raster))
				.await
				.map_err(|err| Error::Convert(err.to_string()))?
		}
		.boxed()
	}
}

/// Convert tightly packed YUV planes into an RGBA frame.
pub fn to_rgba(raster: &RasterBytes) -> Result<RasterFrame> {
	let (width, height) = (raster.width, raster.height);
	let expected = raster.format.frame_size(width, height);
	if raster.data.len() != expected {
		return Err(Error::Convert(format!(
			"expected {expected} bytes for {width}x{height} {:?}, got {}",
			raster.format,
			raster.data.len()
		)));
	}

	let luma = raster.plane(0);
	let mut image = RgbaImage::new(width, height);

	match raster.format.chroma_shift() {
		None => {
			for (x, y, pixel) in image.enumerate_pixels_mut() {
				let c = 298 * (luma[(y * width + x) as usize] as i32 - 16);
				let v = clamp((c + 128) >> 8);
				pixel.0 = [v, v, v, 255];
			}
		}
		Some((sx, sy)) => {
			let u = raster.plane(1);
			let v = raster.plane(2);
			let (chroma_width, _) = raster.format.plane_size(1, width, height);

			for (x, y, pixel) in image.enumerate_pixels_mut() {
				let chroma = (y >> sy) as usize * chroma_width + (x >> sx) as usize;

				let c = 298 * (luma[(y * width + x) as usize] as i32 - 16);
				let d = u[chroma] as i32 - 128;
				let e = v[chroma] as i32 - 128;

				pixel.0 = [
					clamp((c + 409 * e + 128) >> 8),
					clamp((c - 100 * d - 208 * e + 128) >> 8),
					clamp((c + 516 * d + 128) >> 8),
					255,
				];
			}
		}
	}

	Ok(RasterFrame::new(image))
}

fn clamp(value: i32) -> u8 {
	value.clamp(0, 255) as u8
}

/// Schedules a conversion for each decoded frame and stores the result in decode order.
pub(crate) struct Scheduler<R> {
	state: watch::Sender<State>,
	renderer: Arc<Mutex<R>>,
	converter: Arc<dyn Converter>,
	draw_first_frame: bool,
}

impl<R: Renderer> Scheduler<R> {
	pub fn new(
		state: watch::Sender<State>,
		renderer: Arc<Mutex<R>>,
		converter: Arc<dyn Converter>,
		draw_first_frame: bool,
	) -> Self {
		Self {
			state,
			renderer,
			converter,
			draw_first_frame,
		}
	}

	pub fn state(&self) -> &watch::Sender<State> {
		&self.state
	}

	/// Copy the frame out, release it, and start converting it in the background.
	pub fn enqueue(&self, frame: PlanarFrame<'_>) -> Result<()> {
		let dimensions = frame.dimensions();
		let raster = self.converter.rasterize(&frame)?;

		// Hand the picture back to the decoder before any async work.
		drop(frame);

		let mut index = 0;
		let mut renderer = self.renderer.lock();
		self.state.send_modify(|state| {
			state.size(dimensions, &mut *renderer);
			index = state.reserve();
		});
		drop(renderer);

		tracing::debug!(index, "got a decoded frame, converting");

		let convert = self.converter.convert(raster);
		let state = self.state.clone();
		let renderer = self.renderer.clone();
		let draw_first_frame = self.draw_first_frame;

		tokio::spawn(async move {
			let res = convert.await;
			let mut renderer = renderer.lock();
			state.send_if_modified(|state| state.converted(index, res, &mut *renderer, draw_first_frame));
		});

		Ok(())
	}
}
