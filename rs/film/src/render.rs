use std::path::Path;

use image::RgbaImage;

use crate::RasterFrame;

/// Displays raster frames.
pub trait Renderer: Send + 'static {
	/// Size the drawing surface; called once, before anything is painted.
	fn resize(&mut self, width: u32, height: u32);

	/// Paint a frame with its top-left corner at (x, y).
	fn paint(&mut self, frame: &RasterFrame, x: u32, y: u32);
}

/// An in-memory RGBA drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
	surface: RgbaImage,
	painted: usize,
}

impl Canvas {
	pub fn new() -> Self {
		Self {
			surface: RgbaImage::new(0, 0),
			painted: 0,
		}
	}

	pub fn surface(&self) -> &RgbaImage {
		&self.surface
	}

	/// The number of paint calls so far.
	pub fn painted(&self) -> usize {
		self.painted
	}

	/// Write the surface to a file; the format is picked from the extension.
	pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
		self.surface.save(path)
	}
}

impl Default for Canvas {
	fn default() -> Self {
		Self::new()
	}
}

impl Renderer for Canvas {
	fn resize(&mut self, width: u32, height: u32) {
		self.surface = RgbaImage::new(width, height);
	}

	fn paint(&mut self, frame: &RasterFrame, x: u32, y: u32) {
		// Anything outside the surface is clipped.
		image::imageops::replace(&mut self.surface, frame.image(), x as i64, y as i64);
		self.painted += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::{gray, raster};

	#[test]
	fn test_paint() {
		let mut canvas = Canvas::new();
		canvas.resize(4, 4);
		assert_eq!(canvas.surface().dimensions(), (4, 4));

		canvas.paint(&raster(4, 4, 235), 0, 0);
		assert_eq!(canvas.painted(), 1);
		assert_eq!(canvas.surface().get_pixel(3, 3).0, [255, 255, 255, 255]);
	}

	#[test]
	fn test_paint_clips() {
		let mut canvas = Canvas::new();
		canvas.resize(2, 2);

		canvas.paint(&raster(4, 4, 100), 1, 1);
		assert_eq!(canvas.surface().dimensions(), (2, 2));

		let v = gray(100);
		assert_eq!(canvas.surface().get_pixel(1, 1).0, [v, v, v, 255]);
		assert_eq!(canvas.surface().get_pixel(0, 0).0, [0, 0, 0, 0]);
	}
}
