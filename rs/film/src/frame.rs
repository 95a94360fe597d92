use std::{fmt, sync::Arc};

use bytes::{Bytes, BytesMut};
use image::RgbaImage;

use crate::{Error, Result};

/// The size of the footage in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
	pub width: u32,
	pub height: u32,
}

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
	/// YUV 4:2:0 planar
	I420,
	/// YUV 4:2:2 planar
	I422,
	/// YUV 4:4:4 planar
	I444,
	/// Luma only
	Gray,
}

impl Format {
	/// The number of planes for this format.
	pub fn planes(self) -> usize {
		match self {
			Self::Gray => 1,
			_ => 3,
		}
	}

	/// The horizontal and vertical chroma subsampling shift, or `None` without chroma.
	pub fn chroma_shift(self) -> Option<(u32, u32)> {
		match self {
			Self::I420 => Some((1, 1)),
			Self::I422 => Some((1, 0)),
			Self::I444 => Some((0, 0)),
			Self::Gray => None,
		}
	}

	/// The visible width and height of a plane, rounding chroma up for odd sizes.
	pub fn plane_size(self, plane: usize, width: u32, height: u32) -> (usize, usize) {
		match (plane, self.chroma_shift()) {
			(0, _) | (_, None) => (width as usize, height as usize),
			(_, Some((x, y))) => (
				width.div_ceil(1 << x) as usize,
				height.div_ceil(1 << y) as usize,
			),
		}
	}

	/// The size of a tightly packed frame in bytes.
	pub fn frame_size(self, width: u32, height: u32) -> usize {
		(0..self.planes())
			.map(|plane| {
				let (w, h) = self.plane_size(plane, width, height);
				w * h
			})
			.sum()
	}
}

/// A single plane of pixel data, borrowed from the decoder.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
	/// Raw pixel data for this plane.
	pub data: &'a [u8],

	/// Number of bytes between rows (may include padding).
	pub stride: usize,
}

/// A decoded frame in its native planar representation.
///
/// This borrows the decoder's picture, so the decoder can't make progress until it is dropped.
/// Copy whatever is needed out of it and let it go.
#[derive(Debug)]
pub struct PlanarFrame<'a> {
	pub width: u32,
	pub height: u32,
	pub format: Format,

	/// Pixel data organized as planes (e.g. Y, U, V).
	pub planes: Vec<Plane<'a>>,
}

impl PlanarFrame<'_> {
	pub fn dimensions(&self) -> Dimensions {
		Dimensions {
			width: self.width,
			height: self.height,
		}
	}
}

/// An owned copy of a planar frame, tightly packed and detached from the decoder.
#[derive(Clone)]
pub struct RasterBytes {
	pub width: u32,
	pub height: u32,
	pub format: Format,
	pub data: Bytes,
}

impl fmt::Debug for RasterBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RasterBytes")
			.field("width", &self.width)
			.field("height", &self.height)
			.field("format", &self.format)
			.field("size", &self.data.len())
			.finish()
	}
}

impl RasterBytes {
	/// Copy the visible area of each plane, dropping any stride padding.
	pub fn copy_from(frame: &PlanarFrame<'_>) -> Result<Self> {
		let format = frame.format;
		if frame.planes.len() != format.planes() {
			return Err(Error::Convert(format!(
				"{:?} needs {} planes, got {}",
				format,
				format.planes(),
				frame.planes.len()
			)));
		}

		let mut data = BytesMut::with_capacity(format.frame_size(frame.width, frame.height));

		for (index, plane) in frame.planes.iter().enumerate() {
			let (width, height) = format.plane_size(index, frame.width, frame.height);
			if height == 0 {
				continue;
			}

			let needed = plane.stride * (height - 1) + width;
			if plane.stride < width || plane.data.len() < needed {
				return Err(Error::Convert(format!(
					"plane {index} too small: {} bytes with stride {} for {width}x{height}",
					plane.data.len(),
					plane.stride
				)));
			}

			for row in plane.data.chunks(plane.stride).take(height) {
				data.extend_from_slice(&row[..width]);
			}
		}

		Ok(Self {
			width: frame.width,
			height: frame.height,
			format,
			data: data.freeze(),
		})
	}

	/// The packed bytes of the given plane.
	pub fn plane(&self, index: usize) -> &[u8] {
		let offset: usize = (0..index)
			.map(|plane| {
				let (w, h) = self.format.plane_size(plane, self.width, self.height);
				w * h
			})
			.sum();
		let (w, h) = self.format.plane_size(index, self.width, self.height);
		&self.data[offset..offset + w * h]
	}
}

/// A display-ready RGBA frame.
///
/// Cheap to clone; the pixels are shared.
#[derive(Clone, PartialEq)]
pub struct RasterFrame {
	image: Arc<RgbaImage>,
}

impl RasterFrame {
	pub fn new(image: RgbaImage) -> Self {
		Self { image: Arc::new(image) }
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}

	pub fn image(&self) -> &RgbaImage {
		&self.image
	}
}

impl fmt::Debug for RasterFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RasterFrame")
			.field("width", &self.width())
			.field("height", &self.height())
			.finish()
	}
}
