//! Helpers shared by the unit tests.
use bytes::Bytes;

use crate::{Format, RasterBytes, RasterFrame, Renderer, to_rgba};

/// A flat gray frame with the given luma.
pub fn raster(width: u32, height: u32, luma: u8) -> RasterFrame {
	let format = Format::Gray;
	let raster = RasterBytes {
		width,
		height,
		format,
		data: vec![luma; format.frame_size(width, height)].into(),
	};

	to_rgba(&raster).unwrap()
}

/// The RGB value of a gray pixel with the given luma.
pub fn gray(luma: u8) -> u8 {
	((298 * (luma as i32 - 16) + 128) >> 8).clamp(0, 255) as u8
}

/// A 4:2:0 YUV4MPEG2 stream with one flat frame per luma value.
pub fn footage(width: u32, height: u32, lumas: &[u8]) -> Bytes {
	let mut data = format!("YUV4MPEG2 W{width} H{height} F25:1 Ip A1:1 C420jpeg\n").into_bytes();

	let luma = (width * height) as usize;
	let chroma = Format::I420.frame_size(width, height) - luma;

	for &y in lumas {
		data.extend_from_slice(b"FRAME\n");
		data.extend(std::iter::repeat_n(y, luma));
		data.extend(std::iter::repeat_n(128, chroma));
	}

	data.into()
}

/// Records every call instead of drawing.
#[derive(Debug, Default)]
pub struct Recorder {
	pub resizes: Vec<(u32, u32)>,
	pub paints: Vec<RasterFrame>,
}

impl Renderer for Recorder {
	fn resize(&mut self, width: u32, height: u32) {
		self.resizes.push((width, height));
	}

	fn paint(&mut self, frame: &RasterFrame, _x: u32, _y: u32) {
		self.paints.push(frame.clone());
	}
}
