//! A [crate::Decoder] for uncompressed YUV4MPEG2 streams.
//!
//! The stream is a single header line followed by frames, each a `FRAME` line and the raw planes:
//!
//! ```text
//! YUV4MPEG2 W640 H480 F30:1 Ip A1:1 C420jpeg\n
//! FRAME\n<y><u><v>
//! FRAME\n<y><u><v>
//! ```
//!
//! Input can be split anywhere, including in the middle of the header.
use bytes::{Buf, Bytes, BytesMut};

use crate::{Format, PlanarFrame, Plane, Step};

/// The stream header is missing or malformed.
pub const ERROR_HEADER: i32 = -1;
/// The stream ended in the middle of a frame.
pub const ERROR_TRUNCATED: i32 = -2;
/// The header names a colorspace we can't decode.
pub const ERROR_COLORSPACE: i32 = -3;
/// A frame didn't start with a `FRAME` line.
pub const ERROR_FRAME: i32 = -4;
/// Input was pushed after a flush.
pub const ERROR_FLUSHED: i32 = -5;

const MAGIC: &str = "YUV4MPEG2";

// Give up looking for a newline after this many bytes.
const MAX_HEADER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
	width: u32,
	height: u32,
	format: Format,
}

impl Header {
	fn parse(line: &[u8]) -> Result<Self, i32> {
		let line = std::str::from_utf8(line).map_err(|_| ERROR_HEADER)?;
		let mut params = line.split_ascii_whitespace();

		if params.next() != Some(MAGIC) {
			return Err(ERROR_HEADER);
		}

		let mut width = None;
		let mut height = None;
		let mut format = Format::I420;

		for param in params {
			let Some((key, value)) = param.split_at_checked(1) else {
				continue;
			};

			match key {
				"W" => width = Some(value.parse::<u32>().map_err(|_| ERROR_HEADER)?),
				"H" => height = Some(value.parse::<u32>().map_err(|_| ERROR_HEADER)?),
				"C" => {
					format = match value {
						"420" | "420jpeg" | "420paldv" | "420mpeg2" => Format::I420,
						"422" => Format::I422,
						"444" => Format::I444,
						"mono" => Format::Gray,
						_ => return Err(ERROR_COLORSPACE),
					}
				}
				// Frame rate, interlacing, aspect ratio and extensions don't matter here.
				_ => {}
			}
		}

		match (width, height) {
			(Some(width), Some(height)) if width > 0 && height > 0 => Ok(Self { width, height, format }),
			_ => Err(ERROR_HEADER),
		}
	}

	fn frame_size(&self) -> usize {
		self.format.frame_size(self.width, self.height)
	}

	fn planar<'a>(&self, data: &'a [u8]) -> PlanarFrame<'a> {
		let mut planes = Vec::with_capacity(self.format.planes());
		let mut offset = 0;

		for plane in 0..self.format.planes() {
			let (width, height) = self.format.plane_size(plane, self.width, self.height);
			planes.push(Plane {
				data: &data[offset..offset + width * height],
				stride: width,
			});
			offset += width * height;
		}

		PlanarFrame {
			width: self.width,
			height: self.height,
			format: self.format,
			planes,
		}
	}
}

/// Decodes YUV4MPEG2 (4:2:0, 4:2:2, 4:4:4 and mono).
#[derive(Debug, Default)]
pub struct Decoder {
	buffer: BytesMut,
	header: Option<Header>,

	// The frame lent out by the last step, released on the next one.
	current: Option<Bytes>,

	flushed: bool,
	frames: usize,
}

impl Decoder {
	pub fn new() -> Self {
		Self::default()
	}

	/// The number of frames decoded so far.
	pub fn frames(&self) -> usize {
		self.frames
	}

	fn header(&mut self) -> Result<Option<Header>, i32> {
		if let Some(header) = self.header {
			return Ok(Some(header));
		}

		let Some(end) = newline(&self.buffer) else {
			if self.buffer.len() > MAX_HEADER || (self.flushed && !self.buffer.is_empty()) {
				return Err(ERROR_HEADER);
			}

			return Ok(None);
		};

		let line = self.buffer.split_to(end + 1);
		let header = Header::parse(&line[..end])?;

		tracing::debug!(width = header.width, height = header.height, format = ?header.format, "parsed y4m header");
		self.header = Some(header);

		Ok(Some(header))
	}

	/// Pull the next frame into `current`, returning false if it isn't complete yet.
	fn frame(&mut self, header: &Header) -> Result<bool, i32> {
		let Some(end) = newline(&self.buffer) else {
			if self.buffer.len() > MAX_HEADER {
				return Err(ERROR_FRAME);
			}

			return Ok(false);
		};

		if !self.buffer[..end].starts_with(b"FRAME") {
			return Err(ERROR_FRAME);
		}

		if self.buffer.len() < end + 1 + header.frame_size() {
			return Ok(false);
		}

		self.buffer.advance(end + 1);
		self.current = Some(self.buffer.split_to(header.frame_size()).freeze());
		self.frames += 1;

		Ok(true)
	}

	fn starved(&self) -> Step<'static> {
		if !self.flushed {
			return Step::NeedInput;
		}

		match self.buffer.is_empty() {
			true => Step::Ok,
			false => Step::Error(ERROR_TRUNCATED),
		}
	}
}

impl crate::Decoder for Decoder {
	fn push(&mut self, data: &[u8]) -> Result<(), i32> {
		if self.flushed {
			return Err(ERROR_FLUSHED);
		}

		self.buffer.extend_from_slice(data);
		Ok(())
	}

	fn flush(&mut self) -> Result<(), i32> {
		self.flushed = true;
		Ok(())
	}

	fn step(&mut self) -> Step<'_> {
		// Whoever borrowed the last frame is done with it.
		self.current = None;

		let header = match self.header() {
			Ok(Some(header)) => header,
			Ok(None) => return self.starved(),
			Err(code) => return Step::Error(code),
		};

		match self.frame(&header) {
			Ok(true) => {}
			Ok(false) => return self.starved(),
			Err(code) => return Step::Error(code),
		}

		match &self.current {
			Some(data) => Step::Frame(header.planar(data)),
			None => Step::Ok,
		}
	}

	fn has_pending(&self) -> bool {
		let Some(header) = self.header else {
			// A complete header line is waiting to be parsed.
			return newline(&self.buffer).is_some();
		};

		newline(&self.buffer).is_some_and(|end| self.buffer.len() >= end + 1 + header.frame_size())
	}

	fn error_text(&self, code: i32) -> String {
		match code {
			ERROR_HEADER => "missing or malformed YUV4MPEG2 header",
			ERROR_TRUNCATED => "stream ended in the middle of a frame",
			ERROR_COLORSPACE => "unsupported colorspace",
			ERROR_FRAME => "expected a FRAME marker",
			ERROR_FLUSHED => "input pushed after flush",
			_ => "unknown error",
		}
		.to_string()
	}
}

fn newline(buffer: &[u8]) -> Option<usize> {
	buffer.iter().position(|&b| b == b'\n')
}
