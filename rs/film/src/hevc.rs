//! A [crate::Decoder] for Annex-B H.265 streams, backed by FFmpeg.
//!
//! Pushed bytes are split on start codes and grouped into access units, which are sent to FFmpeg
//! one packet at a time. A NAL unit is only complete once the next start code shows up, so the
//! tail of the stream sits in the splitter until the decoder is flushed.
use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use ffmpeg_next as ffmpeg;

use crate::{Error, Format, PlanarFrame, Plane, Result, Step};

/// FFmpeg produced a picture in a pixel format we can't convert.
///
/// Every other code is an FFmpeg error.
pub const ERROR_PIXEL_FORMAT: i32 = 1;

/// Decodes H.265 with FFmpeg's software decoder.
pub struct Decoder {
	decoder: ffmpeg::decoder::Video,
	splitter: Splitter,

	// The picture lent out by the last step.
	picture: ffmpeg::frame::Video,

	flushed: bool,
	eof: bool,
	drained: bool,
}

impl Decoder {
	pub fn new() -> Result<Self> {
		ffmpeg::init().map_err(|err| Error::Decoder {
			code: err.into(),
			text: err.to_string(),
		})?;

		let codec = ffmpeg::codec::decoder::find(ffmpeg::codec::Id::HEVC)
			.ok_or(Error::Unsupported("no HEVC decoder in this FFmpeg build"))?;

		let context = ffmpeg::codec::context::Context::new_with_codec(codec);
		let decoder = context.decoder().video().map_err(|err| Error::Decoder {
			code: err.into(),
			text: err.to_string(),
		})?;

		Ok(Self {
			decoder,
			splitter: Splitter::default(),
			picture: ffmpeg::frame::Video::empty(),
			flushed: false,
			eof: false,
			drained: false,
		})
	}

	fn planar(&self) -> std::result::Result<PlanarFrame<'_>, i32> {
		use ffmpeg::format::Pixel;

		let format = match self.picture.format() {
			Pixel::YUV420P | Pixel::YUVJ420P => Format::I420,
			Pixel::YUV422P | Pixel::YUVJ422P => Format::I422,
			Pixel::YUV444P | Pixel::YUVJ444P => Format::I444,
			Pixel::GRAY8 => Format::Gray,
			other => {
				tracing::error!(format = ?other, "unsupported pixel format");
				return Err(ERROR_PIXEL_FORMAT);
			}
		};

		let planes = (0..format.planes())
			.map(|index| Plane {
				data: self.picture.data(index),
				stride: self.picture.stride(index),
			})
			.collect();

		Ok(PlanarFrame {
			width: self.picture.width(),
			height: self.picture.height(),
			format,
			planes,
		})
	}
}

impl crate::Decoder for Decoder {
	fn push(&mut self, data: &[u8]) -> std::result::Result<(), i32> {
		if self.flushed {
			return Err(ffmpeg::Error::Eof.into());
		}

		self.splitter.push(data);
		Ok(())
	}

	fn flush(&mut self) -> std::result::Result<(), i32> {
		self.flushed = true;
		self.splitter.flush();
		Ok(())
	}

	fn step(&mut self) -> Step<'_> {
		loop {
			match self.decoder.receive_frame(&mut self.picture) {
				Ok(()) => {
					return match self.planar() {
						Ok(frame) => Step::Frame(frame),
						Err(code) => Step::Error(code),
					};
				}
				Err(ffmpeg::Error::Eof) => {
					self.drained = true;
					return Step::Ok;
				}
				Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
				Err(err) => return Step::Error(err.into()),
			}

			// The decoder wants more input.
			if let Some(unit) = self.splitter.units.pop_front() {
				let packet = ffmpeg::codec::packet::Packet::copy(&unit);
				if let Err(err) = self.decoder.send_packet(&packet) {
					return Step::Error(err.into());
				}
				continue;
			}

			if !self.flushed {
				return Step::NeedInput;
			}

			if self.eof {
				return Step::Ok;
			}

			if let Err(err) = self.decoder.send_eof() {
				return Step::Error(err.into());
			}
			self.eof = true;
		}
	}

	fn has_pending(&self) -> bool {
		!self.splitter.units.is_empty() || (self.flushed && !self.drained)
	}

	fn error_text(&self, code: i32) -> String {
		match code {
			ERROR_PIXEL_FORMAT => "unsupported pixel format".to_string(),
			code => ffmpeg::Error::from(code).to_string(),
		}
	}
}

/// Groups Annex-B NAL units into access units.
#[derive(Debug, Default)]
struct Splitter {
	buffer: BytesMut,

	// The access unit being built.
	unit: BytesMut,
	has_slice: bool,

	units: VecDeque<Bytes>,
}

impl Splitter {
	fn push(&mut self, data: &[u8]) {
		self.buffer.extend_from_slice(data);

		// A NAL unit is complete once the next start code arrives.
		while let Some(start) = start_code(&self.buffer, 0) {
			let Some(next) = start_code(&self.buffer, start + 3) else {
				break;
			};

			let nal = self.buffer.split_to(next);
			self.nal(nal, start);
		}
	}

	fn flush(&mut self) {
		let rest = self.buffer.split();
		if let Some(start) = start_code(&rest, 0) {
			self.nal(rest, start);
		}

		self.finish();
	}

	fn nal(&mut self, nal: BytesMut, start: usize) {
		let header = &nal[start + 3..];
		let Some(kind) = header.first().map(|b| (b >> 1) & 0x3f) else {
			return;
		};

		let vcl = kind < 32;
		let first_slice = vcl && header.get(2).is_some_and(|b| b & 0x80 != 0);

		// VPS, SPS, PPS, AUD, prefix SEI and reserved prefixes start a new access unit, as does
		// the first slice of a picture.
		let prefix = matches!(kind, 32..=35 | 39 | 41..=44 | 48..=55);
		if self.has_slice && (prefix || first_slice) {
			self.finish();
		}

		self.unit.extend_from_slice(&nal);
		self.has_slice |= vcl;
	}

	fn finish(&mut self) {
		if !self.unit.is_empty() {
			self.units.push_back(self.unit.split().freeze());
		}

		self.has_slice = false;
	}
}

fn start_code(data: &[u8], from: usize) -> Option<usize> {
	data.get(from..)?
		.windows(3)
		.position(|window| window == [0, 0, 1])
		.map(|position| position + from)
}

#[cfg(test)]
mod tests {
	use super::*;

	const VPS: u8 = 32;
	const SPS: u8 = 33;
	const PPS: u8 = 34;
	const IDR: u8 = 19;
	const TRAIL: u8 = 1;

	fn nal(kind: u8, first_slice: bool) -> Vec<u8> {
		let flags = if first_slice { 0x80 } else { 0x00 };
		vec![0, 0, 0, 1, kind << 1, 1, flags, 0xaa]
	}

	fn kinds(unit: &[u8]) -> Vec<u8> {
		let mut kinds = Vec::new();
		let mut from = 0;
		while let Some(start) = start_code(unit, from) {
			kinds.push((unit[start + 3] >> 1) & 0x3f);
			from = start + 3;
		}
		kinds
	}

	fn stream() -> Vec<u8> {
		[
			nal(VPS, false),
			nal(SPS, false),
			nal(PPS, false),
			nal(IDR, true),
			nal(TRAIL, true),
			nal(TRAIL, false),
			nal(TRAIL, true),
		]
		.concat()
	}

	fn split(chunk: usize) -> Vec<Vec<u8>> {
		let mut splitter = Splitter::default();
		for data in stream().chunks(chunk) {
			splitter.push(data);
		}
		splitter.flush();

		splitter.units.iter().map(|unit| kinds(unit)).collect()
	}

	#[test]
	fn test_access_units() {
		assert_eq!(
			split(4096),
			vec![vec![VPS, SPS, PPS, IDR], vec![TRAIL, TRAIL], vec![TRAIL]]
		);
	}

	#[test]
	fn test_access_units_across_chunks() {
		assert_eq!(split(1), split(4096));
		assert_eq!(split(5), split(4096));
	}

	#[test]
	fn test_tail_waits_for_flush() {
		let mut splitter = Splitter::default();
		splitter.push(&stream());

		// The last slice has no start code after it yet, so the second picture may not be done.
		assert_eq!(splitter.units.len(), 1);

		splitter.flush();
		assert_eq!(splitter.units.len(), 3);
	}

	#[test]
	fn test_garbage_without_start_code() {
		let mut splitter = Splitter::default();
		splitter.push(&[1, 2, 3, 4]);
		splitter.flush();
		assert!(splitter.units.is_empty());
	}
}
