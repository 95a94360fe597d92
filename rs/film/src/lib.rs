//! # film: progressive video decoding for frame-accurate scrubbing
//!
//! `film` fetches a compressed video stream, feeds it through a stateful decoder in bounded
//! chunks, converts every decoded frame into a display-ready raster and keeps them all in memory,
//! in decode order, so any frame can be painted or seeked to instantly.
//!
//! The pipeline is built around a few seams:
//! - [Fetch]: where the compressed bytes come from, usually a [Source].
//! - [Decoder]: turns compressed bytes into [PlanarFrame]s, like [y4m::Decoder].
//! - [Converter]: turns a [PlanarFrame] into a [RasterFrame], by default [Rgba].
//! - [Renderer]: paints [RasterFrame]s, like the in-memory [Canvas].
//!
//! [Film] ties them together:
//! - [Film::start] kicks off decoding in the background and returns a [Completion].
//! - [Film::draw_frame] paints any converted frame, even before the whole stream is decoded.
//! - [Film::seek] paints the frame at a fraction of the footage once it's [Phase::Ready].
mod buffer;
mod config;
mod convert;
mod cursor;
mod error;
mod feed;
mod fetch;
mod film;
mod frame;
mod ready;
mod render;

pub mod y4m;

#[cfg(feature = "ffmpeg")]
pub mod hevc;

#[cfg(test)]
mod test;

pub use buffer::*;
pub use config::*;
pub use convert::{Converter, Rgba, to_rgba};
pub use cursor::*;
pub use error::*;
pub use feed::*;
pub use fetch::*;
pub use film::{Completion, Film};
pub use frame::*;
pub use ready::*;
pub use render::*;
