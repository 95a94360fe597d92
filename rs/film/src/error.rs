use std::sync::Arc;

/// A list of possible errors that can occur while decoding or drawing.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// The pipeline was already started.
	#[error("already started")]
	AlreadyStarted,

	/// The environment lacks something the pipeline needs to run.
	#[error("unsupported environment: {0}")]
	Unsupported(&'static str),

	/// The decoder reported a non-OK status.
	#[error("decoder error code={code}: {text}")]
	Decoder { code: i32, text: String },

	/// The frame is beyond the end of the fully decoded footage.
	#[error("frame {index} out of range, {count} frames in total")]
	OutOfRange { index: usize, count: usize },

	/// The request needs frames that haven't been converted yet.
	#[error("not ready, {buffered} frames buffered")]
	NotReady { buffered: usize },

	#[error("fetch failed: {0:#}")]
	Fetch(Arc<anyhow::Error>),

	#[error("conversion failed: {0}")]
	Convert(String),

	/// Seek fractions must be within [0, 1].
	#[error("invalid seek fraction: {0}")]
	InvalidSeek(f64),

	/// The pipeline went away before finishing.
	#[error("dropped")]
	Dropped,
}

impl Error {
	/// Returns true if the error halted the pipeline, rather than a single draw or seek.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::Decoder { .. } | Self::Fetch(_) | Self::Convert(_) | Self::Dropped
		)
	}
}

impl From<anyhow::Error> for Error {
	fn from(err: anyhow::Error) -> Self {
		Error::Fetch(Arc::new(err))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
