use std::num::NonZeroUsize;

/// The default number of compressed bytes pushed to the decoder at once.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(4096).unwrap();

/// Configuration for a [crate::Film] pipeline.
///
/// Unset values fall back to their defaults, so a config loaded from a file can have command line
/// arguments applied on top without losing anything.
#[derive(Clone, Default, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct Config {
	/// The maximum number of compressed bytes pushed to the decoder at once (default: 4096).
	#[serde(skip_serializing_if = "Option::is_none")]
	#[arg(id = "chunk-size", long = "chunk-size", env = "FILM_CHUNK_SIZE")]
	pub chunk_size: Option<NonZeroUsize>,

	/// Paint the first frame as soon as it has been converted.
	#[serde(skip_serializing_if = "Option::is_none")]
	#[arg(
		id = "draw-first-frame",
		long = "draw-first-frame",
		env = "FILM_DRAW_FIRST_FRAME",
		default_missing_value = "true",
		num_args = 0..=1,
		value_parser = clap::value_parser!(bool),
	)]
	pub draw_first_frame: Option<bool>,
}

impl Config {
	pub fn chunk_size(&self) -> NonZeroUsize {
		self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
	}

	pub fn draw_first_frame(&self) -> bool {
		self.draw_first_frame.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser)]
	struct Cli {
		#[command(flatten)]
		config: Config,
	}

	#[test]
	fn test_cli_defaults() {
		let cli = Cli::parse_from(["test"]);
		assert_eq!(cli.config.chunk_size, None);
		assert_eq!(cli.config.chunk_size().get(), 4096);
		assert!(!cli.config.draw_first_frame());
	}

	#[test]
	fn test_cli_flags() {
		let cli = Cli::parse_from(["test", "--chunk-size", "1024", "--draw-first-frame"]);
		assert_eq!(cli.config.chunk_size().get(), 1024);
		assert!(cli.config.draw_first_frame());
	}

	#[test]
	fn test_cli_explicit_false() {
		let cli = Cli::parse_from(["test", "--draw-first-frame", "false"]);
		assert_eq!(cli.config.draw_first_frame, Some(false));
	}

	#[test]
	fn test_cli_rejects_zero_chunk() {
		assert!(Cli::try_parse_from(["test", "--chunk-size", "0"]).is_err());
	}

	#[test]
	fn test_toml() {
		let config: Config = toml::from_str("chunk_size = 512").unwrap();
		assert_eq!(config.chunk_size().get(), 512);
		assert!(!config.draw_first_frame());

		let config: Config = toml::from_str("draw_first_frame = true").unwrap();
		assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
		assert!(config.draw_first_frame());
	}

	#[test]
	fn test_toml_rejects_zero_chunk() {
		assert!(toml::from_str::<Config>("chunk_size = 0").is_err());
	}

	#[test]
	fn test_toml_unknown_field() {
		assert!(toml::from_str::<Config>("verbose = true").is_err());
	}

	#[test]
	fn test_toml_survives_update_from() {
		let mut cli = Cli {
			config: toml::from_str("chunk_size = 512\ndraw_first_frame = true").unwrap(),
		};

		// The file's values stay unless an argument overrides them.
		cli.update_from(["test", "--chunk-size", "64"]);
		assert_eq!(cli.config.chunk_size().get(), 64);
		assert!(cli.config.draw_first_frame());
	}
}
