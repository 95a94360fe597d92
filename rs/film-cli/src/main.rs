mod log;

use std::{future::IntoFuture, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use film::{Canvas, Film, Source};

#[derive(Parser, Clone, Debug)]
#[command(name = "film", about = "Decode a video and write any of its frames as PNG images")]
pub struct Cli {
	#[command(flatten)]
	log: log::Log,

	/// Load the pipeline configuration from a TOML file; arguments take precedence.
	#[arg(long = "config", env = "FILM_CONFIG")]
	config_file: Option<PathBuf>,

	/// The pipeline configuration.
	#[command(flatten)]
	config: film::Config,

	/// A file path, or a URL starting with http:// or https://
	input: Source,

	/// The format of the input.
	#[arg(long, value_enum, default_value_t = Codec::Y4m)]
	codec: Codec,

	/// Write the frame at this index; can be repeated.
	#[arg(long)]
	frame: Vec<usize>,

	/// Write the frame at this fraction of the footage, within [0, 1]; can be repeated.
	#[arg(long)]
	seek: Vec<f64>,

	/// The directory to write frames to.
	#[arg(long, default_value = ".")]
	output: PathBuf,
}

impl Cli {
	fn load() -> anyhow::Result<Self> {
		let mut cli = Self::parse();

		if let Some(path) = cli.config_file.clone() {
			let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
			cli.config = toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;

			// Re-apply the arguments on top of the file.
			cli.update_from(std::env::args_os());
		}

		Ok(cli)
	}
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
	/// Uncompressed YUV4MPEG2
	Y4m,

	/// Annex-B H.265
	#[cfg(feature = "hevc")]
	Hevc,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::load()?;
	cli.log.init();

	let film = Film::new(cli.config.clone(), Canvas::new());

	tracing::info!(input = %cli.input, codec = ?cli.codec, "fetching");
	let completion = match cli.codec {
		Codec::Y4m => film.start(cli.input.clone(), film::y4m::Decoder::new())?,
		#[cfg(feature = "hevc")]
		Codec::Hevc => film.start(cli.input.clone(), film::hevc::Decoder::new()?)?,
	};

	let mut completion = completion.into_future();
	let mut progress = tokio::time::interval(Duration::from_secs(1));

	loop {
		tokio::select! {
			res = &mut completion => {
				res.context("failed to decode")?;
				break;
			}
			_ = progress.tick() => {
				tracing::info!(phase = ?film.phase(), buffered = film.buffered(), "decoding");
			}
		}
	}

	tracing::info!(
		frames = film.frame_count().unwrap_or_default(),
		dimensions = ?film.dimensions(),
		"decoded"
	);

	if cli.frame.is_empty() && cli.seek.is_empty() {
		tracing::info!("nothing to write, pass --frame or --seek");
		return Ok(());
	}

	tokio::fs::create_dir_all(&cli.output)
		.await
		.with_context(|| format!("failed to create {}", cli.output.display()))?;

	for index in cli.frame {
		let index = film.draw_frame(index)?;
		write(&film, &cli.output, index)?;
	}

	for fraction in cli.seek {
		let index = film.seek(fraction)?;
		write(&film, &cli.output, index)?;
	}

	Ok(())
}

fn write(film: &Film<Canvas>, output: &std::path::Path, index: usize) -> anyhow::Result<()> {
	let path = output.join(format!("frame-{index:05}.png"));
	film.with_renderer(|canvas| canvas.save(&path))
		.with_context(|| format!("failed to write {}", path.display()))?;

	tracing::info!(index, path = %path.display(), "wrote frame");
	Ok(())
}
