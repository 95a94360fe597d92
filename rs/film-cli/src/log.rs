use clap::Args;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging configuration; `RUST_LOG` takes precedence when set.
#[derive(Args, Clone, Debug)]
pub struct Log {
	/// The level of logs to print.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "FILM_LOG_LEVEL")]
	pub level: tracing::Level,
}

impl Log {
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy();

		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
	}
}
