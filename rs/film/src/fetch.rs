use std::{convert::Infallible, fmt, path::PathBuf, str::FromStr};

use anyhow::Context;
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use url::Url;

/// Retrieves the whole compressed stream before decoding starts.
pub trait Fetch: Send + 'static {
	fn fetch(self) -> BoxFuture<'static, anyhow::Result<Bytes>>;
}

/// Where to fetch the compressed stream from.
#[derive(Clone, Debug)]
pub enum Source {
	File(PathBuf),
	Http(Url),
	Memory(Bytes),
}

impl Source {
	/// Interpret `http://` and `https://` URLs as such, anything else as a path.
	pub fn parse(input: &str) -> Self {
		match Url::parse(input) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Http(url),
			_ => Self::File(input.into()),
		}
	}
}

impl FromStr for Source {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::parse(s))
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::File(path) => write!(f, "{}", path.display()),
			Self::Http(url) => write!(f, "{url}"),
			Self::Memory(data) => write!(f, "memory ({} bytes)", data.len()),
		}
	}
}

impl From<PathBuf> for Source {
	fn from(path: PathBuf) -> Self {
		Self::File(path)
	}
}

impl From<Url> for Source {
	fn from(url: Url) -> Self {
		Self::Http(url)
	}
}

impl From<Bytes> for Source {
	fn from(data: Bytes) -> Self {
		Self::Memory(data)
	}
}

impl Fetch for Source {
	fn fetch(self) -> BoxFuture<'static, anyhow::Result<Bytes>> {
		async move {
			match self {
				Self::File(path) => {
					let data = tokio::fs::read(&path)
						.await
						.with_context(|| format!("failed to read {}", path.display()))?;
					Ok(data.into())
				}
				Self::Http(url) => {
					let response = reqwest::get(url.clone())
						.await
						.with_context(|| format!("failed to request {url}"))?
						.error_for_status()?;
					Ok(response.bytes().await?)
				}
				Self::Memory(data) => Ok(data),
			}
		}
		.boxed()
	}
}

impl Fetch for Bytes {
	fn fetch(self) -> BoxFuture<'static, anyhow::Result<Bytes>> {
		futures::future::ready(Ok(self)).boxed()
	}
}
