use std::{future::IntoFuture, num::NonZeroUsize, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
	Config, Converter, Cursor, Decoder, Dimensions, Error, Feeder, Fetch, FrameBuffer, Phase, RasterFrame, Renderer,
	Result, Rgba, Tracker, convert::Scheduler,
};

/// Everything the pipeline tasks share.
#[derive(Debug, Default)]
pub(crate) struct State {
	tracker: Tracker,
	frames: FrameBuffer,
	cursor: Cursor,

	// The final frame count, set once ready.
	count: Option<usize>,

	// Set from the first decoded frame.
	dimensions: Option<Dimensions>,

	// Set when the pipeline fails.
	error: Option<Error>,
}

impl State {
	/// Size the surface from the first decoded frame; later calls do nothing.
	pub fn size<R: Renderer + ?Sized>(&mut self, dimensions: Dimensions, renderer: &mut R) {
		if self.dimensions.is_some() {
			return;
		}

		tracing::info!(
			width = dimensions.width,
			height = dimensions.height,
			"first frame arrived, sizing the surface"
		);

		renderer.resize(dimensions.width, dimensions.height);
		self.dimensions = Some(dimensions);
	}

	/// Reserve a slot for a frame about to be converted.
	pub fn reserve(&mut self) -> usize {
		self.tracker.enqueued();
		self.frames.reserve()
	}

	/// Store a finished conversion, returning true if anything changed.
	pub fn converted<R: Renderer + ?Sized>(
		&mut self,
		index: usize,
		res: Result<RasterFrame>,
		renderer: &mut R,
		draw_first_frame: bool,
	) -> bool {
		let frame = match res {
			Ok(frame) => frame,
			Err(err) => return self.fail(err),
		};

		if self.tracker.phase() == Phase::Failed {
			return false;
		}

		self.frames.fill(index, frame);
		tracing::debug!(index, buffered = self.frames.len(), "frame converted");

		if index == 0 && draw_first_frame && self.cursor.current().is_none() {
			if let Some(first) = self.frames.get(0) {
				tracing::info!("drawing the first frame we got");
				self.cursor.show(0, first, renderer);
			}
		}

		if self.tracker.converted() {
			self.ready();
		}

		true
	}

	/// The feeder is done, returning true if that made the pipeline ready.
	pub fn exhausted(&mut self) -> bool {
		tracing::info!(pending = self.frames.pending(), "all frames decoded");

		if self.tracker.exhaust() {
			self.ready();
			return true;
		}

		false
	}

	/// Move to `Failed`, returning false if the pipeline already finished.
	pub fn fail(&mut self, err: Error) -> bool {
		if !self.tracker.fail() {
			return false;
		}

		tracing::error!(%err, "pipeline failed");
		self.error = Some(err);
		true
	}

	fn ready(&mut self) {
		let count = self.frames.finalize();
		tracing::info!(count, "all decoded frames have been converted");
		self.count = Some(count);
	}

	fn finished(&self) -> bool {
		self.tracker.phase().is_terminal()
	}
}

/// Progressively decodes a compressed video stream into display-ready frames.
///
/// Frames can be drawn as soon as they are converted; once the whole stream has been processed the
/// pipeline is ready and any frame can be drawn or seeked to.
pub struct Film<R> {
	config: Config,
	state: watch::Sender<State>,

	// Always locked before the state, never while holding it.
	renderer: Arc<Mutex<R>>,
	converter: Arc<dyn Converter>,
}

impl<R: Renderer> Film<R> {
	/// Create an idle pipeline using the default [Rgba] converter.
	pub fn new(config: Config, renderer: R) -> Self {
		Self::with_converter(config, renderer, Rgba)
	}

	pub fn with_converter(config: Config, renderer: R, converter: impl Converter) -> Self {
		Self {
			config,
			state: watch::Sender::new(State::default()),
			renderer: Arc::new(Mutex::new(renderer)),
			converter: Arc::new(converter),
		}
	}

	/// Create a pipeline and start it immediately.
	pub fn spawn<F, D>(config: Config, renderer: R, fetch: F, decoder: D) -> Result<(Self, Completion)>
	where
		F: Fetch,
		D: Decoder + Send + 'static,
	{
		let film = Self::new(config, renderer);
		let completion = film.start(fetch, decoder)?;
		Ok((film, completion))
	}

	/// Fetch the stream and decode it in the background.
	///
	/// Must be called within a tokio runtime. The returned [Completion] resolves once every frame
	/// has been decoded and converted, or with the error that stopped the pipeline.
	pub fn start<F, D>(&self, fetch: F, decoder: D) -> Result<Completion>
	where
		F: Fetch,
		D: Decoder + Send + 'static,
	{
		if self.phase() != Phase::Idle {
			tracing::error!("the decoder has already been fired");
			return Err(Error::AlreadyStarted);
		}

		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			tracing::error!("not running within a tokio runtime, the decoder won't start");
			return Err(Error::Unsupported("no tokio runtime"));
		};

		if !self.converter.supported() {
			tracing::error!("raster conversion is not supported here, the decoder won't start");
			return Err(Error::Unsupported("raster conversion unavailable"));
		}

		let mut started = Ok(());
		self.state.send_if_modified(|state| {
			started = state.tracker.start();
			started.is_ok()
		});
		started?;

		let completion = self.completion();
		let scheduler = Scheduler::new(
			self.state.clone(),
			self.renderer.clone(),
			self.converter.clone(),
			self.config.draw_first_frame(),
		);

		runtime.spawn(run(scheduler, fetch, decoder, self.config.chunk_size()));

		Ok(completion)
	}

	/// Resolves once the pipeline is ready or failed.
	pub fn completion(&self) -> Completion {
		Completion {
			state: self.state.subscribe(),
		}
	}

	/// Paint the frame at `index`, returning the index.
	///
	/// Drawing the frame already on screen does nothing.
	pub fn draw_frame(&self, index: usize) -> Result<usize> {
		let mut result = Ok(index);
		let mut renderer = self.renderer.lock();

		self.state.send_if_modified(|state| {
			let State { cursor, frames, count, .. } = state;
			match cursor.draw(index, frames, *count, &mut *renderer) {
				Ok(painted) => painted,
				Err(err) => {
					result = Err(err);
					false
				}
			}
		});

		result
	}

	/// Draw the frame at `fraction` of the footage, returning its index.
	///
	/// Only available once the pipeline is ready.
	pub fn seek(&self, fraction: f64) -> Result<usize> {
		let count = self.state.borrow().count;
		let index = Cursor::seek_index(fraction, count)?;
		self.draw_frame(index)
	}

	pub fn phase(&self) -> Phase {
		self.state.borrow().tracker.phase()
	}

	pub fn is_ready(&self) -> bool {
		self.phase() == Phase::Ready
	}

	/// The total number of frames, known once ready.
	pub fn frame_count(&self) -> Option<usize> {
		self.state.borrow().count
	}

	/// The number of frames that can be drawn right now.
	pub fn buffered(&self) -> usize {
		self.state.borrow().frames.len()
	}

	/// The index of the frame on screen, if any.
	pub fn current_frame(&self) -> Option<usize> {
		self.state.borrow().cursor.current()
	}

	/// The size of the footage, known once the first frame is decoded.
	pub fn dimensions(&self) -> Option<Dimensions> {
		self.state.borrow().dimensions
	}

	/// A buffered frame.
	pub fn frame(&self, index: usize) -> Option<RasterFrame> {
		self.state.borrow().frames.get(index).cloned()
	}

	/// The error that failed the pipeline, if any.
	pub fn error(&self) -> Option<Error> {
		self.state.borrow().error.clone()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Run `f` with the renderer, returning its result.
	///
	/// Queries are fine within `f`, but drawing or seeking from it deadlocks.
	pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
		f(&self.renderer.lock())
	}
}

async fn run<R, F, D>(scheduler: Scheduler<R>, fetch: F, decoder: D, chunk_size: NonZeroUsize)
where
	R: Renderer,
	F: Fetch,
	D: Decoder + Send + 'static,
{
	if let Err(err) = feed(&scheduler, fetch, decoder, chunk_size).await {
		scheduler.state().send_if_modified(|state| state.fail(err));
	}
}

async fn feed<R, F, D>(scheduler: &Scheduler<R>, fetch: F, decoder: D, chunk_size: NonZeroUsize) -> Result<()>
where
	R: Renderer,
	F: Fetch,
	D: Decoder + Send + 'static,
{
	let data = fetch.fetch().await?;

	tracing::info!(size = data.len(), "start decoding");
	scheduler.state().send_if_modified(|state| state.tracker.feeding());

	let mut feeder = Feeder::new(data, decoder, chunk_size);
	while !feeder.advance(|frame| scheduler.enqueue(frame))? {
		// Let conversions make progress between chunks.
		tokio::task::yield_now().await;

		if scheduler.state().borrow().tracker.phase() == Phase::Failed {
			tracing::debug!(position = feeder.position(), "pipeline failed, no longer decoding");
			return Ok(());
		}
	}

	scheduler.state().send_if_modified(|state| state.exhausted());

	Ok(())
}

/// Resolves once the pipeline is ready, or with the error that failed it.
pub struct Completion {
	state: watch::Receiver<State>,
}

impl Completion {
	pub async fn wait(mut self) -> Result<()> {
		let state = self
			.state
			.wait_for(State::finished)
			.await
			.map_err(|_| Error::Dropped)?;

		match &state.error {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}
}

impl IntoFuture for Completion {
	type Output = Result<()>;
	type IntoFuture = BoxFuture<'static, Result<()>>;

	fn into_future(self) -> Self::IntoFuture {
		self.wait().boxed()
	}
}
