//! The viewer's side of the query channel.
//!
//! A [`Viewer`] owns the channel to the filter worker, the input debouncer and
//! the [`ViewState`], which turns worker responses into rendered batches, stats
//! and the error line. Everything here runs in the UI context; nothing blocks
//! except [`Viewer::wait`].

use std::mem;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::channel::{ChannelState, Listener, QueryChannel, Response, Submission};
use crate::config::Settings;
use crate::dataset::{Metadata, RawDataset};
use crate::debounce::Debouncer;
use crate::engine::FilterResult;
use crate::error::{ApidexError, Result};
use crate::render::{IncrementalRenderer, RenderTarget, ScrollPosition};
use crate::stats::Stats;

pub struct ViewState<T: RenderTarget> {
    renderer: IncrementalRenderer,
    target: T,
    stats: Stats,
    error: Option<String>,
    initialized: bool,
}

impl<T: RenderTarget> ViewState<T> {
    pub fn new(renderer: IncrementalRenderer, target: T) -> Self {
        Self { renderer, target, stats: Stats::default(), error: None, initialized: false }
    }
    pub fn renderer(&self) -> &IncrementalRenderer {
        &self.renderer
    }
    pub fn target(&self) -> &T {
        &self.target
    }
    pub fn stats(&self) -> Stats {
        self.stats
    }
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<T: RenderTarget> Listener for ViewState<T> {
    fn init_complete(&mut self) {
        self.initialized = true;
    }

    fn filter_complete(&mut self, results: FilterResult) {
        self.stats = Stats::calculate(&results);
        self.renderer.show(results, &mut self.target);
    }

    fn filter_error(&mut self, error: ApidexError) {
        warn!(%error, "filter failed");
        self.error = Some(match &error {
            ApidexError::Query { .. } => format!("Query error: {error}"),
            other => other.to_string(),
        });
        self.stats = Stats::default();
        self.renderer.show(Vec::new(), &mut self.target);
    }
}

pub struct Viewer<T: RenderTarget> {
    channel: QueryChannel,
    debouncer: Debouncer,
    view: ViewState<T>,
    query: String,
    metadata: Metadata,
}

impl<T: RenderTarget> Viewer<T> {
    /// Fails with a `Render` error when the target is not usable.
    pub fn new(channel: QueryChannel, target: T, settings: &Settings) -> Result<Self> {
        target.ensure_ready()?;
        let renderer = IncrementalRenderer::new(settings.batch_size, settings.scroll_threshold);
        Ok(Self {
            channel,
            debouncer: Debouncer::new(settings.debounce()),
            view: ViewState::new(renderer, target),
            query: String::new(),
            metadata: Metadata::default(),
        })
    }

    /// Starts a dedicated worker thread for this viewer.
    pub fn spawn(target: T, settings: &Settings) -> Result<Self> {
        let channel = QueryChannel::spawn(settings.query_cache_capacity)?;
        Self::new(channel, target, settings)
    }

    pub fn load(&mut self, dataset: RawDataset) -> Submission {
        self.metadata = dataset.metadata.clone();
        info!(version = self.metadata.version(), "loading dataset into worker");
        self.channel.initialize(dataset, &mut self.view)
    }

    // ------------- Query input -------------

    /// Records keyboard input; the query is submitted once typing settles.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.query = text.to_string();
        self.debouncer.touch(now);
    }

    /// Submits the pending input if its quiet window has passed.
    pub fn tick(&mut self, now: Instant) -> Option<Submission> {
        self.debouncer.poll(now).then(|| self.submit())
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Sends the current query. Dropped, not queued, while another filter runs.
    pub fn submit(&mut self) -> Submission {
        self.view.error = None;
        self.channel.filter(&self.query, &mut self.view)
    }

    /// Replaces the query and submits it right away.
    pub fn set_query(&mut self, text: &str) -> Submission {
        self.debouncer.cancel();
        self.query = text.to_string();
        self.submit()
    }

    /// Clears the query and the error line and shows everything again.
    pub fn reset(&mut self) -> Submission {
        self.set_query("")
    }

    // ------------- Rendering triggers -------------

    pub fn on_scroll(&mut self, position: ScrollPosition) -> usize {
        self.view.renderer.on_scroll(position, &mut self.view.target)
    }

    pub fn on_visible(&mut self, intersecting: bool) -> usize {
        self.view.renderer.on_visibility(intersecting, &mut self.view.target)
    }

    pub fn load_more(&mut self) -> usize {
        self.view.renderer.render_next_batch(&mut self.view.target)
    }

    // ------------- Worker responses -------------

    // the first filter runs as soon as the worker has indexed the dataset
    fn after_dispatch(&mut self) {
        if mem::take(&mut self.view.initialized) {
            self.submit();
        }
    }

    pub fn handle_response(&mut self, response: Response) {
        self.channel.dispatch(response, &mut self.view);
        self.after_dispatch();
    }

    pub fn pump(&mut self) -> usize {
        let dispatched = self.channel.pump(&mut self.view);
        self.after_dispatch();
        dispatched
    }

    /// Blocks for one response. Not for use inside an async runtime.
    pub fn wait(&mut self) -> bool {
        let alive = self.channel.wait(&mut self.view);
        self.after_dispatch();
        alive
    }

    pub async fn next_response(&mut self) -> Option<Response> {
        self.channel.next_response().await
    }

    pub fn disconnected(&mut self) {
        self.channel.disconnected(&mut self.view);
    }

    pub fn restart(&mut self) -> Result<Submission> {
        self.channel.restart(&mut self.view)
    }

    // ------------- Accessors -------------

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }
    pub fn query(&self) -> &str {
        &self.query
    }
    pub fn error(&self) -> Option<&str> {
        self.view.error()
    }
    pub fn stats(&self) -> Stats {
        self.view.stats()
    }
    pub fn renderer(&self) -> &IncrementalRenderer {
        self.view.renderer()
    }
    pub fn target(&self) -> &T {
        self.view.target()
    }
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
    pub fn version(&self) -> &str {
        self.metadata.version()
    }
    pub fn updated(&self, now: DateTime<Utc>) -> String {
        self.metadata.updated(now)
    }
}
