//! Incremental rendering of a filter result.
//!
//! The renderer holds the whole result list but hands it to a [`RenderTarget`]
//! a batch at a time, advancing a cursor. More batches are rendered only when
//! the host reports that the end of the rendered content is close to the
//! viewport, either through a visibility signal or a scroll position.

use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::engine::FilterResult;
use crate::error::Result;
use crate::index::FilterableItem;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 0.8;

/// Where rendered batches end up.
pub trait RenderTarget {
    /// Checks that everything the target writes into exists. Called once at startup.
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }
    fn clear(&mut self);
    fn append(&mut self, batch: &[Arc<FilterableItem>]);
    fn show_no_results(&mut self);
    /// `rendered < total` shows the loading indicator, otherwise removes it.
    fn show_progress(&mut self, rendered: usize, total: usize);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub viewport_height: f64,
    pub scroll_y: f64,
    pub document_height: f64,
}

impl ScrollPosition {
    /// Share of the document that is above the bottom of the viewport.
    pub fn fraction(&self) -> f64 {
        if self.document_height <= 0.0 {
            return 1.0;
        }
        (self.viewport_height + self.scroll_y) / self.document_height
    }
}

/// A claimed batch. Only the result list it was claimed from can complete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    generation: u64,
    range: Range<usize>,
}

impl Batch {
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
    pub fn len(&self) -> usize {
        self.range.len()
    }
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct IncrementalRenderer {
    results: FilterResult,
    generation: u64,
    rendered: usize,
    batch_size: usize,
    scroll_threshold: f64,
    loading_more: bool,
}

impl Default for IncrementalRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_SCROLL_THRESHOLD)
    }
}

impl IncrementalRenderer {
    pub fn new(batch_size: usize, scroll_threshold: f64) -> Self {
        Self {
            results: Vec::new(),
            generation: 0,
            rendered: 0,
            batch_size: batch_size.max(1),
            scroll_threshold,
            loading_more: false,
        }
    }

    pub fn results(&self) -> &[Arc<FilterableItem>] {
        &self.results
    }
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }
    pub fn total(&self) -> usize {
        self.results.len()
    }
    pub fn has_more(&self) -> bool {
        self.rendered < self.results.len()
    }
    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    /// Replaces the held results and rewinds the cursor. Nothing is rendered.
    pub fn set_results(&mut self, results: FilterResult) {
        self.results = results;
        self.generation += 1;
        self.rendered = 0;
        self.loading_more = false;
    }

    /// Rebuilds the target from scratch for a new result: either the first
    /// batch or the "no results" indicator.
    pub fn show(&mut self, results: FilterResult, target: &mut dyn RenderTarget) -> usize {
        self.set_results(results);
        target.clear();
        if self.results.is_empty() {
            target.show_no_results();
            0
        } else {
            self.render_next_batch(target)
        }
    }

    /// Claims the next batch. `None` while another batch is being rendered or
    /// when everything is rendered already.
    pub fn begin_batch(&mut self) -> Option<Batch> {
        if self.loading_more || !self.has_more() {
            return None;
        }
        self.loading_more = true;
        let start = self.rendered;
        Some(Batch { generation: self.generation, range: start..(start + self.batch_size).min(self.results.len()) })
    }

    /// Advances the cursor past `batch`. A batch claimed before the last
    /// `set_results` is ignored.
    pub fn complete_batch(&mut self, batch: Batch) -> bool {
        if batch.generation != self.generation {
            trace!("stale batch ignored");
            return false;
        }
        self.rendered = batch.range.end.min(self.results.len());
        self.loading_more = false;
        true
    }

    /// Renders at most one batch and returns how many items it held.
    pub fn render_next_batch(&mut self, target: &mut dyn RenderTarget) -> usize {
        let Some(batch) = self.begin_batch() else {
            return 0;
        };
        target.append(&self.results[batch.range()]);
        let count = batch.len();
        self.complete_batch(batch);
        target.show_progress(self.rendered, self.results.len());
        trace!(rendered = self.rendered, total = self.results.len(), "batch rendered");
        count
    }

    /// The end-of-content sentinel changed visibility.
    pub fn on_visibility(&mut self, intersecting: bool, target: &mut dyn RenderTarget) -> usize {
        if intersecting && self.has_more() {
            self.render_next_batch(target)
        } else {
            0
        }
    }

    /// The viewport scrolled; renders when close enough to the bottom.
    pub fn on_scroll(&mut self, position: ScrollPosition, target: &mut dyn RenderTarget) -> usize {
        if position.fraction() > self.scroll_threshold {
            self.render_next_batch(target)
        } else {
            0
        }
    }
}
