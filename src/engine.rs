//! Worker-side filtering over the indexed dataset.
//!
//! The engine owns the two flat collections and evaluates a compiled query
//! against each of them. Results are members first, then enums, both in
//! indexer order. An enum is kept when the query matches the enum itself or
//! any one of its items.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use seahash::SeaHasher;
use tracing::{debug, info};

use crate::dataset::RawDataset;
use crate::error::{ApidexError, Result};
use crate::index::{FilterableItem, Index, index};
use crate::query::CompiledQuery;

pub type FilterResult = Vec<Arc<FilterableItem>>;

pub type QueryHasher = BuildHasherDefault<SeaHasher>;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

// Compiled queries keyed by their trimmed text. Typing and deleting a
// character brings back a query that was already compiled.
#[derive(Debug)]
struct QueryCache {
    capacity: usize,
    compiled: HashMap<String, Arc<CompiledQuery>, QueryHasher>,
}

impl QueryCache {
    fn get_or_compile(&mut self, query: &str) -> Result<Arc<CompiledQuery>> {
        let key = query.trim();
        if let Some(compiled) = self.compiled.get(key) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(CompiledQuery::compile(key)?);
        if self.capacity > 0 {
            if self.compiled.len() >= self.capacity {
                self.compiled.clear();
            }
            self.compiled.insert(key.to_string(), Arc::clone(&compiled));
        }
        Ok(compiled)
    }
}

/// Marks a filter as running and clears the mark when dropped, also on error.
pub(crate) struct InFlight<'e>(&'e AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct FilterEngine {
    index: Index,
    in_flight: AtomicBool,
    cache: Mutex<QueryCache>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FilterEngine {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            index: Index::default(),
            in_flight: AtomicBool::new(false),
            cache: Mutex::new(QueryCache { capacity: cache_capacity, compiled: HashMap::default() }),
        }
    }

    /// Indexes `dataset`, replacing whatever was held before.
    pub fn initialize(&mut self, dataset: &RawDataset) {
        self.index = index(dataset);
        info!(
            members = self.index.members.len(),
            enums = self.index.enum_types.len(),
            "filter engine initialized"
        );
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub(crate) fn try_begin(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| ApidexError::Busy)
    }

    pub fn is_filtering(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn compile(&self, query: &str) -> Result<Arc<CompiledQuery>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).get_or_compile(query)
    }

    /// Runs `query` over every indexed item. Fails with `Busy` when another
    /// filter on this engine has not finished, and with a single `Query` error
    /// if the query does not compile or any item fails to evaluate.
    pub fn filter(&self, query: &str) -> Result<FilterResult> {
        let _in_flight = self.try_begin()?;
        let started = Instant::now();
        let compiled = self.compile(query)?;
        if compiled.matches_all() {
            return Ok(self.index.iter().cloned().collect());
        }
        let mut results = Vec::new();
        for member in &self.index.members {
            if compiled.matches(&**member)? {
                results.push(Arc::clone(member));
            }
        }
        for enum_type in &self.index.enum_types {
            if enum_matches(&compiled, enum_type)? {
                results.push(Arc::clone(enum_type));
            }
        }
        debug!(
            query = compiled.source(),
            matches = results.len(),
            ms = started.elapsed().as_secs_f64() * 1000.0,
            "filter complete"
        );
        Ok(results)
    }
}

fn enum_matches(compiled: &CompiledQuery, item: &FilterableItem) -> Result<bool> {
    let Some(enum_type) = item.as_enum() else {
        return compiled.matches(item);
    };
    if compiled.matches(enum_type)? {
        return Ok(true);
    }
    for pseudo_item in enum_type.pseudo_items() {
        if compiled.matches(&pseudo_item)? {
            return Ok(true);
        }
    }
    Ok(false)
}
