//! Apidex – a filterable viewer for an API-reference dataset.
//!
//! The dataset lists classes with their members, plus enums with their items.
//! Apidex flattens it into a list of filterable items and lets the user narrow
//! that list with a small boolean expression language, e.g.
//! `type == "Property" && !deprecated && inheritance.includes("BasePart")`.
//!
//! Filtering runs on a worker thread that owns the indexed data; the viewer only
//! exchanges messages with it and renders the results in batches as the user
//! scrolls, so neither indexing nor a slow query stalls the input loop.
//!
//! ## Modules
//! * [`dataset`] – Raw dataset types, JSON loading and metadata formatting.
//! * [`index`] – Flattening into [`index::FilterableItem`]s (members and enums).
//! * [`query`] – The expression language: pest grammar in `query.pest`, a typed
//!   AST compiled once per query, and the evaluator over [`query::Bindings`].
//! * [`engine`] – [`engine::FilterEngine`], which applies a query to every item.
//!   An enum matches if the enum itself or any of its items matches.
//! * [`channel`] – The request/response protocol with the worker and the
//!   viewer-side state machine allowing one filter in flight.
//! * [`render`] – Incremental rendering in batches driven by scroll and
//!   visibility triggers.
//! * [`card`] – HTML and plain-text display cards and render targets.
//! * [`viewer`] – Ties channel, debouncer, renderer and stats together.
//! * [`config`] – Layered [`config::Settings`].
//!
//! ## Quick Start
//! ```
//! use apidex::{dataset::from_json_str, engine::FilterEngine};
//! let dataset = from_json_str(r#"{"classes": [{"name": "Part", "members": [
//!     {"name": "Anchored", "member_type": "Property", "value_type": "bool"},
//!     {"name": "Touched", "member_type": "Event", "deprecated": true}
//! ]}]}"#).unwrap();
//! let mut engine = FilterEngine::default();
//! engine.initialize(&dataset);
//! let results = engine.filter("type == 'Property'").unwrap();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].name(), "Anchored");
//! ```

pub mod card;
pub mod channel;
pub mod config;
pub mod dataset;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod render;
pub mod stats;
pub mod viewer;

pub use error::{ApidexError, Result};
