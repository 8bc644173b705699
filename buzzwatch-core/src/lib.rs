//! BuzzWatch Core: dataset loading, derived tables, snapshot store, signals.
//!
//! This crate contains the refresh-and-signal engine:
//! - Data sources (HTTP, file) and all-or-nothing CSV parsing
//! - Derived table builder (row mean and sample std, table reconciliation)
//! - Dataset store with atomic snapshot publication
//! - Signal engine (price-deviation breaches, volume spikes, buzzing stocks)
//! - Query interface for display and alerting

pub mod data;
pub mod query;
pub mod signals;
pub mod store;
pub mod tables;

pub use data::{DataSource, DatasetLoader, FetchError, LoadError, ParseError, TableLayout};
pub use query::{NotFoundError, PricePoint, PriceSeries, StockQuery};
pub use signals::{SignalParams, SignalReport, StockSet};
pub use store::DatasetStore;
pub use tables::{build_snapshot, BuildError, Snapshot};
