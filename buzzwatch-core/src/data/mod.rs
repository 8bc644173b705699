//! Dataset loading: sources, CSV parsing, and the per-cycle loader.

pub mod http;
pub mod loader;
pub mod parse;
pub mod source;

pub use http::{backoff_delay, HttpOptions, HttpSource, MAX_BACKOFF, MAX_RETRIES};
pub use loader::{DatasetLoader, LoadError, LoadedDataset};
pub use parse::{parse_table, CanonicalTable, ParseError, RawRow, SummaryColumn, TableLayout};
pub use source::{DataSource, FetchError, FileSource, StaticSource};
