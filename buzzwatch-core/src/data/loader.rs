//! Dataset loading: fetch → parse for one refresh cycle.
//!
//! The loader owns the configured sources and the table layout. It performs no
//! shared-state mutation; its only output is a [`LoadedDataset`] or an error.

use super::parse::{parse_table, CanonicalTable, ParseError, SummaryColumn, TableLayout};
use super::source::{DataSource, FetchError};
use thiserror::Error;

/// Errors from one load attempt.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch from {source_name} failed: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FetchError,
    },

    #[error("parse of {source_name} failed: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: ParseError,
    },
}

/// Parsed tables from one cycle, plus a fingerprint of the raw bytes.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub prices: CanonicalTable,
    pub volumes: Option<CanonicalTable>,
    /// BLAKE3 hash over the raw payload(s), hex encoded.
    pub dataset_hash: String,
}

/// Fetches and parses the price dataset and the optional volume-day dataset.
pub struct DatasetLoader {
    price_source: Box<dyn DataSource>,
    volume_source: Option<Box<dyn DataSource>>,
    layout: TableLayout,
}

impl DatasetLoader {
    pub fn new(price_source: Box<dyn DataSource>, layout: TableLayout) -> Self {
        Self {
            price_source,
            volume_source: None,
            layout,
        }
    }

    /// Attach a per-day volume dataset fetched in the same cycle.
    pub fn with_volume_source(mut self, source: Box<dyn DataSource>) -> Self {
        self.volume_source = Some(source);
        self
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Run one load. Both sources must succeed or nothing is returned.
    pub fn load(&self) -> Result<LoadedDataset, LoadError> {
        let mut hasher = blake3::Hasher::new();

        let price_bytes = fetch_from(self.price_source.as_ref())?;
        hasher.update(&price_bytes);

        let volume_bytes = match &self.volume_source {
            Some(source) => {
                let bytes = fetch_from(source.as_ref())?;
                hasher.update(b"\0volume\0");
                hasher.update(&bytes);
                Some((source.name().to_string(), bytes))
            }
            None => None,
        };

        let prices = parse_table(&price_bytes, &self.layout, SummaryColumn::Required).map_err(
            |error| LoadError::Parse {
                source_name: self.price_source.name().to_string(),
                error,
            },
        )?;

        let volumes = match volume_bytes {
            Some((source_name, bytes)) => Some(
                parse_table(&bytes, &self.layout, SummaryColumn::Optional)
                    .map_err(|error| LoadError::Parse { source_name, error })?,
            ),
            None => None,
        };

        Ok(LoadedDataset {
            prices,
            volumes,
            dataset_hash: hasher.finalize().to_hex().to_string(),
        })
    }
}

fn fetch_from(source: &dyn DataSource) -> Result<Vec<u8>, LoadError> {
    source.fetch().map_err(|error| LoadError::Fetch {
        source_name: source.name().to_string(),
        error,
    })
}
