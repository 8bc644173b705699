//! Derived tables and the snapshot that pairs them.

pub mod builder;
pub mod price;
pub mod snapshot;
pub mod stats;
pub mod volume;

pub use builder::{build_snapshot, BuildError};
pub use price::{PriceRow, PriceTable};
pub use snapshot::Snapshot;
pub use stats::{row_stats, RowStats};
pub use volume::{VolumeRow, VolumeTable};
