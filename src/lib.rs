pub mod collector;
pub mod common;
pub mod directory;
mod future_result;
pub mod index;
pub mod indexer;
pub mod query;
pub mod reader;
pub mod scoring;

use once_cell::sync::Lazy;
use std::path::Path;

pub use common::errors::SearchError;
pub use future_result::FutureResult;
pub use index::{Index, IndexBuilder};
pub use index::schema::{Document, Schema, SchemaBuilder};
pub use indexer::IndexWriter;
pub use query::Query;
pub use reader::{IndexReader, Searcher};

/// Monotonically increasing timestamp assigned to every write or delete
/// operation an `IndexWriter` processes. Used to order segment flushes and
/// to tag which operations a given commit covers.
pub type Opstamp = u64;

/// Position of a segment within the ordered list a `Searcher` or
/// `MultiSearch` fan-out iterates over.
pub type SegmentOrdinal = u32;

/// Crate-wide `Result` alias: every fallible operation returns a
/// [`SearchError`].
pub type Result<T> = std::result::Result<T, SearchError>;

/// The meta file contains all the information about the list of segments and
/// the schema of the index.
pub static META_FILEPATH: Lazy<&'static Path> = Lazy::new(|| Path::new("meta.json"));

/// Holds the `IndexConfig` tunables for an index.
pub static INDEX_CONFIG_FILEPATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new("index_config.json"));

/// The managed file contains a list of files that were created by this crate
/// and will therefore be garbage collected once deemed useless.
///
/// Removing this file is safe, but will prevent the garbage collection of
/// all of the files currently in the directory.
pub static MANAGED_FILEPATH: Lazy<&'static Path> = Lazy::new(|| Path::new(".managed.json"));

/// On-disk format version written by this crate.
pub const INDEX_FORMAT_VERSION: u32 = 1;
