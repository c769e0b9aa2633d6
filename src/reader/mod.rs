mod index_reader;
pub mod searcher;
mod warming;
pub use warming::Warmer;

pub use index_reader::{IndexReader, IndexReaderBuilder, ReloadPolicy};
pub use searcher::*;
