pub mod codec;
mod index;
mod index_builder;
mod index_meta;
mod index_settings;
pub mod schema;
mod segment;
mod segment_component;
mod segment_id;
mod segment_reader;

pub use segment_component::SegmentComponent;
pub use segment_id::{SegmentId, SegmentIdParseError};

pub use index::Index;
pub use index_builder::*;
pub use index_meta::*;
pub use index_settings::IndexSettings;
pub use segment::Segment;
pub use segment_reader::SegmentReader;
