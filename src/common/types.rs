/// Relevance score produced by a [`Similarity`](crate::scoring::Similarity).
pub type ScoreType = f32;

/// A document's ordinal position within a single segment.
pub type DocId = u32;
