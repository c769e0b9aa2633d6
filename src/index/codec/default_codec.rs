use std::io::Write;
use std::path::PathBuf;

use crate::common::errors::SearchError;
use crate::directory::Directory;
use crate::index::schema::Document;
use crate::index::SegmentId;
use crate::Result;

use super::{Codec, FieldDictionary, SegmentData};

/// The codec this crate ships and tests against: four bincode-encoded
/// files per segment, named after the component they hold. Any alternate
/// encoding (columnar doc values, FST term dictionaries, delta-encoded
/// postings...) can be swapped in behind the same [`Codec`] trait without
/// touching the indexer or query layers.
#[derive(Debug, Default)]
pub struct DefaultCodec;

fn postings_path(segment_id: SegmentId) -> PathBuf {
    PathBuf::from(format!("{segment_id}.postings"))
}

fn store_path(segment_id: SegmentId) -> PathBuf {
    PathBuf::from(format!("{segment_id}.store"))
}

fn fast_path(segment_id: SegmentId) -> PathBuf {
    PathBuf::from(format!("{segment_id}.fast"))
}

fn norms_path(segment_id: SegmentId) -> PathBuf {
    PathBuf::from(format!("{segment_id}.norms"))
}

fn write_bin(directory: &dyn Directory, path: &PathBuf, value: &impl serde::Serialize) -> Result<()> {
    let mut writer = directory
        .open_write(path)
        .map_err(|e| SearchError::SystemError(format!("opening {path:?}: {e}")))?;
    bincode::serialize_into(&mut writer, value)
        .map_err(|e| SearchError::Corruption(format!("serializing {path:?}: {e}")))?;
    writer.flush().map_err(SearchError::Io)?;
    Ok(())
}

fn read_bin<T: serde::de::DeserializeOwned>(directory: &dyn Directory, path: &PathBuf) -> Result<T> {
    let bytes = directory.atomic_read(path).map_err(|e| SearchError::SystemError(format!("{e}")))?;
    bincode::deserialize(&bytes).map_err(|e| SearchError::Corruption(format!("corrupt {path:?}: {e}")))
}

impl Codec for DefaultCodec {
    fn write_segment(
        &self,
        directory: &dyn Directory,
        segment_id: SegmentId,
        data: &SegmentData,
    ) -> Result<Vec<PathBuf>> {
        let postings = postings_path(segment_id);
        let store = store_path(segment_id);
        let fast = fast_path(segment_id);
        let norms = norms_path(segment_id);

        write_bin(directory, &postings, &(data.num_docs, &data.fields))?;
        write_bin(directory, &store, &data.stored_fields)?;
        write_bin(directory, &fast, &data.doc_values)?;
        write_bin(directory, &norms, &data.norms)?;

        Ok(vec![postings, store, fast, norms])
    }

    fn read_segment(&self, directory: &dyn Directory, segment_id: SegmentId) -> Result<SegmentData> {
        let (num_docs, fields): (u32, std::collections::HashMap<String, FieldDictionary>) =
            read_bin(directory, &postings_path(segment_id))?;
        let stored_fields: Vec<Option<Document>> = read_bin(directory, &store_path(segment_id))?;
        let doc_values = read_bin(directory, &fast_path(segment_id))?;
        let norms = read_bin(directory, &norms_path(segment_id))?;
        Ok(SegmentData { num_docs, fields, stored_fields, doc_values, norms })
    }

    fn file_names(&self, segment_id: SegmentId) -> Vec<PathBuf> {
        vec![
            postings_path(segment_id),
            store_path(segment_id),
            fast_path(segment_id),
            norms_path(segment_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ram_directory::RamDirectory;

    #[test]
    fn test_write_read_roundtrip() {
        let directory = RamDirectory::create();
        let codec = DefaultCodec;
        let segment_id = SegmentId::generate_random();
        let mut data = SegmentData { num_docs: 2, ..Default::default() };
        data.stored_fields = vec![Some(Document::new(b"a".to_vec())), None];

        codec.write_segment(&directory, segment_id, &data).unwrap();
        let loaded = codec.read_segment(&directory, segment_id).unwrap();
        assert_eq!(loaded.num_docs, 2);
        assert_eq!(loaded.stored_fields.len(), 2);
        assert!(loaded.stored_fields[1].is_none());
    }
}
