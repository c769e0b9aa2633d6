use vellum::index::schema::{analyze_default, Document, FieldType, FieldValue, Schema};
use vellum::index::{IndexBuilder, IndexSettings};
use vellum::indexer::NoMergePolicy;
use vellum::query::{BooleanQuery, Occur, PhraseQuery, PrefixQuery, TermQuery};
use vellum::reader::ReloadPolicy;

fn book_schema() -> Schema {
    Schema::builder()
        .add_field("title", FieldType::Text { indexed: true, stored: true, term_vectors: false })
        .add_field("body", FieldType::Text { indexed: true, stored: false, term_vectors: false })
        .build()
}

fn add_book(
    writer: &vellum::IndexWriter,
    id: &str,
    title: &str,
    body: &str,
) -> vellum::Result<u64> {
    let mut doc = Document::new(id.as_bytes().to_vec());
    doc.add_field("title", FieldValue::Text(title.to_string()));
    doc.add_field("body", FieldValue::Text(body.to_string()));
    writer.add_document(doc, vec![analyze_default("title", title), analyze_default("body", body)])
}

#[test]
fn writer_commit_reader_search_round_trip() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();

    add_book(&writer, "1", "The Old Man and the Sea", "an old fisherman struggles with a giant marlin").unwrap();
    add_book(&writer, "2", "Moby Dick", "a whaling ship chases a giant white whale").unwrap();
    add_book(&writer, "3", "The Sea Wolf", "a sailor survives aboard a brutal sealing schooner").unwrap();
    writer.commit().unwrap();

    let reader = index.reader().unwrap();
    let searcher = reader.searcher();
    assert_eq!(searcher.num_docs(), 3);

    let query = TermQuery::new("body", b"giant".to_vec());
    let matches = searcher.search(&query, 10).unwrap();
    assert_eq!(matches.len(), 2);
    for m in &matches {
        let doc = searcher.doc(m).unwrap();
        assert!(doc.fields.iter().any(|(name, _)| name == "title"));
    }
}

#[test]
fn reader_reflects_new_commits_after_reload() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();
    writer.set_merge_policy(Box::new(NoMergePolicy));

    add_book(&writer, "1", "Dune", "a desert planet and its spice").unwrap();
    writer.commit().unwrap();

    let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().unwrap();
    assert_eq!(reader.searcher().num_docs(), 1);

    add_book(&writer, "2", "Dune Messiah", "the desert planet years later").unwrap();
    writer.commit().unwrap();

    // stale until explicitly reloaded
    assert_eq!(reader.searcher().num_docs(), 1);
    reader.reload().unwrap();
    assert_eq!(reader.searcher().num_docs(), 2);
}

#[test]
fn delete_term_removes_matching_docs_on_next_commit() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();

    add_book(&writer, "1", "Alpha", "common word here").unwrap();
    add_book(&writer, "2", "Beta", "common word also here").unwrap();
    writer.commit().unwrap();

    let reader = index.reader().unwrap();
    assert_eq!(reader.searcher().num_docs(), 2);

    writer.delete_term("title", b"alpha").unwrap();
    writer.commit().unwrap();
    reader.reload().unwrap();

    let searcher = reader.searcher();
    assert_eq!(searcher.num_docs(), 1);
    let query = TermQuery::new("title", b"alpha".to_vec());
    assert!(searcher.search(&query, 10).unwrap().is_empty());
}

#[test]
fn boolean_query_combines_must_should_must_not() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();

    add_book(&writer, "1", "Red Fox", "a quick fox jumps over a lazy dog").unwrap();
    add_book(&writer, "2", "Gray Wolf", "a quick wolf runs past a lazy dog").unwrap();
    add_book(&writer, "3", "Lost Cat", "a slow cat sleeps all day").unwrap();
    writer.commit().unwrap();

    let reader = index.reader().unwrap();
    let searcher = reader.searcher();

    let query = BooleanQuery::new(vec![
        (Occur::Must, Box::new(TermQuery::new("body", b"quick".to_vec()))),
        (Occur::MustNot, Box::new(TermQuery::new("body", b"wolf".to_vec()))),
    ]);
    let matches = searcher.search(&query, 10).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(searcher.doc(&matches[0]).unwrap().id.as_slice(), b"1");
}

#[test]
fn phrase_and_prefix_queries_match_expected_docs() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();

    add_book(&writer, "1", "A", "the quick brown fox").unwrap();
    add_book(&writer, "2", "B", "brown quick fox").unwrap();
    add_book(&writer, "3", "C", "quickly browning bread").unwrap();
    writer.commit().unwrap();

    let reader = index.reader().unwrap();
    let searcher = reader.searcher();

    let phrase = PhraseQuery::new("body", vec![b"quick".to_vec(), b"brown".to_vec()]);
    let matches = searcher.search(&phrase, 10).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(searcher.doc(&matches[0]).unwrap().id.as_slice(), b"1");

    let prefix = PrefixQuery::new("body", b"quick".to_vec());
    let matches = searcher.search(&prefix, 10).unwrap();
    assert_eq!(matches.len(), 3);
}

#[test]
fn resolve_global_doc_is_stable_across_segment_boundaries() {
    let settings = IndexSettings { schema: book_schema(), ..Default::default() };
    let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
    let mut writer = index.writer_for_tests().unwrap();
    writer.set_merge_policy(Box::new(NoMergePolicy));

    for i in 0..4 {
        add_book(&writer, &format!("a-{i}"), "Batch A", "shared text").unwrap();
    }
    writer.commit().unwrap();
    for i in 0..3 {
        add_book(&writer, &format!("b-{i}"), "Batch B", "shared text").unwrap();
    }
    writer.commit().unwrap();

    let reader = index.reader().unwrap();
    let searcher = reader.searcher();
    assert_eq!(searcher.num_docs(), 7);

    let mut seen = Vec::new();
    for global in 0..7 {
        let (segment_ord, doc) = searcher.resolve_global_doc(global).unwrap();
        seen.push((segment_ord, doc));
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
    assert!(searcher.resolve_global_doc(7).is_none());
}
