//! Schema inference tests

use super::*;
use crate::error::Error;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use test_case::test_case;

const PREFIX: &str = "orders/lines/loadtype=replace/loadset=2024-01-05/";

fn gzip(lines: &[&str]) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        encoder.write_all(line.as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    Bytes::from(encoder.finish().unwrap())
}

async fn store_with(files: &[(&str, Bytes)]) -> Arc<dyn ObjectStore> {
    let store = InMemory::new();
    for (name, data) in files {
        let path = ObjectPath::from(format!("{PREFIX}{name}"));
        store.put(&path, data.clone().into()).await.unwrap();
    }
    Arc::new(store)
}

fn types(schema: &CompositeSchema) -> Vec<(&str, FieldType)> {
    schema
        .fields()
        .iter()
        .map(|f| (f.name.as_str(), f.field_type))
        .collect()
}

// ============================================================================
// Classification
// ============================================================================

#[test_case(json!(true), FieldType::Boolean ; "boolean")]
#[test_case(json!(false), FieldType::Boolean ; "boolean false")]
#[test_case(json!({"a": 1}), FieldType::String ; "nested object")]
#[test_case(json!(42), FieldType::Integer ; "integer")]
#[test_case(json!(-7), FieldType::Integer ; "negative integer")]
#[test_case(json!(u64::MAX), FieldType::Integer ; "unsigned integer")]
#[test_case(json!(10.5), FieldType::Float ; "float")]
#[test_case(json!(10.0), FieldType::Float ; "whole float")]
#[test_case(json!("hello"), FieldType::String ; "string")]
#[test_case(json!(null), FieldType::String ; "null")]
#[test_case(json!([1, 2]), FieldType::String ; "array")]
fn test_classify(value: serde_json::Value, expected: FieldType) {
    assert_eq!(classify(&value), expected);
}

#[test]
fn test_nested_object_is_string_regardless_of_contents() {
    let values = [
        json!({}),
        json!({"n": 1}),
        json!({"b": true, "inner": {"x": 1.5}}),
    ];
    for value in &values {
        assert_eq!(classify(value), FieldType::String);
    }
}

#[test]
fn test_field_type_serializes_uppercase() {
    assert_eq!(
        serde_json::to_value(FieldType::Integer).unwrap(),
        json!("INTEGER")
    );
    assert_eq!(FieldType::Boolean.to_string(), "BOOLEAN");
}

// ============================================================================
// Accumulation
// ============================================================================

#[test]
fn test_integer_promoted_to_float() {
    let mut acc = SchemaAccumulator::new();
    acc.observe("amt", &json!(10));
    assert_eq!(acc.schema().get("amt"), Some(FieldType::Integer));

    acc.observe("amt", &json!(10.5));
    assert_eq!(acc.schema().get("amt"), Some(FieldType::Float));

    // Promotion is irreversible
    acc.observe("amt", &json!(11));
    assert_eq!(acc.schema().get("amt"), Some(FieldType::Float));
}

#[test]
fn test_whole_numbers_stay_integer() {
    let mut acc = SchemaAccumulator::new();
    for n in [1, 2, 3, -4, 1_000_000] {
        acc.observe("id", &json!(n));
    }
    assert_eq!(acc.finish().get("id"), Some(FieldType::Integer));
}

#[test]
fn test_boolean_never_reclassified() {
    let mut acc = SchemaAccumulator::new();
    acc.observe("flag", &json!(true));
    acc.observe("flag", &json!("1"));
    acc.observe("flag", &json!(1));
    acc.observe("flag", &json!(1.5));
    assert_eq!(acc.schema().get("flag"), Some(FieldType::Boolean));
}

#[test]
fn test_string_is_absorbing() {
    let mut acc = SchemaAccumulator::new();
    acc.observe("code", &json!("A1"));
    acc.observe("code", &json!(1));
    acc.observe("code", &json!(1.5));
    acc.observe("code", &json!(false));
    assert_eq!(acc.schema().get("code"), Some(FieldType::String));
}

#[test]
fn test_float_does_not_narrow_to_integer() {
    let mut acc = SchemaAccumulator::new();
    acc.observe("x", &json!(1.5));
    acc.observe("x", &json!(2));
    assert_eq!(acc.schema().get("x"), Some(FieldType::Float));
}

#[test]
fn test_first_observed_order_across_records() {
    let mut acc = SchemaAccumulator::new();
    acc.observe_record(&json!({"id": 1}));
    acc.observe_record(&json!({"id": 2, "amt": 1.5}));
    acc.observe_record(&json!({"flag": true}));

    let schema = acc.finish();
    assert_eq!(
        types(&schema),
        vec![
            ("id", FieldType::Integer),
            ("amt", FieldType::Float),
            ("flag", FieldType::Boolean),
        ]
    );
}

#[test]
fn test_non_object_record_observes_nothing() {
    let mut acc = SchemaAccumulator::new();
    assert!(!acc.observe_record(&json!([1, 2, 3])));
    assert!(!acc.observe_record(&json!("text")));
    assert!(acc.schema().is_empty());
}

#[test]
fn test_bigquery_schema_json() {
    let mut acc = SchemaAccumulator::new();
    acc.observe_record(&json!({"id": 1}));
    let schema = acc.finish();

    assert_eq!(
        schema.to_bigquery_json(),
        json!({"fields": [{"name": "id", "type": "INTEGER", "mode": "NULLABLE"}]})
    );
}

// ============================================================================
// Sampling
// ============================================================================

#[tokio::test]
async fn test_sample_three_files_merges_types() {
    let store = store_with(&[
        ("a.json.gz", gzip(&[r#"{"id":1,"amt":10}"#])),
        ("b.json.gz", gzip(&[r#"{"id":2,"amt":10.5}"#])),
        ("c.json.gz", gzip(&[r#"{"id":3,"flag":true}"#])),
    ])
    .await;

    let reader = SampleReader::new(store, SampleBudget::new(10, 100));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(schema.get("id"), Some(FieldType::Integer));
    assert_eq!(schema.get("amt"), Some(FieldType::Float));
    assert_eq!(schema.get("flag"), Some(FieldType::Boolean));
    assert_eq!(schema.len(), 3);
    assert_eq!(stats.files_read, 3);
    assert_eq!(stats.records, 3);
}

#[tokio::test]
async fn test_sample_result_independent_of_file_order() {
    // Same records as above, with the float file listed first
    let store = store_with(&[
        ("a.json.gz", gzip(&[r#"{"id":3,"flag":true}"#])),
        ("b.json.gz", gzip(&[r#"{"id":2,"amt":10.5}"#])),
        ("c.json.gz", gzip(&[r#"{"id":1,"amt":10}"#])),
    ])
    .await;

    let reader = SampleReader::new(store, SampleBudget::default());
    let (schema, _) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(schema.get("id"), Some(FieldType::Integer));
    assert_eq!(schema.get("amt"), Some(FieldType::Float));
    assert_eq!(schema.get("flag"), Some(FieldType::Boolean));
}

#[tokio::test]
async fn test_sample_respects_file_limit() {
    let store = store_with(&[
        ("a.json.gz", gzip(&[r#"{"a":1}"#])),
        ("b.json.gz", gzip(&[r#"{"b":1}"#])),
        ("c.json.gz", gzip(&[r#"{"c":1}"#])),
    ])
    .await;

    let reader = SampleReader::new(store, SampleBudget::new(2, 100));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.files_seen, 2);
    assert_eq!(stats.files_read, 2);
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_sample_respects_line_limit() {
    let store = store_with(&[(
        "a.json.gz",
        gzip(&[
            r#"{"a":1}"#,
            r#"{"a":2}"#,
            r#"{"a":2.5,"late":true}"#,
            r#"{"a":3}"#,
        ]),
    )])
    .await;

    let reader = SampleReader::new(store, SampleBudget::new(5, 2));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.lines_read, 2);
    assert_eq!(schema.get("a"), Some(FieldType::Integer));
    assert_eq!(schema.get("late"), None);
}

#[tokio::test]
async fn test_non_matching_name_counts_toward_limit() {
    let store = store_with(&[
        ("a_manifest.txt", Bytes::from_static(b"not gzip")),
        ("b.json.gz", gzip(&[r#"{"b":1}"#])),
        ("c.json.gz", gzip(&[r#"{"c":1}"#])),
    ])
    .await;

    let reader = SampleReader::new(store, SampleBudget::new(2, 100));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.files_seen, 2);
    assert_eq!(stats.files_read, 1);
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["b"]);
}

#[tokio::test]
async fn test_blank_lines_skipped_but_counted() {
    let store = store_with(&[("a.json.gz", gzip(&["", r#"{"a":"x"}"#, "", r#"{"b":1}"#]))]).await;

    let reader = SampleReader::new(store, SampleBudget::new(1, 3));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.lines_read, 3);
    assert_eq!(stats.records, 1);
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn test_last_line_without_newline() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"{\"a\":1}\n{\"b\":false}").unwrap();
    let data = Bytes::from(encoder.finish().unwrap());
    let store = store_with(&[("a.json.gz", data)]).await;

    let reader = SampleReader::new(store, SampleBudget::default());
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.lines_read, 2);
    assert_eq!(schema.get("b"), Some(FieldType::Boolean));
}

#[tokio::test]
async fn test_empty_prefix_is_empty_sample() {
    let store = store_with(&[]).await;
    let reader = SampleReader::new(store, SampleBudget::default());

    let err = reader.infer(PREFIX).await.unwrap_err();
    assert!(matches!(err, Error::EmptySample { .. }));
}

#[tokio::test]
async fn test_empty_file_is_no_fields_observed() {
    let store = store_with(&[("a.json.gz", gzip(&[]))]).await;
    let reader = SampleReader::new(store, SampleBudget::default());

    let err = reader.infer(PREFIX).await.unwrap_err();
    assert!(matches!(err, Error::NoFieldsObserved { files: 1, .. }));
}

#[tokio::test]
async fn test_only_non_matching_files_is_no_fields_observed() {
    let store = store_with(&[("_SUCCESS", Bytes::new())]).await;
    let reader = SampleReader::new(store, SampleBudget::default());

    let err = reader.infer(PREFIX).await.unwrap_err();
    assert!(matches!(err, Error::NoFieldsObserved { .. }));
}

#[tokio::test]
async fn test_malformed_line_reports_position() {
    let store = store_with(&[("a.json.gz", gzip(&[r#"{"a":1}"#, "{not json"]))]).await;
    let reader = SampleReader::new(store, SampleBudget::default());

    let err = reader.infer(PREFIX).await.unwrap_err();
    match err {
        Error::Decode { path, line, .. } => {
            assert!(path.ends_with("a.json.gz"));
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_custom_suffix() {
    let store = store_with(&[("part-0.gz", gzip(&[r#"{"x":1.25}"#]))]).await;
    let reader = SampleReader::new(store, SampleBudget::default()).with_suffix(".gz");

    let (schema, _) = reader.infer(PREFIX).await.unwrap();
    assert_eq!(schema.get("x"), Some(FieldType::Float));
}

#[tokio::test]
async fn test_concatenated_gzip_members() {
    // `cat a.gz b.gz` is a valid gzip file with two members
    let mut data = gzip(&[r#"{"a":1}"#]).to_vec();
    data.extend_from_slice(&gzip(&[r#"{"b":true}"#]));
    let store = store_with(&[("a.json.gz", Bytes::from(data))]).await;

    let reader = SampleReader::new(store, SampleBudget::default());
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(
        types(&schema),
        vec![("a", FieldType::Integer), ("b", FieldType::Boolean)]
    );
    assert_eq!(stats.lines_read, 2);
    assert_eq!(stats.records, 2);
}

// ============================================================================
// Streaming from a chunked store
// ============================================================================

const LARGE_EXPORT_LINES: usize = 20_000;

/// A few hundred KiB of gzip: integer ids with incompressible tokens, then
/// one final record without a trailing newline that widens `id` and adds
/// `last`.
fn large_export() -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for id in 0..LARGE_EXPORT_LINES {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        writeln!(
            encoder,
            r#"{{"id":{id},"token":"{state:016x}{:016x}"}}"#,
            state.rotate_left(29)
        )
        .unwrap();
    }
    encoder.write_all(br#"{"id":0.5,"last":true}"#).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// `LocalFileSystem` streams objects in small chunks, so lines straddle
/// chunk boundaries
async fn local_store_with(dir: &std::path::Path, data: Bytes) -> Arc<dyn ObjectStore> {
    let store = crate::storage::open_local(dir.to_str().unwrap()).unwrap();
    let path = ObjectPath::from(format!("{PREFIX}data_0_0_0.json.gz"));
    store.put(&path, data.into()).await.unwrap();
    store
}

#[tokio::test]
async fn test_chunked_stream_reads_every_line() {
    let data = large_export();
    assert!(data.len() > 200 * 1024, "export is {} bytes", data.len());
    let dir = tempfile::tempdir().unwrap();
    let store = local_store_with(dir.path(), data).await;

    let reader = SampleReader::new(store, SampleBudget::new(1, 1_000_000));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.lines_read, LARGE_EXPORT_LINES + 1);
    assert_eq!(stats.records, LARGE_EXPORT_LINES + 1);
    assert_eq!(
        types(&schema),
        vec![
            ("id", FieldType::Float),
            ("token", FieldType::String),
            ("last", FieldType::Boolean),
        ]
    );
}

#[tokio::test]
async fn test_chunked_stream_stops_at_line_limit() {
    let dir = tempfile::tempdir().unwrap();
    let store = local_store_with(dir.path(), large_export()).await;

    let reader = SampleReader::new(store, SampleBudget::new(1, 12_345));
    let (schema, stats) = reader.infer(PREFIX).await.unwrap();

    assert_eq!(stats.lines_read, 12_345);
    assert_eq!(stats.records, 12_345);
    assert_eq!(
        types(&schema),
        vec![("id", FieldType::Integer), ("token", FieldType::String)]
    );
}
