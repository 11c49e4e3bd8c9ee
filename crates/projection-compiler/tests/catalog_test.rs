use std::fs;

use pretty_assertions::assert_eq;

use projection_compiler::{
    CompileError, IndexTarget, MappingDocument, PlanCompiler, Shape, ShapeRegistry, TableTarget,
    Value,
};

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct SampleEvent {
    kind: String,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Sample {
    sample_id: i64,
    name: String,
}

const TABLE: &str = r#"{
  "clickhouse": {
    "table": "samples",
    "format": "object[]",
    "items": {
      "id": { "source": "record.SampleId", "type": "int" },
      "kind": { "source": "event.Kind", "type": "string" }
    }
  }
}"#;

const INDEX: &str = r#"{
  "index": "samples",
  "id": "record.SampleId",
  "fields": { "name": "record.Name", "kind": "event.Kind" }
}"#;

#[test]
fn catalog_mounts_files_by_relative_path() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("search")).unwrap();
    fs::write(dir.path().join("samples.json"), TABLE).unwrap();
    fs::write(dir.path().join("search").join("samples.json"), INDEX).unwrap();
    fs::write(dir.path().join("README.md"), "not a mapping").unwrap();

    let doc = MappingDocument::load_dir(dir.path()).unwrap();
    let compiler = PlanCompiler::new(ShapeRegistry::new().with::<SampleEvent>().with::<Sample>());

    let event = SampleEvent {
        kind: "created".to_string(),
    };
    let sample = Sample {
        sample_id: 42,
        name: "test-name".to_string(),
    };

    let table = TableTarget::<SampleEvent, Sample>::compile(
        &compiler,
        &doc.section("samples:clickhouse").unwrap(),
    )
    .unwrap();
    let mut batch = table.batch();
    table.append(&mut batch, &event, &sample);
    assert_eq!(batch.table(), "samples");
    assert_eq!(
        batch.rows(),
        [vec![Value::Int(42), Value::String("created".to_string())]]
    );

    let index = IndexTarget::<SampleEvent, Sample>::compile(
        &compiler,
        &doc.section("search:samples").unwrap(),
    )
    .unwrap();
    let document = index.document(&event, &sample);
    assert_eq!(document.id, Value::Int(42));
    assert_eq!(document.body, r#"{"name":"test-name","kind":"created"}"#);
}

#[test]
fn catalog_reports_bad_json_with_file_name() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    match MappingDocument::load_dir(dir.path()) {
        Err(CompileError::Parse { source_name, .. }) => assert!(source_name.ends_with("broken.json")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn missing_section_is_reported() {
    let doc = MappingDocument::parse("inline", TABLE).unwrap();
    match doc.section("clickhouse:nope") {
        Err(CompileError::MissingSection { path }) => assert_eq!(path.as_str(), "clickhouse:nope"),
        other => panic!("unexpected: {:?}", other.map(|s| s.path().clone())),
    }
}
