//! Debug script to see what the plan compiler produces.
//!
//! Compiles a built-in sample mapping (or the `object[]` mapping at
//! `<file> <section>` when given) and prints the compiled plans and their
//! output for one sample record. Set `RUST_LOG=projection_compiler=trace` to
//! see compilation and cache events.

use std::path::Path;

use projection_compiler::{MappingDocument, PlanCompiler, Shape, ShapeRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct SampleEvent {
    kind: String,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Attachment {
    file_name: String,
    url: String,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Sample {
    sample_id: i64,
    name: String,
    #[shape(items)]
    attachments: Vec<Attachment>,
}

const SAMPLE_MAPPING: &str = r#"{
  "samples": {
    "format": "object[]",
    "items": {
      "id": { "source": "record.SampleId", "type": "int", "order": 1 },
      "kind": { "source": "const.Sample", "type": "string", "order": 2 },
      "event": { "source": "event.Kind", "type": "string" },
      "document": {
        "format": "json",
        "fields": {
          "sample_id": "record.SampleId",
          "name": "record.Name",
          "attachments": {
            "type": "array",
            "context": "record.Attachments",
            "items": { "filename": "item.FileName", "url": "item.Url" }
          }
        }
      }
    }
  }
}"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (doc, section) = match args.as_slice() {
        [file, section] => match MappingDocument::from_path(Path::new(file)) {
            Ok(doc) => (doc, section.clone()),
            Err(e) => return report(e),
        },
        _ => match MappingDocument::parse("<built-in>", SAMPLE_MAPPING) {
            Ok(doc) => (doc, "samples".to_string()),
            Err(e) => return report(e),
        },
    };

    let registry = ShapeRegistry::new().with::<SampleEvent>().with::<Sample>();
    let compiler = PlanCompiler::new(registry);

    let plan = match doc
        .section(&section)
        .and_then(|section| compiler.compile_columns::<SampleEvent, Sample>(&section))
    {
        Ok(plan) => plan,
        Err(e) => return report(e),
    };

    println!("Columns:");
    print!("{}", plan.plan());

    for column in plan.plan().columns() {
        if let projection_compiler::plan::ColumnValue::Json(json) = column.value() {
            println!("\nOps for '{}':", column.name());
            print!("{}", json);
        }
    }

    let event = SampleEvent {
        kind: "created".to_string(),
    };
    let sample = Sample {
        sample_id: 42,
        name: "test-name".to_string(),
        attachments: vec![Attachment {
            file_name: "a.png".to_string(),
            url: "http://x".to_string(),
        }],
    };

    println!("\nRow:");
    for (name, value) in plan.column_names().iter().zip(plan.build_row(&event, &sample)) {
        println!("  {} = {}", name, value);
    }
}

fn report(error: projection_compiler::CompileError) {
    eprintln!("{:?}", miette::Report::new(error));
    std::process::exit(1);
}
