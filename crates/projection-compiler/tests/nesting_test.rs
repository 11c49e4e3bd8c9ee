use pretty_assertions::assert_eq;
use serde_json::json;

use projection_compiler::{CompileError, MappingDocument, PlanCompiler, Shape, ShapeRegistry};

#[derive(Shape)]
struct Shipment {
    #[shape(rename = "Name")]
    carrier: String,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Piece {
    name: String,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Part {
    name: String,
    #[shape(items)]
    pieces: Vec<Piece>,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Line {
    name: String,
    #[shape(items)]
    parts: Vec<Part>,
}

#[derive(Shape)]
#[shape(rename_all = "PascalCase")]
struct Order {
    name: String,
    #[shape(items)]
    lines: Vec<Line>,
    #[shape(skip)]
    #[allow(dead_code)]
    scratch: Vec<u8>,
}

fn order() -> Order {
    let piece = |name: &str| Piece {
        name: name.to_string(),
    };
    Order {
        name: "order".to_string(),
        scratch: Vec::new(),
        lines: vec![
            Line {
                name: "line-1".to_string(),
                parts: vec![
                    Part {
                        name: "part-1a".to_string(),
                        pieces: vec![piece("piece-1a-x"), piece("piece-1a-y")],
                    },
                    Part {
                        name: "part-1b".to_string(),
                        pieces: Vec::new(),
                    },
                ],
            },
            Line {
                name: "line-2".to_string(),
                parts: vec![Part {
                    name: "part-2a".to_string(),
                    pieces: vec![piece("piece-2a-x")],
                }],
            },
        ],
    }
}

fn compiler() -> PlanCompiler {
    PlanCompiler::new(ShapeRegistry::new().with::<Shipment>().with::<Order>())
}

#[test]
fn item_refers_to_the_nearest_array() {
    let doc = MappingDocument::from_value(json!({
        "order": "record.Name",
        "carrier": "event.Name",
        "lines": {
            "type": "array",
            "context": "record.Lines",
            "items": {
                "line": "item.Name",
                "parts": {
                    "type": "array",
                    "context": "item.Parts",
                    "items": {
                        "part": "item.Name",
                        "pieces": {
                            "type": "array",
                            "context": "item.Pieces",
                            "items": { "piece": "item.Name", "order": "record.Name" }
                        }
                    }
                }
            }
        }
    }));
    let plan = compiler()
        .compile_json::<Shipment, Order>(&doc.root())
        .unwrap();

    let shipment = Shipment {
        carrier: "acme".to_string(),
    };
    let expected = concat!(
        r#"{"order":"order","carrier":"acme","lines":["#,
        r#"{"line":"line-1","parts":["#,
        r#"{"part":"part-1a","pieces":[{"piece":"piece-1a-x","order":"order"},{"piece":"piece-1a-y","order":"order"}]},"#,
        r#"{"part":"part-1b","pieces":[]}"#,
        r#"]},"#,
        r#"{"line":"line-2","parts":["#,
        r#"{"part":"part-2a","pieces":[{"piece":"piece-2a-x","order":"order"}]}"#,
        r#"]}"#,
        r#"]}"#,
    );
    assert_eq!(plan.to_json_string(&shipment, &order()), expected);
}

#[test]
fn item_scope_checks_the_nearest_item_shape() {
    // `Lines` exists on Order, not on Line: the inner array's `item.` is a Line.
    let doc = MappingDocument::from_value(json!({
        "lines": {
            "type": "array",
            "context": "record.Lines",
            "items": {
                "again": {
                    "type": "array",
                    "context": "item.Lines",
                    "items": {}
                }
            }
        }
    }));
    let err = compiler()
        .compile_json::<Shipment, Order>(&doc.root())
        .unwrap_err();

    match err {
        CompileError::UnresolvableField { path, field, shape } => {
            assert_eq!(path.as_str(), "lines:items:again:context");
            assert_eq!(field, "item.Lines");
            assert!(shape.ends_with("Line"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn skipped_fields_are_not_registered() {
    let registry = ShapeRegistry::new().with::<Order>();
    let names = registry.field_names(projection_compiler::ShapeId::of::<Order>());
    assert_eq!(names, vec!["Lines", "Name"]);
}
