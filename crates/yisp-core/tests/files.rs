use std::fs;

use serde_json::json;
use tempfile::TempDir;
use yisp_core::{Engine, EngineOptions, Value};

fn write(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

#[test]
fn test_import_binds_module_anchors() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "lib/util.yaml",
        "\
greeting: &greeting hello
double: &double !yisp [lambda, [x], [*, *x, 2]]
",
    );
    write(
        &dir,
        "main.yaml",
        "\
--- !yisp [import, {util: lib/util.yaml}]
---
message: *util.greeting
answer: !yisp [*util.double, 21]
",
    );

    let mut engine = Engine::default();
    let output = engine.build_yaml(path(&dir, "main.yaml")).unwrap();
    assert_eq!(output, "message: hello\nanswer: 42\n");
}

#[test]
fn test_import_pair_form() {
    let dir = TempDir::new().unwrap();
    write(&dir, "consts.yaml", "port: &port 8080\n");
    write(
        &dir,
        "main.yaml",
        "--- !yisp [import, [c, consts.yaml]]\n---\nport: *c.port\n",
    );

    let mut engine = Engine::default();
    let value = engine.build_json(path(&dir, "main.yaml")).unwrap();
    assert_eq!(value, json!({"port": 8080}));
}

#[test]
fn test_include_splices_documents() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "parts/services.yaml",
        "\
name: a
---
name: !yisp [default, null, b]
",
    );
    write(
        &dir,
        "main.yaml",
        "\
first: true
--- !yisp [include, parts/services.yaml]
---
last: true
",
    );

    let mut engine = Engine::default();
    let result = engine.run_file(path(&dir, "main.yaml")).unwrap();
    assert!(result.is_document_root);
    assert_eq!(result.as_array().unwrap().len(), 4);

    let value = engine.build_json(path(&dir, "main.yaml")).unwrap();
    assert_eq!(
        value,
        json!([{"first": true}, {"name": "a"}, {"name": "b"}, {"last": true}])
    );
}

#[test]
fn test_nested_include_resolves_relative_to_includer() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a/b/leaf.yaml", "leaf: 1\n");
    write(&dir, "a/mid.yaml", "!yisp [include, b/leaf.yaml]\n");
    write(&dir, "main.yaml", "!yisp [include, a/mid.yaml]\n");

    let mut engine = Engine::default();
    let value = engine.build_json(path(&dir, "main.yaml")).unwrap();
    assert_eq!(value, json!({"leaf": 1}));
}

#[test]
fn test_include_depth_limit() {
    let dir = TempDir::new().unwrap();
    write(&dir, "loop.yaml", "!yisp [include, loop.yaml]\n");

    let mut engine = Engine::new(EngineOptions {
        max_include_depth: 4,
        ..Default::default()
    });
    let err = engine.run_file(path(&dir, "loop.yaml")).unwrap_err();
    assert_eq!(err.root_cause().message, "include depth limit of 4 exceeded");
    assert_eq!(err.message, "in call to include");
    let includes = err
        .chain()
        .iter()
        .filter(|e| e.message == "in include of loop.yaml")
        .count();
    assert_eq!(includes, 4);
}

#[test]
fn test_missing_include_reports_path() {
    let dir = TempDir::new().unwrap();
    write(&dir, "main.yaml", "!yisp [include, nowhere.yaml]\n");

    let mut engine = Engine::default();
    let err = engine.run_file(path(&dir, "main.yaml")).unwrap_err();
    let expected = format!("failed to read {}", path(&dir, "nowhere.yaml"));
    assert!(err.root_cause().message.starts_with(&expected));
    let messages: Vec<_> = err.chain().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages[1..], ["in include of nowhere.yaml", "in call to include"]);
}

#[test]
fn test_imported_lambda_keeps_module_scope() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "lib.yaml",
        "\
base: &base 100
add_base: &add_base !yisp [lambda, [x], [+, *x, *base]]
",
    );
    write(
        &dir,
        "main.yaml",
        "\
--- !yisp [import, {lib: lib.yaml}]
---
base: &base 1
total: !yisp [*lib.add_base, 5]
",
    );

    let mut engine = Engine::default();
    let result = engine.run_file(path(&dir, "main.yaml")).unwrap();
    let doc = &result.as_array().unwrap()[0];
    assert!(matches!(doc.get("total").unwrap().value, Value::Int(105)));
}

#[test]
fn test_build_yaml_multi_document() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "main.yaml",
        "\
# first
a: 1
---
b: !yisp [+, 1, 1]
",
    );

    let mut engine = Engine::default();
    insta::assert_snapshot!(engine.build_yaml(path(&dir, "main.yaml")).unwrap(), @r"
    # first
    a: 1
    ---
    b: 2
    ");
}
