use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn yisp(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_yisp"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute yisp")
}

#[test]
fn test_build_prints_yaml() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("main.yaml");
    fs::write(&file, "replicas: !yisp [+, 1, 2]\n").unwrap();

    let output = yisp(&["build", file.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "replicas: 3\n");
}

#[test]
fn test_build_prints_json() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("main.yaml");
    fs::write(&file, "a: 1\n---\nb: !yisp [not, false]\n").unwrap();

    let output = yisp(&["build", "--output", "json", file.to_str().unwrap()]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, serde_json::json!([{"a": 1}, {"b": true}]));
    assert!(output.stdout.ends_with(b"]\n"));
}

#[test]
fn test_build_reports_evaluation_errors() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("main.yaml");
    fs::write(&file, "value: !yisp [/, 1, 0]\n").unwrap();

    let output = yisp(&["build", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("division by zero"));
    assert!(stderr.contains("in call to /"));
}

#[test]
fn test_build_with_schema_file() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("swagger.json");
    fs::write(
        &schema,
        r#"{"definitions": {"example.v1.Widget": {
            "type": "object",
            "required": ["size"],
            "properties": {"size": {"type": "integer"}},
            "x-kubernetes-group-version-kind": [{"group": "example.com", "version": "v1", "kind": "Widget"}]
        }}}"#,
    )
    .unwrap();
    let file = dir.path().join("widget.yaml");
    fs::write(&file, "apiVersion: example.com/v1\nkind: Widget\nsize: big\n").unwrap();

    let without = yisp(&["build", file.to_str().unwrap()]);
    assert_eq!(without.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&without.stderr).contains("no schema for example.com/v1 Widget"));

    let with = yisp(&[
        "build",
        "--schema",
        schema.to_str().unwrap(),
        file.to_str().unwrap(),
    ]);
    assert_eq!(with.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&with.stderr).contains("value does not satisfy example.v1.Widget"));

    let lenient = yisp(&["build", "--allow-untyped-manifest", file.to_str().unwrap()]);
    assert!(lenient.status.success());
}
