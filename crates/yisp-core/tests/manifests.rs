use serde_json::{Value as Json, json};
use yisp_core::{
    Engine, EngineOptions, Env, EvaluationError, Node, OpenApiSchemaProvider, Schema,
    StaticSchemaProvider,
};
use yisp_yaml::emit_documents;

fn swagger() -> Json {
    json!({
        "definitions": {
            "io.k8s.api.apps.v1.Deployment": {
                "type": "object",
                "required": ["metadata"],
                "properties": {
                    "apiVersion": {"type": "string"},
                    "kind": {"type": "string"},
                    "metadata": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"},
                    "spec": {"$ref": "#/definitions/io.k8s.api.apps.v1.DeploymentSpec"}
                },
                "x-kubernetes-group-version-kind": [
                    {"group": "apps", "version": "v1", "kind": "Deployment"}
                ]
            },
            "io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "labels": {"type": "object", "additionalProperties": {"type": "string"}}
                }
            },
            "io.k8s.api.apps.v1.DeploymentSpec": {
                "type": "object",
                "properties": {
                    "replicas": {"type": "integer"},
                    "template": {
                        "type": "object",
                        "properties": {
                            "spec": {"$ref": "#/definitions/io.k8s.api.core.v1.PodSpec"}
                        }
                    }
                }
            },
            "io.k8s.api.core.v1.PodSpec": {
                "type": "object",
                "properties": {
                    "containers": {
                        "type": "array",
                        "items": {"$ref": "#/definitions/io.k8s.api.core.v1.Container"},
                        "x-kubernetes-patch-strategy": "merge",
                        "x-kubernetes-patch-merge-key": "name"
                    }
                }
            },
            "io.k8s.api.core.v1.Container": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string"},
                    "image": {"type": "string"},
                    "ports": {
                        "type": "array",
                        "items": {"$ref": "#/definitions/io.k8s.api.core.v1.ContainerPort"}
                    }
                }
            },
            "io.k8s.api.core.v1.ContainerPort": {
                "type": "object",
                "properties": {
                    "containerPort": {"format": "int-or-string", "type": "string", "x-kubernetes-int-or-string": true}
                }
            }
        }
    })
}

fn k8s_engine(options: EngineOptions) -> Engine {
    let mut provider = OpenApiSchemaProvider::new();
    provider.add_document(&swagger());
    Engine::new(options).with_provider(provider)
}

fn build(engine: &mut Engine, source: &str) -> Result<String, EvaluationError> {
    let result = engine.run(source, &Env::new(), Some("deploy.yaml"))?;
    Ok(emit_documents(&engine.render(result)?))
}

const DEPLOYMENT: &str = "\
base: &base !quote
  apiVersion: apps/v1
  kind: Deployment
  metadata:
    name: web
  spec:
    replicas: 1
    template:
      spec:
        containers:
          - name: app
            image: app:v1
--- !yisp
- patch
- *base
- !quote
  spec:
    replicas: 3
    template:
      spec:
        containers:
          - name: app
            image: app:v2
            ports:
              - containerPort: 8080
          - name: sidecar
            image: proxy:v1
";

#[test]
fn test_strategic_patch_of_deployment() {
    let mut engine = k8s_engine(EngineOptions::default());
    let output = build(&mut engine, DEPLOYMENT).unwrap();
    let patched = output.split("---\n").nth(1).unwrap();
    insta::assert_snapshot!(patched, @r"
    apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
    spec:
      replicas: 3
      template:
        spec:
          containers:
            - name: app
              image: app:v2
              ports:
                - containerPort: '8080'
            - name: sidecar
              image: proxy:v1
    ");
}

#[test]
fn test_patch_rejects_wrong_types() {
    let mut engine = k8s_engine(EngineOptions::default());
    let source = "\
base: &base !quote
  apiVersion: apps/v1
  kind: Deployment
  metadata: {name: web}
patched: !yisp [patch, *base, !quote {spec: {replicas: many}}]
";
    let err = build(&mut engine, source).unwrap_err();
    let messages: Vec<_> = err.chain().iter().map(|e| e.message.clone()).collect();
    assert!(messages.contains(&"patch does not satisfy io.k8s.api.apps.v1.Deployment".to_string()));
    assert_eq!(messages.last().unwrap(), "in call to patch");
}

#[test]
fn test_manifest_verified_at_render() {
    let mut engine = k8s_engine(EngineOptions::default());
    let source = "\
apiVersion: apps/v1
kind: Deployment
spec:
  replicas: 1
";
    let err = build(&mut engine, source).unwrap_err();
    assert_eq!(
        err.message,
        "value does not satisfy io.k8s.api.apps.v1.Deployment"
    );
}

#[test]
fn test_unknown_kind_is_fatal_unless_untyped_allowed() {
    let source = "apiVersion: example.com/v1\nkind: Widget\nsize: 3\n";

    let mut strict = k8s_engine(EngineOptions::default());
    let err = build(&mut strict, source).unwrap_err();
    assert_eq!(err.message, "no schema for example.com/v1 Widget");

    let mut lenient = k8s_engine(EngineOptions {
        allow_untyped_manifest: true,
        ..Default::default()
    });
    assert_eq!(build(&mut lenient, source).unwrap(), source);
}

#[test]
fn test_declared_schema_casts_with_defaults() {
    let source = "\
Service: &Service !yisp
  - schema
  - !quote
    type: object
    required: [name]
    properties:
      name: {type: string}
      port: {type: integer, default: 80}
---
$schema: *Service
name: web
";
    let mut engine = Engine::new(EngineOptions::default());
    let output = build(&mut engine, source).unwrap();
    let manifest = output.split("---\n").nth(1).unwrap();
    assert_eq!(manifest, "name: web\nport: 80\n");
}

#[test]
fn test_type_tags_cast_values() {
    let source = "\
Port: &Port !yisp [schema, {type: integer, minimum: 1, maximum: 65535}]
ok: !Port 8080
";
    let mut engine = Engine::new(EngineOptions::default());
    let result = engine.run(source, &Env::new(), None).unwrap();
    let doc = &result.as_array().unwrap()[0];
    assert!(doc.get("ok").unwrap().schema.is_some());

    let source = "Small: &Small !yisp [schema, {type: integer, maximum: 10}]\nbad: !Small 11\n";
    let err = engine.run(source, &Env::new(), None).unwrap_err();
    assert_eq!(err.message, "cast to integer failed");
}

#[test]
fn test_schema_by_id_from_provider() {
    let mut provider = StaticSchemaProvider::new();
    provider.register(
        "Config",
        Schema::from_node(&Node::from_json(&json!({
            "type": "object",
            "required": ["name"],
            "additionalProperties": false,
            "properties": {"name": {"type": "string"}}
        })))
        .unwrap(),
    );
    let mut engine = Engine::new(EngineOptions::default()).with_provider(provider);

    assert_eq!(
        build(&mut engine, "$schema: Config\nname: app\n").unwrap(),
        "name: app\n"
    );
    let err = build(&mut engine, "$schema: Config\nname: app\nextra: 1\n").unwrap_err();
    assert_eq!(err.message, "manifest does not satisfy Config");

    let err = build(&mut engine, "$schema: Missing\nname: app\n").unwrap_err();
    assert_eq!(err.message, "Schema not found: Missing");
}

#[test]
fn test_merge_builtin_uses_attached_schema() {
    let source = "\
a: &a !quote
  apiVersion: apps/v1
  kind: Deployment
  metadata: {name: web}
  spec:
    template:
      spec:
        containers: [{name: app, image: v1}]
b: &b !quote
  spec:
    template:
      spec:
        containers: [{name: app, image: v2}, {name: log, image: v1}]
merged: !yisp [merge, *a, *b]
";
    let mut engine = k8s_engine(EngineOptions::default());
    let result = engine.run(source, &Env::new(), None).unwrap();
    let merged = result.as_array().unwrap()[0].get("merged").unwrap().clone();
    assert_eq!(
        merged.to_json(),
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "app", "image": "v2"},
                {"name": "log", "image": "v1"}
            ]}}}
        })
    );
}
