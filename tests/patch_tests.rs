use apikit::patch::{MergePatch, OperationKind, PatchDocument, PatchOperation};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn document_serializes_every_operation_in_order() {
    let document = PatchDocument::new()
        .add("/a", json!({"b": 1}))
        .remove("/c")
        .replace("/d", 2)
        .move_to("/e", "/f")
        .copy("/g", "/h")
        .test("/i", "x");

    assert_eq!(
        serde_json::to_string(&document).unwrap(),
        concat!(
            r#"[{"path":"/a","value":{"b":1},"op":"add"},"#,
            r#"{"path":"/c","op":"remove"},"#,
            r#"{"path":"/d","value":2,"op":"replace"},"#,
            r#"{"from":"/e","path":"/f","op":"move"},"#,
            r#"{"path":"/h","from":"/g","op":"copy"},"#,
            r#"{"path":"/i","value":"x","op":"test"}]"#,
        )
    );
}

#[test]
fn server_documents_parse_back_into_operations() {
    let document: PatchDocument = serde_json::from_value(json!([
        {"op": "test", "path": "/version", "value": 3},
        {"op": "replace", "path": "/name", "value": null},
        {"op": "move", "from": "/old", "path": "/new"}
    ]))
    .unwrap();

    let kinds: Vec<OperationKind> = document.operations().iter().map(PatchOperation::kind).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Test, OperationKind::Replace, OperationKind::Move]
    );
    assert_eq!(
        document.operations()[1],
        PatchOperation::Replace { path: "/name".to_string(), value: serde_json::Value::Null }
    );
}

#[test]
fn unknown_operation_is_rejected() {
    let result: Result<PatchDocument, _> =
        serde_json::from_value(json!([{"op": "frobnicate", "path": "/a"}]));
    assert!(result.is_err());
}

#[test]
fn merge_patch_diff_feeds_a_patch_body() {
    let before = json!({"name": "Ada", "nickname": "A", "tags": ["x"]});
    let after = json!({"name": "Ada Lovelace", "tags": ["x"]});

    assert_eq!(
        MergePatch::diff(&before, &after),
        json!({"nickname": null, "name": "Ada Lovelace"})
    );
}
