use protodesk_core::{Category, ChangeOp, Delta, Field, RpcKind, RpcPart, Unit};
use serde_json::json;

#[test]
fn unit_serializes_with_tagged_body() {
    let unit = Unit::message(
        "Data_Role",
        vec![Field::new("color", 1).with_type("Enum_Color")],
    )
    .with_comment("role record");

    let value = serde_json::to_value(&unit).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "Data_Role",
            "comment": "role record",
            "body": {
                "kind": "message",
                "items": [{
                    "option": null,
                    "type": "Enum_Color",
                    "name": "color",
                    "index": 1,
                    "default": null,
                    "comment": null
                }]
            }
        })
    );
}

#[test]
fn delta_serializes_snake_case_tags() {
    let mut delta = Delta::new();
    delta.record(
        Category::Rpc,
        ChangeOp::Delete,
        Unit::rpc("Rpc_Ping", vec![RpcPart::new("PingReq", RpcKind::Req, vec![])]),
    );

    let value = serde_json::to_value(&delta).unwrap();
    let entry = &value["categories"][0];
    assert_eq!(entry["category"], "rpc");
    assert_eq!(entry["entries"][0]["op"], "delete");
    assert_eq!(entry["entries"][0]["unit"]["body"]["kind"], "rpc");
    assert_eq!(entry["entries"][0]["unit"]["body"]["items"][0]["kind"], "Req");

    let back: Delta = serde_json::from_value(value).unwrap();
    assert_eq!(back, delta);
}
