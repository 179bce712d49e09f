use super::flatten::{flatten, node_from_json, Node};
use super::geohash::geohash;
use super::tags::{escape_tag, TagSet};
use super::value::Value;
use super::writer::{render_body, Point};
use super::EncodeError;
use std::collections::HashMap;

fn node(value: serde_json::Value) -> Node {
    node_from_json(&value, "").expect("supported").expect("present")
}

#[test]
fn value_tokens() {
    assert_eq!(Value::Integer(20).token(), "20i");
    assert_eq!(Value::Integer(-55).token(), "-55i");
    assert_eq!(Value::Float(25.4).token(), "25.400000");
    assert_eq!(Value::Float(-0.5).token(), "-0.500000");
    assert_eq!(Value::Float(2.0).token(), "2.000000");
    assert_eq!(Value::Bool(true).token(), "true");
    assert_eq!(Value::Bool(false).token(), "false");
    assert_eq!(Value::String("on".to_string()).token(), "\"on\"");
}

#[test]
fn string_token_escapes_quotes_and_backslashes() {
    assert_eq!(
        Value::String("say \"hi\"".to_string()).token(),
        "\"say \\\"hi\\\"\""
    );
    assert_eq!(Value::String("a\\b".to_string()).token(), "\"a\\\\b\"");
}

#[test]
fn geohash_matches_reference_vector() {
    assert_eq!(geohash(1.123, 2.123), "s01w2k3vvqre");
}

#[test]
fn geohash_uses_base32_alphabet_at_fixed_length() {
    for (lat, lon) in [(0.0, 0.0), (89.9, 179.9), (-89.9, -179.9), (-25.38, -49.26)] {
        let hash = geohash(lat, lon);
        assert_eq!(hash.len(), 12);
        assert!(hash
            .chars()
            .all(|ch| "0123456789bcdefghjkmnpqrstuvwxyz".contains(ch)));
        assert_eq!(hash, geohash(lat, lon));
    }
}

#[test]
fn json_conversion_preserves_numeric_kind() {
    let root = node(serde_json::json!({"whole": 20, "fractional": 25.4}));
    let Node::Object(children) = root else {
        panic!("expected object");
    };
    assert_eq!(children["whole"], Node::Leaf(Value::Integer(20)));
    assert_eq!(children["fractional"], Node::Leaf(Value::Float(25.4)));
}

#[test]
fn json_conversion_drops_nulls() {
    let root = node(serde_json::json!({"present": 1, "missing": null}));
    let Node::Object(children) = root else {
        panic!("expected object");
    };
    assert!(children.contains_key("present"));
    assert!(!children.contains_key("missing"));
}

#[test]
fn json_conversion_rejects_arrays_with_path() {
    let err = node_from_json(
        &serde_json::json!({"outer": {"samples": [1, 2]}}),
        "",
    )
    .unwrap_err();
    let EncodeError::UnsupportedValueKind { path, kind } = err;
    assert_eq!(path, "outer_samples");
    assert_eq!(kind, "array");
}

#[test]
fn flatten_joins_nested_paths_with_underscores() {
    let leaves = flatten(&node(serde_json::json!({
        "temperature": {"a": 20.5, "b": 33.3},
        "humidity": 20
    })));
    let paths: Vec<String> = leaves.iter().map(|leaf| leaf.joined_path()).collect();
    assert_eq!(paths, vec!["humidity", "temperature_a", "temperature_b"]);
    assert_eq!(
        leaves[1].fields,
        vec![("value".to_string(), Value::Float(20.5))]
    );
}

#[test]
fn flatten_combines_latitude_longitude_siblings() {
    let leaves = flatten(&node(serde_json::json!({
        "latitude": 1.123,
        "longitude": 2.123,
        "altitude": 3.123
    })));
    let paths: Vec<String> = leaves.iter().map(|leaf| leaf.joined_path()).collect();
    assert_eq!(paths, vec!["location", "altitude"]);
    assert_eq!(
        leaves[0].fields,
        vec![
            (
                "geohash".to_string(),
                Value::String("s01w2k3vvqre".to_string())
            ),
            ("latitude".to_string(), Value::Float(1.123)),
            ("longitude".to_string(), Value::Float(2.123)),
        ]
    );
    assert_eq!(
        leaves[1].fields,
        vec![("value".to_string(), Value::Float(3.123))]
    );
}

#[test]
fn flatten_combines_at_nested_levels() {
    let leaves = flatten(&node(serde_json::json!({
        "gps": {"latitude": 1.123, "longitude": 2.123},
        "temperature": 20.5
    })));
    let paths: Vec<String> = leaves.iter().map(|leaf| leaf.joined_path()).collect();
    assert_eq!(paths, vec!["gps_location", "temperature"]);
}

#[test]
fn lone_latitude_stays_an_ordinary_leaf() {
    let leaves = flatten(&node(serde_json::json!({"latitude": 1.123})));
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].joined_path(), "latitude");
    assert_eq!(
        leaves[0].fields,
        vec![("value".to_string(), Value::Float(1.123))]
    );
}

#[test]
fn non_numeric_latitude_does_not_combine() {
    let leaves = flatten(&node(serde_json::json!({
        "latitude": "north",
        "longitude": 2.123
    })));
    let paths: Vec<String> = leaves.iter().map(|leaf| leaf.joined_path()).collect();
    assert_eq!(paths, vec!["latitude", "longitude"]);
}

#[test]
fn tag_escaping_prefixes_space_comma_equals() {
    assert_eq!(escape_tag("fo o"), "fo\\ o");
    assert_eq!(escape_tag("ba,r"), "ba\\,r");
    assert_eq!(escape_tag("fo=o"), "fo\\=o");
    assert_eq!(escape_tag("plain"), "plain");
}

#[test]
fn user_tags_cannot_override_reserved_keys() {
    let mut tags = TagSet::new();
    tags.insert("dev_eui", "0102030405060708");
    let mut user = HashMap::new();
    user.insert("dev_eui".to_string(), "ffffffffffffffff".to_string());
    user.insert("foo".to_string(), "bar".to_string());
    user.insert("empty".to_string(), String::new());
    tags.merge_user_tags(&user);

    assert_eq!(tags.get("dev_eui"), Some("0102030405060708"));
    assert_eq!(tags.get("foo"), Some("bar"));
    assert_eq!(tags.get("empty"), None);
}

#[test]
fn empty_tag_values_are_never_emitted() {
    let mut tags = TagSet::new();
    tags.insert("device_name", "");
    tags.insert("application_name", "app");
    let rendered: Vec<(&str, &str)> = tags.iter().collect();
    assert_eq!(rendered, vec![("application_name", "app")]);
}

#[test]
fn render_sorts_measurements_tags_and_fields() {
    let mut tags = TagSet::new();
    tags.insert("b_tag", "2");
    tags.insert("a_tag", "1");

    let mut second = Point::new("zz_measure", tags.clone());
    second.field("value", Value::Integer(1));
    let mut first = Point::new("aa_measure", tags);
    first.field("z_field", Value::Integer(2));
    first.field("a_field", Value::Bool(true));

    let body = render_body(vec![second, first]);
    assert_eq!(
        body,
        "aa_measure,a_tag=1,b_tag=2 a_field=true,z_field=2i\nzz_measure,a_tag=1,b_tag=2 value=1i"
    );
}

#[test]
fn render_omits_tag_segment_when_no_tags() {
    let mut point = Point::new("measure", TagSet::new());
    point.field("value", Value::Integer(1));
    assert_eq!(render_body(vec![point]), "measure value=1i");
}

#[test]
fn render_drops_points_with_no_fields() {
    let empty = Point::new("empty_measure", TagSet::new());
    let mut real = Point::new("real_measure", TagSet::new());
    real.field("value", Value::Integer(1));
    assert_eq!(render_body(vec![empty, real]), "real_measure value=1i");
    assert_eq!(render_body(Vec::new()), "");
}

#[test]
fn render_has_no_trailing_newline() {
    let mut point = Point::new("measure", TagSet::new());
    point.field("value", Value::Integer(1));
    let body = render_body(vec![point.clone(), point]);
    assert!(!body.ends_with('\n'));
    assert_eq!(body.lines().count(), 2);
}
