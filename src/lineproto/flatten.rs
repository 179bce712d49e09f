use crate::lineproto::geohash::geohash;
use crate::lineproto::value::Value;
use crate::lineproto::EncodeError;
use std::collections::BTreeMap;

/// One node of a decoded payload tree. Both generic JSON objects and typed
/// structured decoders enumerate into this shape before flattening, so the
/// walk never branches on the concrete payload type.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Value),
    Object(BTreeMap<String, Node>),
}

/// A flattened leaf: the path segments that name it and the fields it
/// contributes to its point.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub path: Vec<String>,
    pub fields: Vec<(String, Value)>,
}

impl Leaf {
    pub fn joined_path(&self) -> String {
        self.path.join("_")
    }
}

/// Converts a JSON value into a payload tree. Nulls vanish entirely, numeric
/// kind follows the source token, and anything outside the closed scalar set
/// fails the whole payload.
pub fn node_from_json(value: &serde_json::Value, path: &str) -> Result<Option<Node>, EncodeError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Bool(v) => Ok(Some(Node::Leaf(Value::Bool(*v)))),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Some(Node::Leaf(Value::Integer(v))))
            } else if let Some(v) = n.as_f64() {
                Ok(Some(Node::Leaf(Value::Float(v))))
            } else {
                Err(EncodeError::UnsupportedValueKind {
                    path: path.to_string(),
                    kind: "number",
                })
            }
        }
        serde_json::Value::String(v) => Ok(Some(Node::Leaf(Value::String(v.clone())))),
        serde_json::Value::Object(map) => {
            let mut children = BTreeMap::new();
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}_{key}")
                };
                if let Some(node) = node_from_json(child, &child_path)? {
                    children.insert(key.clone(), node);
                }
            }
            Ok(Some(Node::Object(children)))
        }
        serde_json::Value::Array(_) => Err(EncodeError::UnsupportedValueKind {
            path: path.to_string(),
            kind: "array",
        }),
    }
}

/// Depth-first flattening of a payload tree into (path, field-set) leaves.
/// Sibling latitude/longitude pairs combine before recursion, so they fold
/// into a single derived leaf instead of two independent ones.
pub fn flatten(root: &Node) -> Vec<Leaf> {
    let mut out = Vec::new();
    match root {
        Node::Leaf(value) => out.push(Leaf {
            path: Vec::new(),
            fields: vec![("value".to_string(), value.clone())],
        }),
        Node::Object(children) => flatten_level(&mut Vec::new(), children, &mut out),
    }
    out
}

fn flatten_level(prefix: &mut Vec<String>, siblings: &BTreeMap<String, Node>, out: &mut Vec<Leaf>) {
    let combined = combine_geo(siblings);
    if let Some(fields) = &combined {
        prefix.push("location".to_string());
        out.push(Leaf {
            path: prefix.clone(),
            fields: fields.clone(),
        });
        prefix.pop();
    }

    for (key, node) in siblings {
        if combined.is_some() && (key == "latitude" || key == "longitude") {
            continue;
        }
        prefix.push(key.clone());
        match node {
            Node::Leaf(value) => out.push(Leaf {
                path: prefix.clone(),
                fields: vec![("value".to_string(), value.clone())],
            }),
            Node::Object(children) => flatten_level(prefix, children, out),
        }
        prefix.pop();
    }
}

// Altitude is deliberately not absorbed; it stays a leaf of its own.
fn combine_geo(siblings: &BTreeMap<String, Node>) -> Option<Vec<(String, Value)>> {
    let latitude = numeric_leaf(siblings.get("latitude")?)?;
    let longitude = numeric_leaf(siblings.get("longitude")?)?;
    Some(vec![
        (
            "geohash".to_string(),
            Value::String(geohash(latitude, longitude)),
        ),
        ("latitude".to_string(), Value::Float(latitude)),
        ("longitude".to_string(), Value::Float(longitude)),
    ])
}

fn numeric_leaf(node: &Node) -> Option<f64> {
    match node {
        Node::Leaf(Value::Float(v)) => Some(*v),
        Node::Leaf(Value::Integer(v)) => Some(*v as f64),
        _ => None,
    }
}
