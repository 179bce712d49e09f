use crate::lineproto::tags::{escape_tag, TagSet};
use crate::lineproto::value::Value;
use std::collections::BTreeMap;

/// One output line: measurement, tag set, and a non-empty field set. A point
/// whose field set ends up empty is never rendered.
#[derive(Debug, Clone)]
pub struct Point {
    pub measurement: String,
    pub tags: TagSet,
    pub fields: BTreeMap<String, Value>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, tags: TagSet) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }
}

/// Renders the batch: lines sorted by measurement name (stable for equal
/// names), tags and fields key-sorted within each line, lines joined with a
/// newline and no trailing newline.
pub fn render_body(mut points: Vec<Point>) -> String {
    points.retain(|point| !point.fields.is_empty());
    points.sort_by(|a, b| a.measurement.cmp(&b.measurement));

    let mut body = String::new();
    for (index, point) in points.iter().enumerate() {
        if index > 0 {
            body.push('\n');
        }
        body.push_str(&point.measurement);
        for (key, value) in point.tags.iter() {
            body.push(',');
            body.push_str(&escape_tag(key));
            body.push('=');
            body.push_str(&escape_tag(value));
        }
        body.push(' ');
        for (field_index, (key, value)) in point.fields.iter().enumerate() {
            if field_index > 0 {
                body.push(',');
            }
            body.push_str(key);
            body.push('=');
            value.write_token(&mut body);
        }
    }
    body
}
