use std::fmt::Write;

/// A single field value in its closed set of wire kinds. Absent values are
/// dropped at the conversion boundary and never reach the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn write_token(&self, out: &mut String) {
        match self {
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Integer(v) => {
                let _ = write!(out, "{v}i");
            }
            // The numeric kind of the source payload is preserved upstream, so
            // a float renders with a decimal point even for whole values.
            Value::Float(v) => {
                let _ = write!(out, "{v:.6}");
            }
            Value::String(v) => {
                out.push('"');
                for ch in v.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
        }
    }

    #[cfg(test)]
    pub fn token(&self) -> String {
        let mut out = String::new();
        self.write_token(&mut out);
        out
    }
}
