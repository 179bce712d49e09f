mod flatten;
mod geohash;
mod tags;
mod value;
mod writer;

#[cfg(test)]
mod tests;

pub use flatten::{flatten, node_from_json, Leaf, Node};
pub use geohash::geohash;
pub use tags::TagSet;
pub use value::Value;
pub use writer::{render_body, Point};

use thiserror::Error;

/// Encoding a payload fails as a whole: a single unsupported leaf means the
/// payload shape is wrong, and a partial body must never reach the database.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unsupported value kind {kind} at {path}")]
    UnsupportedValueKind { path: String, kind: &'static str },
}
