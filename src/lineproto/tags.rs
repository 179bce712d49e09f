use std::collections::{BTreeMap, HashMap};

/// The tag set of one point: reserved identity/event tags inserted first,
/// user tags merged afterwards. Reserved keys win on collision; the losing
/// user tag is dropped with a warning instead of corrupting series identity.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.tags.insert(key.to_string(), value);
    }

    pub fn merge_user_tags(&mut self, user_tags: &HashMap<String, String>) {
        for (key, value) in user_tags {
            if value.is_empty() {
                continue;
            }
            if self.tags.contains_key(key) {
                tracing::warn!(key = %key, "user tag collides with a reserved tag; dropping");
                continue;
            }
            self.tags.insert(key.clone(), value.clone());
        }
    }

    /// Key-sorted iteration; BTreeMap ordering is byte-lexicographic on the
    /// unescaped keys, which is the wire ordering.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

pub fn escape_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == ' ' || ch == ',' || ch == '=' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
