//! Decoding of the admin form.
//!
//! Field names use the bracket convention of the host CMS
//! (`settings[dumont4wp_server][info][single][host]`), which is folded into a
//! nested JSON tree. A repeated name overwrites the earlier value, so a hidden
//! `0` input followed by a checked checkbox of the same name reads as `1`.
//!
//! Some host transports backslash-quote every submitted value (`\'`, `\"`,
//! `\\`). A form decoded from such a transport is marked with
//! [`FormData::with_magic_quotes`] and its settings are un-escaped on read;
//! plain urlencoded bodies are taken verbatim.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    root: Map<String, Value>,
    magic_quotes: bool,
}

fn split_name(name: &str) -> Vec<String> {
    let Some(open) = name.find('[') else {
        return vec![name.to_string()];
    };
    if open == 0 {
        return vec![name.to_string()];
    }
    let mut segments = vec![name[..open].to_string()];
    let mut rest = &name[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                segments.push(stripped[..close].to_string());
                rest = &stripped[close + 1..];
            }
            None => return vec![name.to_string()],
        }
    }
    // Trailing garbage after the last bracket is ignored, as the host does.
    segments
}

fn insert_path(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let (head, tail) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    if tail.is_empty() {
        map.insert(head.clone(), value);
        return;
    }
    if tail[0].is_empty() {
        let slot = map
            .entry(head.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            if tail.len() == 1 {
                items.push(value);
            } else {
                let mut child = Map::new();
                insert_path(&mut child, &tail[1..], value);
                items.push(Value::Object(child));
            }
        }
        return;
    }
    let slot = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        insert_path(child, tail, value);
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Removes backslash quoting (`\'`, `\"`, `\\`) from every string in `value`.
fn strip_slashes_deep(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_slashes(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_slashes_deep).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, strip_slashes_deep(v)))
                .collect(),
        ),
        other => other,
    }
}

fn strip_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl FormData {
    pub fn parse<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut root = Map::new();
        for (name, value) in pairs {
            let segments = split_name(name.as_ref());
            insert_path(&mut root, &segments, Value::String(value.into()));
        }
        Self {
            root,
            magic_quotes: false,
        }
    }

    /// Marks the values as backslash-quoted by the transport.
    pub fn with_magic_quotes(mut self, enabled: bool) -> Self {
        self.magic_quotes = enabled;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn action(&self) -> Option<&str> {
        self.root.get("action").and_then(Value::as_str)
    }

    /// True when the request carries the settings form (`action=update`).
    pub fn is_update(&self) -> bool {
        self.action().map(str::trim) == Some("update")
    }

    /// The `settings[...]` subtree; empty when absent. Un-escaped when the
    /// form carries magic quotes.
    pub fn settings(&self) -> Map<String, Value> {
        let map = match self.root.get("settings") {
            Some(Value::Object(map)) => map.clone(),
            _ => return Map::new(),
        };
        if !self.magic_quotes {
            return map;
        }
        map.into_iter()
            .map(|(k, v)| (k, strip_slashes_deep(v)))
            .collect()
    }

    /// One-shot button flags: present with a non-empty, non-`0` value.
    pub fn flag(&self, name: &str) -> bool {
        self.root.get(name).map(is_truthy).unwrap_or(false)
    }

    /// Keys of a bracketed button group such as `dumont4wp_content_load[post]`.
    pub fn keys_of(&self, name: &str) -> Vec<String> {
        match self.root.get(name) {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| is_truthy(v))
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Target of a bulk-load button: a content type name or `all`.
    pub fn content_load(&self) -> Option<String> {
        self.keys_of("dumont4wp_content_load").into_iter().next()
    }
}
