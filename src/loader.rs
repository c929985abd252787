//! Bulk indexing of site content into the update server.

use crate::actions::LoadTarget;
use crate::client::SearchBackend;
use crate::error::{Dumont4wpError, Result};
use crate::settings::PluginSettings;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Supplies the documents of one content type.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn documents(&self, content_type: &str) -> Result<Vec<Value>>;
}

/// Reads `<dir>/<content_type>.json`, a JSON array of objects. A missing file
/// means the type has no content.
pub struct JsonDirContentSource {
    dir: PathBuf,
}

impl JsonDirContentSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ContentSource for JsonDirContentSource {
    async fn documents(&self, content_type: &str) -> Result<Vec<Value>> {
        if content_type.is_empty()
            || !content_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Dumont4wpError::Config(format!(
                "invalid content type: {:?}",
                content_type
            )));
        }
        let path = self.dir.join(format!("{}.json", content_type));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&content)? {
            Value::Array(items) => Ok(items),
            _ => Err(Dumont4wpError::Json(format!(
                "{} does not hold a JSON array",
                path.display()
            ))),
        }
    }
}

pub struct ContentLoader {
    backend: Arc<dyn SearchBackend>,
    source: Arc<dyn ContentSource>,
    batch_size: usize,
}

impl ContentLoader {
    pub fn new(backend: Arc<dyn SearchBackend>, source: Arc<dyn ContentSource>) -> Self {
        Self {
            backend,
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Pushes the content selected by `target` to the update server and
    /// returns the number of documents sent.
    pub async fn load(&self, settings: &PluginSettings, target: &LoadTarget) -> Result<usize> {
        let types = match target {
            LoadTarget::All => settings.indexed_content_types(),
            LoadTarget::Type(t) if settings.content_indexed(t) => vec![t.clone()],
            LoadTarget::Type(t) => {
                tracing::warn!("Content type {} is not enabled for indexing, skipping", t);
                Vec::new()
            }
        };
        if types.is_empty() {
            return Ok(0);
        }

        let (server_id, server) = settings
            .update_server()
            .ok_or_else(|| Dumont4wpError::Config("no update server configured".to_string()))?;

        let mut total = 0;
        for content_type in &types {
            let docs: Vec<Value> = self
                .source
                .documents(content_type)
                .await?
                .into_iter()
                .filter_map(|doc| prepare_document(settings, content_type, doc))
                .collect();
            for batch in docs.chunks(self.batch_size) {
                self.backend.add_documents(server, batch).await?;
            }
            tracing::info!(
                server = server_id,
                content_type = content_type.as_str(),
                count = docs.len(),
                "Indexed content"
            );
            total += docs.len();
        }
        Ok(total)
    }
}

fn document_id(doc: &serde_json::Map<String, Value>) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Applies the indexing options to one source document. `None` drops it.
fn prepare_document(settings: &PluginSettings, content_type: &str, doc: Value) -> Option<Value> {
    let Value::Object(mut doc) = doc else {
        tracing::warn!("Skipping non-object {} document", content_type);
        return None;
    };
    if let Some(id) = document_id(&doc) {
        if settings.exclude_pages.contains(&id) {
            return None;
        }
    }

    if !settings.index_comments.is_set() {
        doc.remove("comments");
    }

    let custom = match doc.remove("custom_fields") {
        Some(Value::Object(fields)) => fields
            .into_iter()
            .filter(|(name, _)| settings.index_custom_fields.contains(name))
            .collect(),
        _ => serde_json::Map::new(),
    };
    if !custom.is_empty() {
        doc.insert("custom_fields".to_string(), Value::Object(custom));
    }

    doc.insert("type".to_string(), Value::String(content_type.to_string()));
    Some(Value::Object(doc))
}
