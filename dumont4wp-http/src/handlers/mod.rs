use dumont4wp::{ContentLoader, ContentTypeCatalog, SearchBackend, SettingsRepository};
use std::sync::Arc;

pub mod health;
pub mod options;

pub struct AppState {
    pub repo: SettingsRepository,
    pub catalog: Arc<dyn ContentTypeCatalog>,
    pub backend: Arc<dyn SearchBackend>,
    pub loader: ContentLoader,
    /// Path both page forms post back to.
    pub form_action: String,
    /// Submitted values arrive backslash-quoted and are un-escaped on read.
    pub magic_quotes: bool,
    pub start_time: std::time::Instant,
}

pub use health::health;
pub use options::{options_page, submit_options};
