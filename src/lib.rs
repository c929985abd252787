//! Admin settings for the Viglet Dumont search connector.
//!
//! The crate owns the aggregated options record of the connector
//! ([`PluginSettings`]), its one-time migration from legacy per-name options,
//! the reconciliation of admin form submissions, the HTML settings page and the
//! one-shot index actions (ping, delete all, optimize, propagate, bulk load).
//!
//! Every host concern is injected: option storage through [`OptionStore`], the
//! content-type list through [`ContentTypeCatalog`], the search server through
//! [`SearchBackend`] and bulk-load documents through [`ContentSource`].

pub mod actions;
pub mod catalog;
pub mod client;
pub mod error;
pub mod form;
pub mod loader;
pub mod reconciler;
pub mod render;
pub mod settings;
pub mod store;

pub use actions::{AdminAction, Banner, BannerKind, LoadTarget};
pub use catalog::{ContentTypeCatalog, StaticCatalog};
pub use client::{HttpSearchClient, SearchBackend};
pub use error::{Dumont4wpError, Result};
pub use form::FormData;
pub use loader::{ContentLoader, ContentSource, JsonDirContentSource};
pub use reconciler::{apply_submission, initialize_if_absent, reconcile, Reconciled};
pub use settings::{CommaList, Flag, LooseInt, PluginSettings, ServerInfo};
pub use store::{
    Deployment, FileOptionStore, MemoryOptionStore, OptionStore, Scope, SettingsRepository,
};
