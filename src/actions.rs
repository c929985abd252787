//! One-shot admin actions triggered from the settings page.

use crate::client::SearchBackend;
use crate::form::FormData;
use crate::loader::ContentLoader;
use crate::settings::PluginSettings;
use crate::store::SettingsRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    All,
    Type(String),
}

impl LoadTarget {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "all" => LoadTarget::All,
            other => LoadTarget::Type(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Ping,
    DeleteAll,
    Optimize,
    PropagateToAllSites,
    LoadContent(LoadTarget),
}

impl AdminAction {
    /// Picks the requested action. When several buttons are present the
    /// first in ping, delete all, optimize, propagate, load order wins.
    pub fn from_form(form: &FormData) -> Option<Self> {
        if form.flag("dumont4wp_ping") {
            Some(AdminAction::Ping)
        } else if form.flag("dumont4wp_deleteall") {
            Some(AdminAction::DeleteAll)
        } else if form.flag("dumont4wp_optimize") {
            Some(AdminAction::Optimize)
        } else if form.flag("dumont4wp_init_blogs") {
            Some(AdminAction::PropagateToAllSites)
        } else {
            form.content_load()
                .map(|target| AdminAction::LoadContent(LoadTarget::parse(&target)))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::Ping => "ping",
            AdminAction::DeleteAll => "deleteall",
            AdminAction::Optimize => "optimize",
            AdminAction::PropagateToAllSites => "init_blogs",
            AdminAction::LoadContent(_) => "content_load",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Status message shown at the top of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }

    pub fn css_class(&self) -> &'static str {
        match self.kind {
            BannerKind::Success => "updated",
            BannerKind::Error => "error",
        }
    }
}

/// Collaborators an action may call.
pub struct ActionContext<'a> {
    pub repo: &'a SettingsRepository,
    pub backend: &'a dyn SearchBackend,
    pub loader: &'a ContentLoader,
}

impl AdminAction {
    /// Runs the action against the current settings. Returns `None` when the
    /// action does not apply to this deployment.
    pub async fn dispatch(
        &self,
        settings: &PluginSettings,
        ctx: &ActionContext<'_>,
    ) -> Option<Banner> {
        let banner = match self {
            AdminAction::Ping => {
                let Some((id, server)) = settings.search_server() else {
                    return Some(Banner::error("Ping Failed! No search server configured."));
                };
                if ctx.backend.ping(server).await {
                    tracing::info!(server = id, "Ping succeeded");
                    Banner::success("Ping Success!")
                } else {
                    tracing::warn!(server = id, url = %server.base_url(), "Ping failed");
                    Banner::error("Ping Failed!")
                }
            }
            AdminAction::DeleteAll => {
                let Some((id, server)) = settings.update_server() else {
                    return Some(Banner::error("No update server configured."));
                };
                match ctx.backend.delete_all(server).await {
                    Ok(()) => {
                        tracing::info!(server = id, "Deleted all indexed documents");
                        Banner::success("All Indexed Pages Deleted!")
                    }
                    Err(e) => {
                        tracing::error!(server = id, "Delete all failed: {}", e);
                        Banner::error(format!("Delete failed: {}", e))
                    }
                }
            }
            AdminAction::Optimize => {
                let Some((id, server)) = settings.update_server() else {
                    return Some(Banner::error("No update server configured."));
                };
                match ctx.backend.optimize(server).await {
                    Ok(()) => {
                        tracing::info!(server = id, "Optimized index");
                        Banner::success("Index Optimized!")
                    }
                    Err(e) => {
                        tracing::error!(server = id, "Optimize failed: {}", e);
                        Banner::error(format!("Optimize failed: {}", e))
                    }
                }
            }
            AdminAction::PropagateToAllSites => {
                if !ctx.repo.deployment().multisite {
                    tracing::warn!("Ignoring propagate request on a single-site install");
                    return None;
                }
                match ctx.repo.copy_to_all_sites(settings) {
                    Ok(_) => Banner::success("Configuration Copied to All Sites!"),
                    Err(e) => {
                        tracing::error!("Copying settings to all sites failed: {}", e);
                        Banner::error(format!("Copy failed: {}", e))
                    }
                }
            }
            AdminAction::LoadContent(target) => match ctx.loader.load(settings, target).await {
                Ok(count) => Banner::success(format!("Indexed {} documents", count)),
                Err(e) => {
                    tracing::error!(load = ?target, "Content load failed: {}", e);
                    Banner::error(format!("Indexing failed: {}", e))
                }
            },
        };
        Some(banner)
    }
}
