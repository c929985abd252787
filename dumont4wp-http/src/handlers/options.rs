use axum::{
    extract::State,
    response::{Html, Redirect},
    Form,
};
use dumont4wp::actions::ActionContext;
use dumont4wp::render::{render_page, PageView};
use dumont4wp::{reconcile, AdminAction, Banner, Dumont4wpError, FormData};
use std::sync::Arc;

use super::AppState;

/// GET /options
pub async fn options_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, Dumont4wpError> {
    handle(&state, FormData::default()).await
}

/// POST /options
pub async fn submit_options(
    State(state): State<Arc<AppState>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>, Dumont4wpError> {
    let form = FormData::parse(pairs).with_magic_quotes(state.magic_quotes);
    handle(&state, form).await
}

/// GET / redirects to the settings page.
pub async fn root_redirect() -> Redirect {
    Redirect::to("/options")
}

async fn handle(state: &AppState, form: FormData) -> Result<Html<String>, Dumont4wpError> {
    let repo = state.repo.clone();
    let (reconciled, form) = tokio::task::spawn_blocking(move || {
        reconcile(&repo, &form).map(|reconciled| (reconciled, form))
    })
    .await
    .map_err(|e| Dumont4wpError::Io(format!("spawn_blocking join error: {}", e)))??;

    let mut banners = Vec::new();
    if reconciled.saved {
        banners.push(Banner::success("Success!"));
    }

    if let Some(action) = AdminAction::from_form(&form) {
        tracing::info!(action = action.name(), "Running admin action");
        let ctx = ActionContext {
            repo: &state.repo,
            backend: state.backend.as_ref(),
            loader: &state.loader,
        };
        if let Some(banner) = action.dispatch(&reconciled.settings, &ctx).await {
            banners.push(banner);
        }
    }

    let content_types = state.catalog.content_types();
    let html = render_page(&PageView {
        settings: &reconciled.settings,
        deployment: state.repo.deployment(),
        content_types: &content_types,
        banners: &banners,
        form_action: &state.form_action,
    });
    Ok(Html(html))
}
