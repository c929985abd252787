use dumont4wp::render::{render_page, PageView};
use dumont4wp::{Deployment, OptionStore, PluginSettings, SettingsRepository};
use std::sync::Arc;

pub fn repo(store: Arc<dyn OptionStore>, deployment: Deployment) -> SettingsRepository {
    SettingsRepository::new(store, deployment)
}

pub fn page_types() -> Vec<String> {
    vec!["page".to_string(), "post".to_string()]
}

pub fn render(settings: &PluginSettings, deployment: &Deployment) -> String {
    render_page(&PageView {
        settings,
        deployment,
        content_types: &page_types(),
        banners: &[],
        form_action: "/options",
    })
}

/// Form controls a browser would submit for the settings form (the one
/// carrying `action=update`): text and hidden inputs, checked checkboxes and
/// radios. Submit buttons are left out since the save button has no name.
pub fn browser_submission(html: &str) -> Vec<(String, String)> {
    let settings_form = html
        .split("</form>")
        .find(|form| form.contains(r#"name="action" value="update""#))
        .expect("page should contain the settings form");

    let mut pairs = Vec::new();
    let mut rest = settings_form;
    while let Some(start) = rest.find("<input ") {
        let tag_start = &rest[start..];
        let end = tag_start.find('>').expect("unterminated input tag");
        let tag = &tag_start[..end];
        rest = &tag_start[end..];

        let kind = attr(tag, "type").unwrap_or_else(|| "text".to_string());
        let Some(name) = attr(tag, "name") else {
            continue;
        };
        let value = attr(tag, "value").unwrap_or_default();
        let checked = tag.split_whitespace().any(|word| word == "checked");
        let include = match kind.as_str() {
            "text" | "hidden" => true,
            "checkbox" | "radio" => checked,
            _ => false,
        };
        if include {
            pairs.push((name, value));
        }
    }
    pairs
}

fn attr(tag: &str, name: &str) -> Option<String> {
    let marker = format!(r#" {}=""#, name);
    let start = tag.find(&marker)? + marker.len();
    let len = tag[start..].find('"')?;
    Some(unescape(&tag[start..start + len]))
}

fn unescape(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
