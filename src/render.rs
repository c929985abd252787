//! HTML for the settings page.
//!
//! Every checkbox is preceded by a hidden `0` input of the same name, so an
//! unchecked box still posts an explicit clear (see [`crate::form`]).

use crate::actions::Banner;
use crate::settings::{Flag, PluginSettings, SINGLE_SERVER};
use crate::store::Deployment;
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLES: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2em; color: #23282d; }
.wrap { max-width: 1100px; }
.form-table th { text-align: left; font-weight: 600; padding: 8px 10px 8px 0; width: 260px; }
.form-table td { padding: 6px 10px; }
.servers td { vertical-align: top; padding-right: 2em; }
.servers p { margin: 0.4em 0; }
#message { padding: 0.6em 1em; margin-bottom: 1em; border-left: 4px solid #46b450; background: #fff; }
#message.error { border-left-color: #dc3232; }
.button-primary { cursor: pointer; }
"#;

/// Everything the page shows.
pub struct PageView<'a> {
    pub settings: &'a PluginSettings,
    pub deployment: &'a Deployment,
    pub content_types: &'a [String],
    pub banners: &'a [Banner],
    /// Target of both forms.
    pub form_action: &'a str,
}

fn setting(key: &str) -> String {
    format!("settings[{}]", key)
}

fn server_field(id: &str, field: &str) -> String {
    format!("settings[dumont4wp_server][info][{}][{}]", id, field)
}

fn content_field(group: &str, content_type: &str) -> String {
    format!("settings[dumont4wp_content][{}][{}]", group, content_type)
}

pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn checkbox(name: &str, checked: bool) -> Markup {
    html! {
        input type="hidden" name=(name) value="0";
        input type="checkbox" id=(name) name=(name) value="1" checked[checked];
    }
}

fn text_input(name: &str, value: &str) -> Markup {
    html! {
        input type="text" id=(name) name=(name) value=(value);
    }
}

fn text_row(label: &str, name: &str, value: &str) -> Markup {
    html! {
        tr valign="top" {
            th scope="row" { label for=(name) { (label) } }
            td { (text_input(name, value)) }
        }
    }
}

fn flag_row(label: &str, key: &str, flag: Flag) -> Markup {
    let name = setting(key);
    html! {
        tr valign="top" {
            th scope="row" { label for=(name) { (label) } }
            td { (checkbox(&name, flag.is_set())) }
        }
    }
}

fn banner(banner: &Banner) -> Markup {
    html! {
        div id="message" class=(format!("{} fade", banner.css_class())) {
            p { strong { (banner.message) } }
        }
    }
}

fn primary_server(settings: &PluginSettings) -> Markup {
    let single = settings.server_by_id(SINGLE_SERVER).cloned().unwrap_or_default();
    html! {
        table class="form-table" {
            (text_row("Host", &server_field(SINGLE_SERVER, "host"), &single.host))
            (text_row("Port", &server_field(SINGLE_SERVER, "port"), &single.port.to_string()))
            (text_row("Path", &server_field(SINGLE_SERVER, "path"), &single.path))
            (text_row(
                "Site Name",
                &server_field(SINGLE_SERVER, "siteName"),
                single.site_name.as_deref().unwrap_or("")
            ))
        }
    }
}

fn server_slots(settings: &PluginSettings) -> Markup {
    let roles = &settings.server.roles;
    html! {
        table class="servers" {
            tr {
                @for slot in settings.server_slots() {
                    td {
                        label { "ServerID: " strong { (slot.id) } }
                        p {
                            "Update Server: "
                            input type="radio" name="settings[dumont4wp_server][type][update]"
                                value=(slot.id) checked[roles.update == slot.id];
                        }
                        p {
                            "Search Server: "
                            input type="radio" name="settings[dumont4wp_server][type][search]"
                                value=(slot.id) checked[roles.search == slot.id];
                        }
                        label { "Host" }
                        p { (text_input(&server_field(&slot.id, "host"), &slot.server.host)) }
                        label { "Port" }
                        p { (text_input(&server_field(&slot.id, "port"), &slot.server.port.to_string())) }
                        label { "Path" }
                        p { (text_input(&server_field(&slot.id, "path"), &slot.server.path)) }
                    }
                }
            }
        }
    }
}

fn content_flag(settings: &PluginSettings, group: &str, content_type: &str) -> bool {
    let map = match group {
        "index" => &settings.content.index,
        "delete" => &settings.content.delete,
        _ => &settings.content.private,
    };
    map.get(content_type).map(|f| f.is_set()).unwrap_or(false)
}

fn indexing_options(view: &PageView<'_>) -> Markup {
    let settings = view.settings;
    let show_all_sites = view.deployment.multisite && view.deployment.is_main_site();
    html! {
        h3 { "Indexing Options" }
        table class="form-table" {
            @for content_type in view.content_types {
                @let title = ucfirst(content_type);
                tr valign="top" {
                    @for (group, label) in [
                        ("index", format!("Index {}", title)),
                        ("delete", format!("Remove {} on Delete", title)),
                        ("private", format!("Remove {} on Status Change", title)),
                    ] {
                        @let name = content_field(group, content_type);
                        th scope="row" { label for=(name) { (label) } }
                        td { (checkbox(&name, content_flag(settings, group, content_type))) }
                    }
                }
            }
            (flag_row("Index Comments", "dumont4wp_index_comments", settings.index_comments))
            @if show_all_sites {
                (flag_row("Index all Sites", "dumont4wp_index_all_sites", settings.index_all_sites))
            }
            (text_row(
                "Index custom fields (comma separated names list)",
                &setting("dumont4wp_index_custom_fields"),
                &settings.index_custom_fields.to_string()
            ))
            (text_row(
                "Excludes Posts or Pages (comma separated ids list)",
                &setting("dumont4wp_exclude_pages"),
                &settings.exclude_pages.to_string()
            ))
        }
    }
}

fn result_options(settings: &PluginSettings) -> Markup {
    html! {
        h3 { "Result Options" }
        table class="form-table" {
            (flag_row("Output Result Info", "dumont4wp_output_info", settings.output_info))
            (flag_row("Output Result Pager", "dumont4wp_output_pager", settings.output_pager))
            (flag_row("Output Facets", "dumont4wp_output_facets", settings.output_facets))
            (flag_row("Category Facet as Taxonomy", "dumont4wp_cat_as_taxo", settings.cat_as_taxo))
            (flag_row("Categories as Facet", "dumont4wp_facet_on_categories", settings.facet_on_categories))
            (flag_row("Tags as Facet", "dumont4wp_facet_on_tags", settings.facet_on_tags))
            (flag_row("Author as Facet", "dumont4wp_facet_on_author", settings.facet_on_author))
            (flag_row("Type as Facet", "dumont4wp_facet_on_type", settings.facet_on_type))
            (flag_row("Taxonomy as Facet", "dumont4wp_facet_on_taxonomy", settings.facet_on_taxonomy))
            (text_row(
                "Custom fields as Facet (comma separated ordered names list)",
                &setting("dumont4wp_facet_on_custom_fields"),
                &settings.facet_on_custom_fields.to_string()
            ))
            (flag_row("Enable Spellchecking", "dumont4wp_enable_dym", settings.enable_dym))
            (text_row(
                "Number of Results Per Page",
                &setting("dumont4wp_num_results"),
                &settings.num_results.to_string()
            ))
            (text_row(
                "Max Number of Tags to Display",
                &setting("dumont4wp_max_display_tags"),
                &settings.max_display_tags.to_string()
            ))
        }
    }
}

fn action_row(label: &str, name: &str) -> Markup {
    html! {
        tr valign="top" {
            th scope="row" { (label) }
            td { input type="submit" class="button-primary" name=(name) value="Execute"; }
        }
    }
}

fn actions_form(view: &PageView<'_>) -> Markup {
    let settings = view.settings;
    html! {
        form method="post" action=(view.form_action) {
            h3 { "Actions" }
            table class="form-table" {
                (action_row("Check Server Settings", "dumont4wp_ping"))
                @if view.deployment.multisite {
                    (action_row("Push Configuration to All Sites", "dumont4wp_init_blogs"))
                }
                @for content_type in view.content_types {
                    @if settings.content_indexed(content_type) {
                        (action_row(
                            &format!("Index all {}", ucfirst(content_type)),
                            &format!("dumont4wp_content_load[{}]", content_type)
                        ))
                    }
                }
                @if !settings.content.index.is_empty() {
                    (action_row("Index All Content", "dumont4wp_content_load[all]"))
                }
                (action_row("Optimize Index", "dumont4wp_optimize"))
                (action_row("Delete All", "dumont4wp_deleteall"))
            }
        }
    }
}

pub fn render_page(view: &PageView<'_>) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Viglet Dumont For WordPress" }
                style { (PreEscaped(STYLES)) }
            }
            body {
                @for b in view.banners {
                    (banner(b))
                }
                div class="wrap" {
                    h2 { "Viglet Dumont For WordPress" }
                    form method="post" action=(view.form_action) {
                        h3 { "Configure Viglet Dumont" }
                        (primary_server(view.settings))
                        (server_slots(view.settings))
                        hr;
                        (indexing_options(view))
                        hr;
                        (result_options(view.settings))
                        hr;
                        p class="submit" {
                            input type="hidden" name="action" value="update";
                            input id="settingsbutton" type="submit" class="button-primary" value="Save Changes";
                        }
                    }
                    hr;
                    (actions_form(view))
                }
            }
        }
    };
    markup.into_string()
}
