mod values;

pub use values::{CommaList, Flag, LooseInt};

use crate::error::{Dumont4wpError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Option name the whole record is stored under.
pub const SETTINGS_OPTION: &str = "plugin_dumont4wp_settings";

pub const INITIALIZED_KEY: &str = "dumont4wp_solr_initialized";
pub const SERVER_KEY: &str = "dumont4wp_server";

/// Editable primary server slot.
pub const SINGLE_SERVER: &str = "single";
/// Role id every save points search and update at. Mirrors `single`.
pub const MASTER_SERVER: &str = "master";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: i64 = 2700;
pub const DEFAULT_PATH: &str = "/dumont";

fn default_content_flags() -> IndexMap<String, Flag> {
    IndexMap::from([
        ("page".to_string(), Flag::ON),
        ("post".to_string(), Flag::ON),
    ])
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
        .map(|opt| opt.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub host: String,
    pub port: LooseInt,
    pub path: String,
    #[serde(
        rename = "siteName",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub site_name: Option<String>,
}

impl ServerInfo {
    pub fn new(host: impl Into<String>, port: i64, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: LooseInt::Int(port),
            path: path.into(),
            site_name: None,
        }
    }

    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }

    /// `http://host:port/path`, tolerating a scheme typed into the host field
    /// and a missing leading slash on the path.
    pub fn base_url(&self) -> String {
        let host = self.host.trim();
        let path = self.path.trim().trim_end_matches('/');
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let authority = if self.port.is_blank() {
            host.to_string()
        } else {
            format!("{}:{}", host, self.port.to_string().trim())
        };
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", authority, path)
        } else {
            format!("http://{}{}", authority, path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRoles {
    pub search: String,
    pub update: String,
}

impl Default for ServerRoles {
    fn default() -> Self {
        Self {
            search: MASTER_SERVER.to_string(),
            update: MASTER_SERVER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub info: IndexMap<String, ServerInfo>,
    #[serde(rename = "type")]
    pub roles: ServerRoles,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let primary = ServerInfo::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PATH);
        Self {
            info: IndexMap::from([
                (SINGLE_SERVER.to_string(), primary.clone()),
                (MASTER_SERVER.to_string(), primary),
            ]),
            roles: ServerRoles::default(),
        }
    }
}

/// Per content type: index it, drop it from the index on delete, drop it on
/// a status change away from public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    pub index: IndexMap<String, Flag>,
    pub delete: IndexMap<String, Flag>,
    pub private: IndexMap<String, Flag>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            index: default_content_flags(),
            delete: default_content_flags(),
            private: default_content_flags(),
        }
    }
}

/// The aggregated connector options record.
///
/// Blob keys keep the `dumont4wp_` names older installs wrote, so a record
/// persisted by any version loads unchanged. Keys this struct does not know
/// are carried through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    #[serde(rename = "dumont4wp_solr_initialized", default)]
    pub initialized: Flag,

    #[serde(rename = "dumont4wp_index_all_sites")]
    pub index_all_sites: Flag,

    #[serde(rename = "dumont4wp_server")]
    pub server: ServerConfig,

    #[serde(rename = "dumont4wp_content")]
    pub content: ContentPolicy,

    #[serde(rename = "dumont4wp_index_pages")]
    pub index_pages: Flag,
    #[serde(rename = "dumont4wp_index_posts")]
    pub index_posts: Flag,
    #[serde(rename = "dumont4wp_delete_page")]
    pub delete_page: Flag,
    #[serde(rename = "dumont4wp_delete_post")]
    pub delete_post: Flag,
    #[serde(rename = "dumont4wp_private_page")]
    pub private_page: Flag,
    #[serde(rename = "dumont4wp_private_post")]
    pub private_post: Flag,

    #[serde(rename = "dumont4wp_output_info")]
    pub output_info: Flag,
    #[serde(rename = "dumont4wp_output_pager")]
    pub output_pager: Flag,
    #[serde(rename = "dumont4wp_output_facets")]
    pub output_facets: Flag,

    #[serde(rename = "dumont4wp_exclude_pages")]
    pub exclude_pages: CommaList,

    #[serde(rename = "dumont4wp_num_results")]
    pub num_results: LooseInt,

    #[serde(rename = "dumont4wp_cat_as_taxo")]
    pub cat_as_taxo: Flag,

    #[serde(rename = "dumont4wp_max_display_tags")]
    pub max_display_tags: LooseInt,

    #[serde(rename = "dumont4wp_facet_on_categories")]
    pub facet_on_categories: Flag,
    #[serde(rename = "dumont4wp_facet_on_taxonomy")]
    pub facet_on_taxonomy: Flag,
    #[serde(rename = "dumont4wp_facet_on_tags")]
    pub facet_on_tags: Flag,
    #[serde(rename = "dumont4wp_facet_on_author")]
    pub facet_on_author: Flag,
    #[serde(rename = "dumont4wp_facet_on_type")]
    pub facet_on_type: Flag,

    #[serde(rename = "dumont4wp_enable_dym")]
    pub enable_dym: Flag,

    #[serde(rename = "dumont4wp_index_comments")]
    pub index_comments: Flag,

    #[serde(rename = "dumont4wp_connect_type")]
    pub connect_type: String,

    #[serde(rename = "dumont4wp_index_custom_fields")]
    pub index_custom_fields: CommaList,

    #[serde(rename = "dumont4wp_facet_on_custom_fields")]
    pub facet_on_custom_fields: CommaList,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            initialized: Flag::ON,
            index_all_sites: Flag::OFF,
            server: ServerConfig::default(),
            content: ContentPolicy::default(),
            index_pages: Flag::ON,
            index_posts: Flag::ON,
            delete_page: Flag::ON,
            delete_post: Flag::ON,
            private_page: Flag::ON,
            private_post: Flag::ON,
            output_info: Flag::ON,
            output_pager: Flag::ON,
            output_facets: Flag::ON,
            exclude_pages: CommaList::default(),
            num_results: LooseInt::Int(5),
            cat_as_taxo: Flag::ON,
            max_display_tags: LooseInt::Int(10),
            facet_on_categories: Flag::ON,
            facet_on_taxonomy: Flag::ON,
            facet_on_tags: Flag::ON,
            facet_on_author: Flag::ON,
            facet_on_type: Flag::ON,
            enable_dym: Flag::ON,
            index_comments: Flag::ON,
            connect_type: "solr".to_string(),
            index_custom_fields: CommaList::default(),
            facet_on_custom_fields: CommaList::default(),
            extra: Map::new(),
        }
    }
}

/// One column of the multi-server block of the settings page.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSlot {
    pub id: String,
    pub server: ServerInfo,
    /// The trailing blank "add server" column; never persisted unless filled.
    pub is_new: bool,
}

/// Numeric server keys (written by older installs) are shown as `slave_<n>`.
pub fn display_server_id(key: &str) -> String {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        format!("slave_{}", key)
    } else {
        key.to_string()
    }
}

impl PluginSettings {
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_set()
    }

    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(Dumont4wpError::InvalidSettings(format!(
                "settings serialized to a non-object: {}",
                other
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Dumont4wpError::InvalidSettings(e.to_string()))
    }

    pub fn server_by_id(&self, id: &str) -> Option<&ServerInfo> {
        self.server.info.get(id)
    }

    /// Server used for queries and pings; falls back to the primary slot.
    pub fn search_server(&self) -> Option<(&str, &ServerInfo)> {
        self.resolve_role(&self.server.roles.search)
    }

    /// Server receiving writes (delete all, optimize, bulk loads).
    pub fn update_server(&self) -> Option<(&str, &ServerInfo)> {
        self.resolve_role(&self.server.roles.update)
    }

    fn resolve_role<'a>(&'a self, id: &'a str) -> Option<(&'a str, &'a ServerInfo)> {
        match self.server.info.get_key_value(id) {
            Some((key, server)) => Some((key.as_str(), server)),
            None => self
                .server
                .info
                .get_key_value(SINGLE_SERVER)
                .map(|(key, server)| (key.as_str(), server)),
        }
    }

    pub fn content_indexed(&self, content_type: &str) -> bool {
        self.content
            .index
            .get(content_type)
            .map(|f| f.is_set())
            .unwrap_or(false)
    }

    pub fn indexed_content_types(&self) -> Vec<String> {
        self.content
            .index
            .iter()
            .filter(|(_, flag)| flag.is_set())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Columns for the multi-server block: every configured server except the
    /// primary slot, plus exactly one blank slot for adding a server.
    ///
    /// The blank slot takes the first free `slave_<n>` with `n` starting at the
    /// number of configured servers.
    pub fn server_slots(&self) -> Vec<ServerSlot> {
        let info = &self.server.info;
        let mut slots: Vec<ServerSlot> = info
            .iter()
            .filter(|(key, _)| key.as_str() != SINGLE_SERVER)
            .map(|(key, server)| ServerSlot {
                id: display_server_id(key),
                server: server.clone(),
                is_new: false,
            })
            .collect();

        let taken: HashSet<&str> = info
            .keys()
            .map(String::as_str)
            .chain(slots.iter().map(|s| s.id.as_str()))
            .collect();
        let mut n = info.len();
        while taken.contains(format!("slave_{}", n).as_str()) {
            n += 1;
        }
        let new_id = format!("slave_{}", n);

        slots.push(ServerSlot {
            id: new_id,
            server: ServerInfo::default(),
            is_new: true,
        });
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_fresh_install() {
        let s = PluginSettings::default();
        let single = s.server_by_id(SINGLE_SERVER).unwrap();
        assert_eq!(single.host, "localhost");
        assert_eq!(single.port, LooseInt::Int(2700));
        assert_eq!(single.path, "/dumont");
        assert_eq!(s.server_by_id(MASTER_SERVER), Some(single));
        assert_eq!(s.server.roles.search, "master");
        assert_eq!(s.server.roles.update, "master");
        assert!(s.index_comments.is_set());
        assert_eq!(s.num_results, LooseInt::Int(5));
        assert_eq!(s.max_display_tags, LooseInt::Int(10));
        assert!(s.is_initialized());
        assert_eq!(s.indexed_content_types(), vec!["page", "post"]);
    }

    #[test]
    fn blob_uses_legacy_option_names() {
        let map = PluginSettings::default().to_map().unwrap();
        assert_eq!(map[INITIALIZED_KEY], json!(1));
        assert_eq!(map["dumont4wp_num_results"], json!(5));
        assert_eq!(map["dumont4wp_exclude_pages"], json!(""));
        assert_eq!(map["dumont4wp_connect_type"], json!("solr"));
        assert_eq!(
            map[SERVER_KEY]["info"]["single"],
            json!({"host": "localhost", "port": 2700, "path": "/dumont"})
        );
        assert_eq!(map[SERVER_KEY]["type"]["update"], json!("master"));
    }

    #[test]
    fn missing_flag_reads_as_uninitialized() {
        let s: PluginSettings = serde_json::from_value(json!({"dumont4wp_num_results": 3})).unwrap();
        assert!(!s.is_initialized());
        assert_eq!(s.num_results, LooseInt::Int(3));
        // Everything else falls back to defaults
        assert!(s.output_pager.is_set());
    }

    #[test]
    fn unknown_keys_survive_roundtrip() {
        let mut map = PluginSettings::default().to_map().unwrap();
        map.insert("dumont4wp_future_option".into(), json!({"a": 1}));
        let s = PluginSettings::from_map(map).unwrap();
        assert_eq!(s.extra["dumont4wp_future_option"], json!({"a": 1}));
        let back = s.to_map().unwrap();
        assert_eq!(back["dumont4wp_future_option"], json!({"a": 1}));
    }

    #[test]
    fn base_url_joins_host_port_path() {
        let s = ServerInfo::new("search.example.com", 8983, "solr/core1/");
        assert_eq!(s.base_url(), "http://search.example.com:8983/solr/core1");

        let https = ServerInfo::new("https://search.example.com", 443, "/dumont");
        assert_eq!(https.base_url(), "https://search.example.com:443/dumont");

        let no_port = ServerInfo {
            host: "search".into(),
            ..Default::default()
        };
        assert_eq!(no_port.base_url(), "http://search");
    }

    #[test]
    fn roles_fall_back_to_single() {
        let mut s = PluginSettings::default();
        s.server.roles.search = "gone".into();
        let (id, _) = s.search_server().unwrap();
        assert_eq!(id, SINGLE_SERVER);
        let (id, _) = s.update_server().unwrap();
        assert_eq!(id, MASTER_SERVER);
    }

    #[test]
    fn server_slots_skip_single_and_append_one_blank() {
        let s = PluginSettings::default();
        let slots = s.server_slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, "master");
        assert!(!slots[0].is_new);
        assert_eq!(slots[1].id, "slave_2");
        assert!(slots[1].is_new);
        assert!(!slots[1].server.has_host());
    }

    #[test]
    fn server_slots_map_numeric_keys_and_avoid_collisions() {
        let mut s = PluginSettings::default();
        s.server
            .info
            .insert("3".into(), ServerInfo::new("replica", 2700, "/dumont"));
        s.server
            .info
            .insert("slave_4".into(), ServerInfo::new("replica2", 2700, "/dumont"));
        let ids: Vec<String> = s.server_slots().into_iter().map(|slot| slot.id).collect();
        // four servers configured; slave_4 is taken so the blank slot moves on
        assert_eq!(ids, vec!["master", "slave_3", "slave_4", "slave_5"]);
    }

    #[test]
    fn display_server_id_only_rewrites_numeric_keys() {
        assert_eq!(display_server_id("2"), "slave_2");
        assert_eq!(display_server_id("master"), "master");
        assert_eq!(display_server_id("slave_2"), "slave_2");
        assert_eq!(display_server_id(""), "");
    }
}
