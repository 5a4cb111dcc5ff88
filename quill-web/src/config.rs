// Quill - A minimal multi-user blog built with Rust
// Copyright (C) 2025 Quill Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "quill.toml";
pub const ENV_PREFIX: &str = "QUILL_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Reload templates on every render.
    #[serde(default)]
    pub development_mode: bool,

    #[serde(default)]
    pub secure_cookies: bool,

    #[serde(default = "default_session_timeout_hours")]
    pub session_timeout_hours: i64,

    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default = "default_site_title")]
    pub site_title: String,

    #[serde(default = "default_site_author")]
    pub site_author: String,

    #[serde(default = "default_site_description")]
    pub site_description: String,

    /// Absolute root used for links in the Atom feed.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,

    /// Peer addresses allowed to reach `/register`.
    #[serde(default = "default_site_whitelist")]
    pub site_whitelist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            host: default_host(),
            port: default_port(),
            templates_dir: default_templates_dir(),
            development_mode: false,
            secure_cookies: false,
            session_timeout_hours: default_session_timeout_hours(),
            site_name: default_site_name(),
            site_title: default_site_title(),
            site_author: default_site_author(),
            site_description: default_site_description(),
            base_url: default_base_url(),
            posts_per_page: default_posts_per_page(),
            site_whitelist: default_site_whitelist(),
        }
    }
}

impl Config {
    /// Defaults, then `quill.toml`, then `QUILL_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `base_url` without a trailing slash, ready for path concatenation.
    pub fn site_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn is_whitelisted(&self, ip: &str) -> bool {
        self.site_whitelist.iter().any(|allowed| allowed == ip)
    }
}

fn default_database_url() -> String {
    "sqlite:quill.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_session_timeout_hours() -> i64 {
    24
}

fn default_site_name() -> String {
    "Quill".to_string()
}

fn default_site_title() -> String {
    "A simple Rust blog | Quill".to_string()
}

fn default_site_author() -> String {
    "A Rust Blogger".to_string()
}

fn default_site_description() -> String {
    "A minimal multi-user blog with tags, categories and an Atom feed.".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_posts_per_page() -> u32 {
    3
}

fn default_site_whitelist() -> Vec<String> {
    vec!["127.0.0.1".to_string()]
}
