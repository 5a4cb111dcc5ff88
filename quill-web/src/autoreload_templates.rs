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

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tera::{Context, Filter, Tera, Value};

use crate::markdown::make_markdown_filter;

pub const DEFAULT_DATE_FORMAT: &str = "%H:%M / %d-%m-%Y";

/// A wrapper around Tera that can reload templates in development mode
pub enum TemplateEngine {
    /// Static templates loaded once at startup
    Static(Arc<Tera>),
    /// Reloadable templates that refresh on each render
    Reloadable {
        templates_dir: String,
        cached: Arc<RwLock<Tera>>,
    },
}

impl TemplateEngine {
    pub fn new(templates_dir: &str, development_mode: bool) -> Result<Self> {
        let tera = Self::create_tera_instance(templates_dir)?;
        if development_mode {
            tracing::info!("Template hot reload enabled (development mode)");
            Ok(Self::Reloadable {
                templates_dir: templates_dir.to_string(),
                cached: Arc::new(RwLock::new(tera)),
            })
        } else {
            tracing::info!("Templates loaded once (production mode)");
            Ok(Self::Static(Arc::new(tera)))
        }
    }

    fn create_tera_instance(templates_dir: &str) -> Result<Tera> {
        let pattern = format!("{}/**/*", templates_dir);
        let mut tera = Tera::new(&pattern)?;

        tera.register_filter("markdown", make_markdown_filter());
        tera.register_filter("formatdate", FormatDateFilter);

        Ok(tera)
    }

    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        match self {
            Self::Static(tera) => Ok(tera.render(template_name, context)?),
            Self::Reloadable {
                templates_dir,
                cached,
            } => {
                match Self::create_tera_instance(templates_dir) {
                    Ok(new_tera) => {
                        if let Ok(mut write_guard) = cached.write() {
                            *write_guard = new_tera;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to reload templates: {}. Using cached version.", e);
                    }
                }
                let read_guard = cached
                    .read()
                    .map_err(|_| anyhow::anyhow!("Template cache lock poisoned"))?;
                Ok(read_guard.render(template_name, context)?)
            }
        }
    }
}

impl Clone for TemplateEngine {
    fn clone(&self) -> Self {
        match self {
            Self::Static(tera) => Self::Static(Arc::clone(tera)),
            Self::Reloadable {
                templates_dir,
                cached,
            } => Self::Reloadable {
                templates_dir: templates_dir.clone(),
                cached: Arc::clone(cached),
            },
        }
    }
}

/// `{{ post.pub_date | formatdate }}` or `{{ d | formatdate(format="%Y") }}`.
/// Accepts the RFC3339 strings chrono serializes to.
struct FormatDateFilter;

impl Filter for FormatDateFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let raw = value
            .as_str()
            .ok_or_else(|| tera::Error::msg("formatdate filter expects a date string"))?;

        let date = parse_date(raw)
            .ok_or_else(|| tera::Error::msg(format!("formatdate: cannot parse '{}'", raw)))?;

        let format = args
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_DATE_FORMAT);

        Ok(Value::String(date.format(format).to_string()))
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}
