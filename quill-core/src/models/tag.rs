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

use serde::{Deserialize, Serialize};

pub const TAG_NAME_MAX_LEN: usize = 50;

/// A free-form label; created on first use through get-or-create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.trim().to_string(),
        }
    }

    pub fn validate_name(name: &str) -> Result<(), String> {
        validate_taxonomy_name("Tag", name, TAG_NAME_MAX_LEN)
    }
}

pub(crate) fn validate_taxonomy_name(kind: &str, name: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} name cannot be empty", kind));
    }
    if name.chars().count() > max_len {
        return Err(format!("{} name cannot exceed {} characters", kind, max_len));
    }
    if name.contains('/') {
        return Err(format!("{} name cannot contain '/'", kind));
    }
    Ok(())
}
