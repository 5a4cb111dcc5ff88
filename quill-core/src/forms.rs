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

//! Form payloads submitted by the browser and the field rules they must pass.
//!
//! Validation never touches the database. Checks that need stored state
//! (duplicate usernames, the current password) take that state as an argument
//! or are left to the handler.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    category::Category,
    post::TITLE_MAX_LEN,
    tag::Tag,
    user::User,
};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

const REQUIRED: &str = "This field is required.";
const PASSWORDS_MUST_MATCH: &str = "Passwords must match";

/// Field name to the messages shown next to that field.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn check_required(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

fn check_length(errors: &mut FormErrors, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.add(
            field,
            format!("Field must be between {} and {} characters long.", min, max),
        );
    }
}

fn check_new_password(errors: &mut FormErrors, field: &str, password: &str, confirm: &str) {
    if !check_required(errors, field, password) {
        return;
    }
    check_length(errors, field, password, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN);
    if password != confirm {
        errors.add(field, PASSWORDS_MUST_MATCH);
    }
}

/// Split a comma-separated list of names, trimming each one and dropping
/// blanks and repeats while keeping the submitted order.
pub fn split_names(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` or the `YYYY-MM-DDTHH:MM` sent by
/// `<input type="datetime-local">`. Times are taken as UTC. The year must be
/// written with exactly four digits, so signed or five-digit years are refused.
pub fn parse_pub_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    let bytes = input.as_bytes();
    if bytes.len() < 5 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }

    let parsed = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    (1..=9999)
        .contains(&parsed.year())
        .then(|| parsed.and_utc())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub confirm: String,
}

impl RegistrationForm {
    /// The username as it will be stored.
    pub fn normalized_username(&self) -> String {
        self.username.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        if check_required(&mut errors, "username", &self.username) {
            if let Err(e) = User::validate_username(&self.normalized_username()) {
                errors.add("username", e);
            }
        }

        if check_required(&mut errors, "email", &self.email) {
            if let Err(e) = User::validate_email(self.email.trim()) {
                errors.add("email", e);
            }
        }

        check_new_password(&mut errors, "password", &self.password, &self.confirm);

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl LoginForm {
    /// Usernames are stored lowercase, so lookups are too.
    pub fn normalized_username(&self) -> String {
        self.username.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        check_required(&mut errors, "username", &self.username);
        check_required(&mut errors, "password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EditUserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub current: String,
    #[serde(default, skip_serializing)]
    pub newpass: String,
    #[serde(default, skip_serializing)]
    pub confirm: String,
    #[serde(default, skip_serializing)]
    pub csrf_token: String,
}

impl EditUserForm {
    /// `user` is the account being edited; `current` must match its password.
    pub fn validate(&self, user: &User) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        if check_required(&mut errors, "email", &self.email) {
            if let Err(e) = User::validate_email(self.email.trim()) {
                errors.add("email", e);
            }
        }

        if check_required(&mut errors, "current", &self.current)
            && !user.verify_password(&self.current).unwrap_or(false)
        {
            errors.add("current", "Invalid password");
        }

        check_new_password(&mut errors, "newpass", &self.newpass, &self.confirm);

        if check_required(&mut errors, "confirm", &self.confirm) {
            check_length(
                &mut errors,
                "confirm",
                &self.confirm,
                PASSWORD_MIN_LEN,
                PASSWORD_MAX_LEN,
            );
        }

        errors.into_result()
    }
}

/// Used for both adding and editing posts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default, skip_serializing)]
    pub csrf_token: String,
}

/// A validated [`PostForm`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub pub_date: Option<DateTime<Utc>>,
}

impl PostForm {
    pub fn validate(&self) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if check_required(&mut errors, "title", title) && title.chars().count() > TITLE_MAX_LEN {
            errors.add(
                "title",
                format!("Field cannot be longer than {} characters.", TITLE_MAX_LEN),
            );
        }

        check_required(&mut errors, "body", &self.body);

        let tags = split_names(&self.tags);
        if tags.is_empty() {
            errors.add("tags", REQUIRED);
        }
        for tag in &tags {
            if let Err(e) = Tag::validate_name(tag) {
                errors.add("tags", e);
            }
        }

        let categories = split_names(&self.categories);
        for category in &categories {
            if let Err(e) = Category::validate_name(category) {
                errors.add("categories", e);
            }
        }

        let pub_date = if self.pub_date.trim().is_empty() {
            None
        } else {
            let parsed = parse_pub_date(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Use the format YYYY-MM-DD or YYYY-MM-DD HH:MM.");
            }
            parsed
        };

        errors.into_result()?;

        Ok(PostInput {
            title: title.to_string(),
            body: self.body.clone(),
            tags,
            categories,
            pub_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            username: "NewUser".into(),
            email: "new@example.com".into(),
            password: "password123".into(),
            confirm: "password123".into(),
        }
    }

    #[test]
    fn test_registration_valid() {
        let form = registration();
        assert!(form.validate().is_ok());
        assert_eq!(form.normalized_username(), "newuser");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let mut form = registration();
        form.confirm = "password124".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password").unwrap(), ["Passwords must match"]);
    }

    #[test]
    fn test_registration_field_lengths() {
        let form = RegistrationForm {
            username: "abc".into(),
            email: "a@b.c".into(),
            password: "short".into(),
            confirm: "short".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert_eq!(
            errors.get("password").unwrap(),
            ["Field must be between 8 and 128 characters long."]
        );
    }

    #[test]
    fn test_registration_required_fields() {
        let errors = RegistrationForm::default().validate().unwrap_err();
        for field in ["username", "email", "password"] {
            assert_eq!(errors.get(field).unwrap(), [REQUIRED], "field {}", field);
        }
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            username: "alice".into(),
            password: "secret".into(),
        };
        assert!(form.validate().is_ok());

        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_edit_user_form() {
        let user = User::new("alice", "alice@example.com", "oldpassword").unwrap();
        let form = EditUserForm {
            email: "alice@example.org".into(),
            current: "oldpassword".into(),
            newpass: "newpassword".into(),
            confirm: "newpassword".into(),
            csrf_token: String::new(),
        };
        assert!(form.validate(&user).is_ok());

        let wrong = EditUserForm {
            current: "not-it".into(),
            ..form.clone()
        };
        let errors = wrong.validate(&user).unwrap_err();
        assert_eq!(errors.get("current").unwrap(), ["Invalid password"]);

        let mismatch = EditUserForm {
            confirm: "different1".into(),
            ..form
        };
        let errors = mismatch.validate(&user).unwrap_err();
        assert_eq!(errors.get("newpass").unwrap(), ["Passwords must match"]);
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names("rust, web ,, rust,Web"),
            vec!["rust".to_string(), "web".to_string(), "Web".to_string()]
        );
        assert!(split_names(" , ").is_empty());
    }

    #[test]
    fn test_parse_pub_date() {
        let dt = parse_pub_date("2012-07-04 09:30").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2012, 7, 4));
        assert_eq!((dt.hour(), dt.minute()), (9, 30));

        let dt = parse_pub_date("2012-07-04").unwrap();
        assert_eq!(dt.hour(), 0);

        assert!(parse_pub_date("2012-07-04T09:30").is_some());
        assert!(parse_pub_date("July 4th").is_none());
    }

    #[test]
    fn test_login_username_is_normalized() {
        let form = LoginForm {
            username: "  Alice ".into(),
            password: "password123".into(),
        };
        assert_eq!(form.normalized_username(), "alice");
    }

    #[test]
    fn test_parse_pub_date_rejects_out_of_range_years() {
        assert!(parse_pub_date("-0001-01-01").is_none());
        assert!(parse_pub_date("+10000-01-01").is_none());
        assert!(parse_pub_date("+2024-01-01").is_none());
        assert!(parse_pub_date("10000-01-01 10:00").is_none());
        assert!(parse_pub_date("0000-01-01").is_none());
        assert!(parse_pub_date("0001-01-01").is_some());
        assert!(parse_pub_date("9999-12-31 23:59").is_some());
    }

    #[test]
    fn test_post_form_rejects_signed_year() {
        let form = PostForm {
            title: "Time travel".into(),
            body: "Back to the past".into(),
            tags: "history".into(),
            categories: String::new(),
            pub_date: "-0001-01-01".into(),
            csrf_token: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("pub_date"));
    }

    #[test]
    fn test_post_form_valid() {
        let form = PostForm {
            title: " Pythons are Awesome! ".into(),
            body: "Aren't they the *coolest*?".into(),
            tags: "python, snakes".into(),
            categories: "reptiles".into(),
            pub_date: String::new(),
            csrf_token: String::new(),
        };
        let input = form.validate().unwrap();
        assert_eq!(input.title, "Pythons are Awesome!");
        assert_eq!(input.tags, vec!["python", "snakes"]);
        assert_eq!(input.categories, vec!["reptiles"]);
        assert!(input.pub_date.is_none());
    }

    #[test]
    fn test_post_form_invalid() {
        let form = PostForm {
            title: "x".repeat(51),
            body: "   ".into(),
            tags: " , ".into(),
            pub_date: "tomorrow".into(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("body"));
        assert!(errors.has("tags"));
        assert!(errors.has("pub_date"));
        assert!(!errors.has("categories"));
    }

    #[test]
    fn test_form_errors_serialize_as_map() {
        let mut errors = FormErrors::new();
        errors.add("title", "Too long");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "title": ["Too long"] }));
    }
}
