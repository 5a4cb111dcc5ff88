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

pub mod auth;
pub mod feed;
pub mod posts;
pub mod shared;
pub mod users;

pub use auth::{login, login_form, logout, register, register_form};
pub use feed::recent_feed;
pub use posts::{
    create_post, delete_post, edit_post_form, index, list_category, list_category_page,
    list_month, list_month_page, list_posts, list_posts_page, list_tag, list_tag_page,
    new_post_form, show_post, update_post,
};
pub use users::{delete_account, delete_account_api, own_profile, profile, update_profile};
