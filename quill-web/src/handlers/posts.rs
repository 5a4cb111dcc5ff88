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

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use quill_core::{
    forms::{FormErrors, PostForm, PostInput},
    models::post::Post,
    pagination::Pagination,
};
use quill_db::repositories::{
    month_bounds, CategoryRepository, PostRepository, TagRepository,
};

use super::shared::{page_context, paginate, parse_page, render, CsrfForm};
use crate::{
    auth::{CurrentUser, OptionalUser},
    csrf::{get_or_create_csrf_token, verify_csrf},
    error::AppError,
    flash::set_flash,
    markdown::markdown_to_html,
    AppState,
};

const FORM_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub async fn index(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let posts = PostRepository::new(state.db.clone())
        .recent(state.config.posts_per_page as i64)
        .await?;

    let (jar, mut context) = page_context(&state, current.as_ref(), jar).await?;
    context.insert("posts", &posts);

    Ok((jar, render(&state, "index.html", &context)?).into_response())
}

/// Render one page of a post listing.
async fn render_listing(
    state: &AppState,
    current: Option<&CurrentUser>,
    jar: CookieJar,
    heading: &str,
    base_path: &str,
    pagination: &Pagination,
    posts: &[Post],
) -> Result<Response, AppError> {
    let (jar, mut context) = page_context(state, current, jar).await?;
    context.insert("heading", heading);
    context.insert("base_path", base_path);
    context.insert("pagination", pagination);
    context.insert("posts", posts);

    Ok((jar, render(state, "posts.html", &context)?).into_response())
}

async fn all_posts(
    state: AppState,
    current: Option<CurrentUser>,
    jar: CookieJar,
    page: u32,
) -> Result<Response, AppError> {
    let repo = PostRepository::new(state.db.clone());
    let pagination = paginate(page, state.config.posts_per_page, repo.count().await?)?;
    let posts = repo.list(pagination.limit(), pagination.offset()).await?;

    render_listing(&state, current.as_ref(), jar, "All posts", "/posts", &pagination, &posts).await
}

pub async fn list_posts(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    all_posts(state, current, jar, 1).await
}

pub async fn list_posts_page(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(page): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    all_posts(state, current, jar, parse_page(&page)?).await
}

async fn month_posts(
    state: AppState,
    current: Option<CurrentUser>,
    jar: CookieJar,
    year: &str,
    month: &str,
    page: u32,
) -> Result<Response, AppError> {
    let (year, month) = match (year.parse::<i32>(), month.parse::<u32>()) {
        (Ok(year), Ok(month)) if month_bounds(year, month).is_some() => (year, month),
        _ => return Err(AppError::not_found("No such month")),
    };
    let heading = match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => format!("Posts from {}", first.format("%B %Y")),
        None => return Err(AppError::not_found("No such month")),
    };

    let repo = PostRepository::new(state.db.clone());
    let total = repo.count_by_month(year, month).await?;
    let pagination = paginate(page, state.config.posts_per_page, total)?;
    let posts = repo
        .list_by_month(year, month, pagination.limit(), pagination.offset())
        .await?;

    let base_path = format!("/posts/{}/{}", year, month);
    render_listing(&state, current.as_ref(), jar, &heading, &base_path, &pagination, &posts).await
}

pub async fn list_month(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path((year, month)): Path<(String, String)>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    month_posts(state, current, jar, &year, &month, 1).await
}

pub async fn list_month_page(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path((year, month, page)): Path<(String, String, String)>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    month_posts(state, current, jar, &year, &month, parse_page(&page)?).await
}

async fn tag_posts(
    state: AppState,
    current: Option<CurrentUser>,
    jar: CookieJar,
    tag: &str,
    page: u32,
) -> Result<Response, AppError> {
    let tag = TagRepository::new(state.db.clone())
        .find_by_name(tag)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;

    let repo = PostRepository::new(state.db.clone());
    let pagination = paginate(page, state.config.posts_per_page, repo.count_by_tag(&tag.name).await?)?;
    let posts = repo
        .list_by_tag(&tag.name, pagination.limit(), pagination.offset())
        .await?;

    let heading = format!("Posts tagged \"{}\"", tag.name);
    let base_path = format!("/tag/{}", urlencoding::encode(&tag.name));
    render_listing(&state, current.as_ref(), jar, &heading, &base_path, &pagination, &posts).await
}

pub async fn list_tag(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(tag): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    tag_posts(state, current, jar, &tag, 1).await
}

pub async fn list_tag_page(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path((tag, page)): Path<(String, String)>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    tag_posts(state, current, jar, &tag, parse_page(&page)?).await
}

async fn category_posts(
    state: AppState,
    current: Option<CurrentUser>,
    jar: CookieJar,
    category: &str,
    page: u32,
) -> Result<Response, AppError> {
    let category = CategoryRepository::new(state.db.clone())
        .find_by_name(category)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    let repo = PostRepository::new(state.db.clone());
    let total = repo.count_by_category(&category.name).await?;
    let pagination = paginate(page, state.config.posts_per_page, total)?;
    let posts = repo
        .list_by_category(&category.name, pagination.limit(), pagination.offset())
        .await?;

    let heading = format!("Posts in \"{}\"", category.name);
    let base_path = format!("/category/{}", urlencoding::encode(&category.name));
    render_listing(&state, current.as_ref(), jar, &heading, &base_path, &pagination, &posts).await
}

pub async fn list_category(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(category): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    category_posts(state, current, jar, &category, 1).await
}

pub async fn list_category_page(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path((category, page)): Path<(String, String)>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    category_posts(state, current, jar, &category, parse_page(&page)?).await
}

async fn find_post(state: &AppState, slug: &str) -> Result<Post, AppError> {
    PostRepository::new(state.db.clone())
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

/// The post, provided the current user wrote it or is staff.
async fn managed_post(state: &AppState, current: &CurrentUser, slug: &str) -> Result<Post, AppError> {
    let post = find_post(state, slug).await?;
    if !current.can_manage(&post.author) {
        return Err(AppError::forbidden("You cannot manage this post"));
    }
    Ok(post)
}

pub async fn show_post(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let post = find_post(&state, &slug).await?;

    let (jar, mut context) = page_context(&state, current.as_ref(), jar).await?;
    context.insert("post", &post);

    if let Some(current) = current.as_ref().filter(|c| c.can_manage(&post.author)) {
        let csrf = get_or_create_csrf_token(&state.db, &current.session).await?;
        context.insert("can_manage", &true);
        context.insert("csrf_token", &csrf.token);
    }

    Ok((jar, render(&state, "post.html", &context)?).into_response())
}

async fn render_post_form(
    state: &AppState,
    current: &CurrentUser,
    jar: CookieJar,
    heading: &str,
    form_action: &str,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut context) = page_context(state, Some(current), jar).await?;
    let csrf = get_or_create_csrf_token(&state.db, &current.session).await?;

    context.insert("heading", heading);
    context.insert("form_action", form_action);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("csrf_token", &csrf.token);

    Ok((jar, render(state, "post_form.html", &context)?).into_response())
}

pub async fn new_post_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    render_post_form(
        &state,
        &current,
        jar,
        "New post",
        "/post/new",
        &PostForm::default(),
        &FormErrors::new(),
    )
    .await
}

pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    verify_csrf(&current.session, &form.csrf_token)?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&state, &current, jar, "New post", "/post/new", &form, &errors)
                .await
        }
    };

    let PostInput {
        title,
        body,
        tags,
        categories,
        pub_date,
    } = input;

    let mut post = Post::new(
        &current.user.username,
        &title,
        &body,
        markdown_to_html(&body),
        pub_date,
    );
    post.tags = tags;
    post.categories = categories;

    let saved = PostRepository::new(state.db.clone()).create(&post).await?;
    tracing::info!(slug = %saved.slug, author = %saved.author, "Post created");

    let jar = set_flash(jar, "Successfully added post");
    Ok((jar, Redirect::to(&format!("/post/{}", saved.slug))).into_response())
}

pub async fn edit_post_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let post = managed_post(&state, &current, &slug).await?;

    let form = PostForm {
        title: post.title.clone(),
        body: post.body_markdown.clone(),
        tags: post.tags.join(", "),
        categories: post.categories.join(", "),
        pub_date: post.pub_date.format(FORM_DATE_FORMAT).to_string(),
        csrf_token: String::new(),
    };

    let action = format!("/post/edit/{}", post.slug);
    render_post_form(&state, &current, jar, "Edit post", &action, &form, &FormErrors::new()).await
}

pub async fn update_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let mut post = managed_post(&state, &current, &slug).await?;
    verify_csrf(&current.session, &form.csrf_token)?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let action = format!("/post/edit/{}", post.slug);
            return render_post_form(&state, &current, jar, "Edit post", &action, &form, &errors)
                .await;
        }
    };

    post.title = input.title;
    post.body_html = markdown_to_html(&input.body);
    post.body_markdown = input.body;
    post.tags = input.tags;
    post.categories = input.categories;
    if let Some(pub_date) = input.pub_date {
        post.pub_date = pub_date;
    }

    PostRepository::new(state.db.clone()).update(&post).await?;
    tracing::info!(slug = %post.slug, by = %current.user.username, "Post updated");

    let jar = set_flash(jar, "Post updated");
    Ok((jar, Redirect::to(&format!("/post/{}", post.slug))).into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    jar: CookieJar,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    let post = managed_post(&state, &current, &slug).await?;
    verify_csrf(&current.session, &form.csrf_token)?;

    let id = post
        .id
        .ok_or_else(|| AppError::internal_server_error("Post has no id"))?;
    PostRepository::new(state.db.clone()).delete(id).await?;
    tracing::info!(slug = %post.slug, by = %current.user.username, "Post deleted");

    let jar = set_flash(jar, "Post deleted");
    Ok((jar, Redirect::to("/")).into_response())
}
