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

use anyhow::{Context, Result};
use std::path::Path;

use crate::autoreload_templates::TemplateEngine;

pub fn init_templates(templates_dir: &str, development_mode: bool) -> Result<TemplateEngine> {
    std::fs::create_dir_all(templates_dir).context("Failed to create templates directory")?;

    create_default_templates(templates_dir)?;

    TemplateEngine::new(templates_dir, development_mode)
}

/// Write any stock template that is missing. Existing files are left alone so
/// a site can customise them.
fn create_default_templates(templates_dir: &str) -> Result<()> {
    let base_dir = Path::new(templates_dir);

    for (name, content) in DEFAULT_TEMPLATES {
        let path = base_dir.join(name);
        if !path.exists() {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to create template {}", name))?;
            tracing::debug!("Created default template {}", path.display());
        }
    }

    Ok(())
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", BASE_TEMPLATE),
    ("index.html", INDEX_TEMPLATE),
    ("login.html", LOGIN_TEMPLATE),
    ("register.html", REGISTER_TEMPLATE),
    ("user.html", USER_TEMPLATE),
    ("posts.html", POSTS_TEMPLATE),
    ("post.html", POST_TEMPLATE),
    ("post_form.html", POST_FORM_TEMPLATE),
    ("error.html", ERROR_TEMPLATE),
    ("recent.atom.xml", ATOM_TEMPLATE),
];

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}{{ site_title | default(value="Quill") }}{% endblock %}</title>
    <link rel="alternate" type="application/atom+xml" title="{{ site_name | default(value="Quill") }}" href="/recent.atom">
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            max-width: 960px;
            margin: 0 auto;
            padding: 20px;
            color: #333;
        }
        header {
            border-bottom: 1px solid #eee;
            padding-bottom: 10px;
            margin-bottom: 20px;
        }
        header .brand {
            font-size: 1.4em;
            font-weight: bold;
            color: #333;
            text-decoration: none;
        }
        nav {
            float: right;
        }
        nav a {
            margin-left: 15px;
            text-decoration: none;
            color: #0066cc;
        }
        .flash {
            background: #eef6ff;
            border: 1px solid #b6d4fe;
            padding: 8px 12px;
        }
        .layout {
            display: flex;
            gap: 40px;
        }
        main {
            flex: 3;
        }
        aside {
            flex: 1;
            font-size: 0.9em;
        }
        .meta {
            color: #666;
            font-size: 0.9em;
        }
        .errors {
            color: #b00020;
        }
        .pagination a, .pagination strong, .pagination span {
            margin-right: 8px;
        }
        footer {
            margin-top: 40px;
            padding-top: 20px;
            border-top: 1px solid #eee;
            font-size: 0.9em;
            color: #666;
        }
    </style>
    {% block head %}{% endblock %}
</head>
<body>
    <header>
        <a class="brand" href="/">{{ site_name | default(value="Quill") }}</a>
        <nav>
            <a href="/posts">Posts</a>
            {% if current_user %}
                <a href="/post/new">New post</a>
                <a href="/user">{{ current_user.username }}</a>
                <a href="/logout">Logout</a>
            {% else %}
                <a href="/login">Login</a>
                <a href="/register">Register</a>
            {% endif %}
        </nav>
    </header>

    {% if flash %}
    <p class="flash">{{ flash }}</p>
    {% endif %}

    <div class="layout">
        <main>
            {% block content %}{% endblock %}
        </main>

        <aside>
            {% if archive %}
            <h3>Archive</h3>
            <ul>
                {% for month in archive %}
                <li><a href="/posts/{{ month.year }}/{{ month.month }}">{{ month.year }}-{{ month.month }}</a> ({{ month.count }})</li>
                {% endfor %}
            </ul>
            {% endif %}
            {% if tags %}
            <h3>Tags</h3>
            <p>
                {% for tag in tags %}
                <a href="/tag/{{ tag.name | urlencode }}">{{ tag.name }}</a> ({{ tag.count }})
                {% endfor %}
            </p>
            {% endif %}
            {% if categories %}
            <h3>Categories</h3>
            <ul>
                {% for category in categories %}
                <li><a href="/category/{{ category.name | urlencode }}">{{ category.name }}</a> ({{ category.count }})</li>
                {% endfor %}
            </ul>
            {% endif %}
        </aside>
    </div>

    <footer>
        <p>{{ site_name | default(value="Quill") }} by {{ site_author | default(value="") }} | <a href="/recent.atom">Atom feed</a></p>
    </footer>
</body>
</html>"#;

const INDEX_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<section class="intro">
    <p>{{ site_description }}</p>
</section>

{% if posts %}
    {% for post in posts %}
    <article>
        <h2><a href="/post/{{ post.slug }}">{{ post.title }}</a></h2>
        <p class="meta">{{ post.pub_date | formatdate }} by {{ post.author }}</p>
        <div class="body">{{ post.body_html | safe }}</div>
        {% if post.tags %}
        <p class="meta">Tags:
            {% for tag in post.tags %}<a href="/tag/{{ tag | urlencode }}">{{ tag }}</a> {% endfor %}
        </p>
        {% endif %}
    </article>
    {% endfor %}
    <p><a href="/posts">All posts</a></p>
{% else %}
    <p>No posts yet.</p>
{% endif %}
{% endblock %}"#;

const LOGIN_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}Login | {{ super() }}{% endblock %}

{% block content %}
<h1>Login</h1>

<form method="post" action="/login{% if next %}?next={{ next | urlencode }}{% endif %}">
    <div>
        <label for="username">Username</label><br>
        <input type="text" id="username" name="username" value="{{ form.username | default(value="") }}" required>
        {% if errors.username is defined %}
        <ul class="errors">{% for e in errors.username %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="password">Password</label><br>
        <input type="password" id="password" name="password" required>
        {% if errors.password is defined %}
        <ul class="errors">{% for e in errors.password %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <button type="submit">Login</button>
    </div>
</form>
{% endblock %}"#;

const REGISTER_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}Register | {{ super() }}{% endblock %}

{% block content %}
<h1>Register</h1>

<form method="post" action="/register">
    <div>
        <label for="username">Username</label><br>
        <input type="text" id="username" name="username" value="{{ form.username | default(value="") }}" required>
        {% if errors.username is defined %}
        <ul class="errors">{% for e in errors.username %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="email">Email</label><br>
        <input type="email" id="email" name="email" value="{{ form.email | default(value="") }}" required>
        {% if errors.email is defined %}
        <ul class="errors">{% for e in errors.email %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="password">Password</label><br>
        <input type="password" id="password" name="password" required>
        {% if errors.password is defined %}
        <ul class="errors">{% for e in errors.password %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="confirm">Repeat password</label><br>
        <input type="password" id="confirm" name="confirm" required>
    </div>

    <div>
        <button type="submit">Register</button>
    </div>
</form>
{% endblock %}"#;

const USER_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}{{ profile_user.username }} | {{ super() }}{% endblock %}

{% block content %}
<h1>{{ profile_user.username }}</h1>
<p class="meta">
    Member since {{ profile_user.created_at | formatdate(format="%d-%m-%Y") }}
    {% if profile_user.is_staff %} | staff{% endif %}
    | {{ post_count }} post{{ post_count | pluralize }}
</p>

<h2>Edit account</h2>
<form method="post" action="/user/{{ profile_user.username }}">
    <input type="hidden" name="csrf_token" value="{{ csrf_token }}">

    <div>
        <label for="email">Email</label><br>
        <input type="email" id="email" name="email" value="{{ form.email | default(value="") }}" required>
        {% if errors.email is defined %}
        <ul class="errors">{% for e in errors.email %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="current">Current password</label><br>
        <input type="password" id="current" name="current" required>
        {% if errors.current is defined %}
        <ul class="errors">{% for e in errors.current %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="newpass">New password</label><br>
        <input type="password" id="newpass" name="newpass" required>
        {% if errors.newpass is defined %}
        <ul class="errors">{% for e in errors.newpass %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="confirm">Repeat new password</label><br>
        <input type="password" id="confirm" name="confirm" required>
        {% if errors.confirm is defined %}
        <ul class="errors">{% for e in errors.confirm %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <button type="submit">Save</button>
    </div>
</form>

<h2>Delete account</h2>
<form method="post" action="/user/{{ profile_user.username }}/delete">
    <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
    <button type="submit">Delete {{ profile_user.username }}</button>
</form>
{% endblock %}"#;

const POSTS_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}{{ heading }} | {{ super() }}{% endblock %}

{% block content %}
<h1>{{ heading }}</h1>

{% if posts %}
    {% for post in posts %}
    <article>
        <h2><a href="/post/{{ post.slug }}">{{ post.title }}</a></h2>
        <p class="meta">{{ post.pub_date | formatdate }} by {{ post.author }}</p>
        <div class="body">{{ post.body_html | safe }}</div>
        {% if post.tags %}
        <p class="meta">Tags:
            {% for tag in post.tags %}<a href="/tag/{{ tag | urlencode }}">{{ tag }}</a> {% endfor %}
        </p>
        {% endif %}
    </article>
    {% endfor %}
{% else %}
    <p>No posts.</p>
{% endif %}

{% if pagination.pages > 1 %}
<nav class="pagination">
    {% if pagination.has_prev %}<a href="{{ base_path | safe }}/{{ pagination.prev_num }}">&laquo; Newer</a>{% endif %}
    {% for num in pagination.page_numbers %}
        {% if num %}
            {% if num == pagination.page %}<strong>{{ num }}</strong>{% else %}<a href="{{ base_path | safe }}/{{ num }}">{{ num }}</a>{% endif %}
        {% else %}
            <span>...</span>
        {% endif %}
    {% endfor %}
    {% if pagination.has_next %}<a href="{{ base_path | safe }}/{{ pagination.next_num }}">Older &raquo;</a>{% endif %}
</nav>
{% endif %}
{% endblock %}"#;

const POST_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}{{ post.title }} | {{ super() }}{% endblock %}

{% block content %}
<article>
    <h1>{{ post.title }}</h1>
    <p class="meta">{{ post.pub_date | formatdate }} by {{ post.author }}</p>

    <div class="body">{{ post.body_html | safe }}</div>

    {% if post.tags %}
    <p class="meta">Tags:
        {% for tag in post.tags %}<a href="/tag/{{ tag | urlencode }}">{{ tag }}</a> {% endfor %}
    </p>
    {% endif %}
    {% if post.categories %}
    <p class="meta">Categories:
        {% for category in post.categories %}<a href="/category/{{ category | urlencode }}">{{ category }}</a> {% endfor %}
    </p>
    {% endif %}

    {% if can_manage %}
    <p>
        <a href="/post/edit/{{ post.slug }}">Edit</a>
    </p>
    <form method="post" action="/post/delete/{{ post.slug }}">
        <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
        <button type="submit">Delete</button>
    </form>
    {% endif %}
</article>
{% endblock %}"#;

const POST_FORM_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}{{ heading }} | {{ super() }}{% endblock %}

{% block content %}
<h1>{{ heading }}</h1>

<form method="post" action="{{ form_action | safe }}">
    <input type="hidden" name="csrf_token" value="{{ csrf_token }}">

    <div>
        <label for="title">Title</label><br>
        <input type="text" id="title" name="title" value="{{ form.title | default(value="") }}" maxlength="50" required>
        {% if errors.title is defined %}
        <ul class="errors">{% for e in errors.title %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="body">Body (Markdown)</label><br>
        <textarea id="body" name="body" rows="15" cols="80" required>{{ form.body | default(value="") }}</textarea>
        {% if errors.body is defined %}
        <ul class="errors">{% for e in errors.body %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="tags">Tags (comma separated)</label><br>
        <input type="text" id="tags" name="tags" value="{{ form.tags | default(value="") }}" required>
        {% if errors.tags is defined %}
        <ul class="errors">{% for e in errors.tags %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="categories">Categories (comma separated)</label><br>
        <input type="text" id="categories" name="categories" value="{{ form.categories | default(value="") }}">
        {% if errors.categories is defined %}
        <ul class="errors">{% for e in errors.categories %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <label for="pub_date">Publish date (YYYY-MM-DD or YYYY-MM-DD HH:MM, empty for now)</label><br>
        <input type="text" id="pub_date" name="pub_date" value="{{ form.pub_date | default(value="") }}">
        {% if errors.pub_date is defined %}
        <ul class="errors">{% for e in errors.pub_date %}<li>{{ e }}</li>{% endfor %}</ul>
        {% endif %}
    </div>

    <div>
        <button type="submit">Save</button>
    </div>
</form>
{% endblock %}"#;

const ERROR_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block title %}{{ status }} | {{ super() }}{% endblock %}

{% block content %}
<h1>{{ status }} {{ reason }}</h1>
<p>{{ message }}</p>
<p><a href="/">Back to the front page</a></p>
{% endblock %}"#;

const ATOM_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>{{ site_name }}</title>
    <subtitle>{{ site_description }}</subtitle>
    <link href="{{ site_url | safe }}/recent.atom" rel="self"/>
    <link href="{{ site_url | safe }}/"/>
    <id>{{ site_url | safe }}/recent.atom</id>
    <updated>{{ updated }}</updated>
    <author>
        <name>{{ site_author }}</name>
    </author>
    {% for post in posts %}
    <entry>
        <title type="text">{{ post.title }}</title>
        <link href="{{ site_url | safe }}/post/{{ post.slug }}"/>
        <id>{{ site_url | safe }}/post/{{ post.slug }}</id>
        <published>{{ post.pub_date }}</published>
        <updated>{{ post.updated_at }}</updated>
        <author>
            <name>{{ post.author }}</name>
        </author>
        {% for tag in post.tags %}<category term="{{ tag }}"/>{% endfor %}
        <content type="html">{{ post.body_html }}</content>
    </entry>
    {% endfor %}
</feed>
"#;
