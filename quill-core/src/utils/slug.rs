const MAX_SLUG_LEN: usize = 100;

/// Slugs that collide with fixed routes under `/post/`.
const RESERVED_SLUGS: &[&str] = &["new", "edit", "delete"];

/// Generate a URL-friendly slug from a post title.
///
/// Non-ASCII letters are transliterated, everything that is not a letter or
/// digit becomes a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = ::slug::slugify(title.trim());

    if slug.len() > MAX_SLUG_LEN {
        slug = slug
            .chars()
            .take(MAX_SLUG_LEN)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string();
    }

    if slug.is_empty() {
        slug = "untitled".to_string();
    }

    slug
}

/// The `attempt`-th slug to try for `base`: `base`, `base-2`, `base-3`, ...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt + 1)
    }
}

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}
