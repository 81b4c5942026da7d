//! URL slug helpers for detail routes ("attack-on-titan-16498").

const MAX_SLUG_LEN: usize = 80;

/// Lowercase, "&" becomes "and", every other non-alphanumeric run collapses
/// to a single hyphen. Empty input slugs as "untitled".
pub fn slugify(title: &str) -> String {
    let base = if title.is_empty() { "untitled" } else { title };
    let lowered = base.to_lowercase().replace('&', "and");

    let mut slug = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.chars().take(MAX_SLUG_LEN).collect()
}

pub fn make_slug(id: i32, title: &str) -> String {
    format!("{}-{}", slugify(title), id)
}

/// Extract the trailing media id from a slug. Returns None when the slug has
/// no "-<digits>" suffix.
pub fn parse_id(slug: &str) -> Option<i32> {
    let (_, tail) = slug.rsplit_once('-')?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}
