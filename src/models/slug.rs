/// Derive a URL slug from a title.
///
/// The title is lowercased, every character other than an ASCII letter,
/// ASCII digit, whitespace or hyphen is dropped, and each run of whitespace
/// and hyphens becomes a single hyphen. Leading and trailing hyphens are
/// trimmed. Uniqueness is not guaranteed here; the store rejects collisions.
pub fn derive_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug
}

/// Resolve the slug to persist: an explicit non-blank value wins,
/// otherwise it is derived from the title.
pub fn resolve_slug(explicit: Option<&str>, title: Option<&str>) -> Option<String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Some(slug.to_string()),
        None => title.map(derive_slug).filter(|s| !s.is_empty()),
    }
}
