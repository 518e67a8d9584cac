//! URL slugs for catalog records and blog posts.

/// Turn a display name into a URL slug.
///
/// ASCII letters and digits are kept (lower-cased); every run of anything else
/// becomes a single `-`. The result never starts or ends with `-`.
///
/// ```
/// use decor_core::slug::slugify;
///
/// assert_eq!(slugify("Table Lamps & Lighting"), "table-lamps-lighting");
/// assert_eq!(slugify("  --Woven  Baskets-- "), "woven-baskets");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// The given slug when non-blank, otherwise one derived from `name`.
#[must_use]
pub fn slug_or_derive(slug: Option<&str>, name: &str) -> String {
    match slug.map(slugify) {
        Some(s) if !s.is_empty() => s,
        _ => slugify(name),
    }
}
