//! URL slug generation for posts and categories

/// Turn a title or name into a URL slug.
///
/// Lowercases the text, keeps letters and digits (including non-ASCII
/// ones), and replaces everything else with single hyphens. Leading and
/// trailing hyphens are removed.
///
/// ```
/// use inkpost::services::generate_slug;
///
/// assert_eq!(generate_slug("Test Post Title"), "test-post-title");
/// assert_eq!(generate_slug("Hello,  World!"), "hello-world");
/// ```
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
