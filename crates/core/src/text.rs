//! Small text helpers for display names.

/// Uppercase the first character of `value`, leaving the rest untouched.
///
/// ```
/// use lte_admin_core::text::capfirst;
///
/// assert_eq!(capfirst("blog posts"), "Blog posts");
/// assert_eq!(capfirst("éclairs"), "Éclairs");
/// assert_eq!(capfirst(""), "");
/// ```
#[must_use]
pub fn capfirst(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
