//! Case conversion for resource type names taken from request paths.

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "blogPost" -> "blog_post", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Normalize a dash-separated path name: each part snake_cased, empty parts dropped.
/// e.g. "MyVendor-BlogPost" -> "my_vendor-blog_post"
pub fn normalize_dashed(s: &str) -> String {
    s.trim()
        .split('-')
        .filter(|part| !part.is_empty())
        .map(to_snake_case)
        .collect::<Vec<_>>()
        .join("-")
}
