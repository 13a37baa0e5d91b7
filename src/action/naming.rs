//! Conversion between the canonical snake_case identifiers and the
//! capitalized wire aliases used by the REST surface.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStyle {
    /// `MoveMouse`, `PositionX`
    Pascal,
    /// `moveMouse`, `positionX`
    Camel,
}

/// Canonical snake_case form of an identifier.
///
/// An underscore goes before an uppercase letter that follows a lowercase
/// letter or digit, and before the last letter of an uppercase run when a
/// lowercase letter comes next (`HTTPServer` -> `http_server`). Inputs that
/// are already snake_case come back unchanged.
pub fn to_canonical(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Capitalized wire alias: each underscore-delimited segment gets an
/// uppercase first letter and the separators are dropped.
pub fn to_wire_alias(identifier: &str, style: WireStyle) -> String {
    let canonical = to_canonical(identifier);
    let mut out = String::with_capacity(canonical.len());

    for (i, segment) in canonical.split('_').filter(|s| !s.is_empty()).enumerate() {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if i == 0 && style == WireStyle::Camel {
                out.push(first);
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}
