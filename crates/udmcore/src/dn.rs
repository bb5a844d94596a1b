//! Distinguished name helpers.
//!
//! DNs are handled as plain strings throughout the engine. These functions
//! understand just enough of RFC 4514 to split, compare and build them:
//! backslash escapes are honoured, attribute names and values compare
//! case-insensitively and whitespace around separators is ignored.

/// Split a DN into its RDN components, most specific first.
///
/// Escaped separators stay part of their component.
pub fn explode(dn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = dn.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// The unescaped values of every RDN, most specific first.
pub fn explode_values(dn: &str) -> Vec<String> {
    explode(dn)
        .iter()
        .map(|rdn| split_rdn(rdn).1)
        .collect()
}

/// Split a single `attr=value` component. The value is unescaped.
pub fn split_rdn(rdn: &str) -> (String, String) {
    match rdn.split_once('=') {
        Some((attr, value)) => (attr.trim().to_string(), unescape_value(value.trim())),
        None => (String::new(), unescape_value(rdn.trim())),
    }
}

/// First component of `dn`, still escaped.
pub fn rdn(dn: &str) -> String {
    explode(dn).into_iter().next().unwrap_or_default()
}

/// Unescaped value of the first component.
pub fn rdn_value(dn: &str) -> String {
    split_rdn(&rdn(dn)).1
}

/// Attribute name of the first component.
pub fn rdn_attr(dn: &str) -> String {
    split_rdn(&rdn(dn)).0
}

/// Parent DN, or `None` for a single-component DN.
pub fn parent(dn: &str) -> Option<String> {
    let parts = explode(dn);
    if parts.len() < 2 {
        return None;
    }
    Some(parts[1..].join(","))
}

/// Build `attr=value,parent` with the value escaped.
pub fn compose(attr: &str, value: &str, parent: &str) -> String {
    if parent.is_empty() {
        format!("{}={}", attr, escape_value(value))
    } else {
        format!("{}={},{}", attr, escape_value(value), parent)
    }
}

/// Canonical form used for comparisons.
pub fn normalize(dn: &str) -> String {
    explode(dn)
        .iter()
        .map(|rdn| {
            let (attr, value) = split_rdn(rdn);
            format!("{}={}", attr.to_lowercase(), escape_value(&value.to_lowercase()))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Case-insensitive DN equality.
pub fn compare(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// True if `dn` equals `base` or lies below it.
pub fn is_in_subtree(dn: &str, base: &str) -> bool {
    let dn = explode(dn);
    let base = explode(base);
    if base.len() > dn.len() {
        return false;
    }
    let offset = dn.len() - base.len();
    dn[offset..]
        .iter()
        .zip(base.iter())
        .all(|(a, b)| compare(a, b))
}

/// Replace the `old_base` suffix of `dn` with `new_base`.
///
/// Returns `None` when `dn` is not below `old_base`.
pub fn rebase(dn: &str, old_base: &str, new_base: &str) -> Option<String> {
    if !is_in_subtree(dn, old_base) {
        return None;
    }
    let parts = explode(dn);
    let keep = parts.len() - explode(old_base).len();
    let mut rebased: Vec<String> = parts[..keep].to_vec();
    rebased.extend(explode(new_base));
    Some(rebased.join(","))
}

/// Escape an attribute value for use inside a DN.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
