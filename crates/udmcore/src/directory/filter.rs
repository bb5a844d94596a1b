use super::Attributes;
use std::fmt;

/// Typed search filter.
///
/// Matching is case-insensitive on both attribute names and values, which is
/// what the attribute types the engine searches on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    /// `(attr=value*)`
    Prefix(String, String),
    Present(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(attr.into(), value.into())
    }

    pub fn prefix(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Prefix(attr.into(), value.into())
    }

    pub fn present(attr: impl Into<String>) -> Self {
        Filter::Present(attr.into())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self {
            Filter::Eq(attr, value) => attrs.has_value(attr, value),
            Filter::Prefix(attr, value) => {
                let prefix = value.to_lowercase();
                attrs
                    .get(attr)
                    .map(|values| values.iter().any(|v| v.to_lowercase().starts_with(&prefix)))
                    .unwrap_or(false)
            }
            Filter::Present(attr) => attrs.contains(attr),
            Filter::And(filters) => filters.iter().all(|f| f.matches(attrs)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(attrs)),
            Filter::Not(filter) => !filter.matches(attrs),
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq(attr, value) => write!(f, "({}={})", attr, escape(value)),
            Filter::Prefix(attr, value) => write!(f, "({}={}*)", attr, escape(value)),
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Attributes {
        vec![
            ("objectClass", vec!["univentionDhcpHost".to_string()]),
            ("dhcpHWAddress", vec!["ethernet AA:bb:cc:dd:ee:ff".to_string()]),
            ("cn", vec!["pc1_uv2".to_string()]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_matches() {
        let attrs = host();
        assert!(Filter::eq("dhcphwaddress", "ethernet aa:bb:cc:dd:ee:ff").matches(&attrs));
        assert!(Filter::prefix("cn", "pc1_uv").matches(&attrs));
        assert!(Filter::and(vec![
            Filter::present("cn"),
            Filter::negate(Filter::present("cNAMERecord")),
        ])
        .matches(&attrs));
        assert!(!Filter::or(vec![Filter::eq("cn", "pc2"), Filter::present("aRecord")]).matches(&attrs));
    }

    #[test]
    fn test_display_escapes_values() {
        let filter = Filter::and(vec![
            Filter::eq("cn", "a*(b)"),
            Filter::negate(Filter::present("cNAMERecord")),
        ]);
        assert_eq!(filter.to_string(), "(&(cn=a\\2a\\28b\\29)(!(cNAMERecord=*)))");
    }
}
