//! Property values.

use serde::{Deserialize, Serialize};

/// Parsed value of one property.
///
/// Single-valued properties hold [`Value::Text`] or [`Value::None`].
/// Multi-valued properties hold a [`Value::List`] of strings, or
/// [`Value::Tuples`] when each element is itself composite (a DNS entry is
/// `[zone DN, IP]`, a DHCP entry `[service DN, IP, MAC]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    None,
    Text(String),
    List(Vec<String>),
    Tuples(Vec<Vec<String>>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    pub fn tuples<I, T, S>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Tuples(
            values
                .into_iter()
                .map(|t| t.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Falsy in the directory sense: absent, an empty string or no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::None => true,
            Value::Text(s) => s.is_empty(),
            Value::List(v) => v.is_empty(),
            Value::Tuples(v) => v.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            Value::List(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// Flat list view; tuples contribute their first element.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Value::None => Vec::new(),
            Value::Text(s) if s.is_empty() => Vec::new(),
            Value::Text(s) => vec![s.clone()],
            Value::List(v) => v.clone(),
            Value::Tuples(v) => v.iter().filter_map(|t| t.first().cloned()).collect(),
        }
    }

    pub fn as_tuples(&self) -> Vec<Vec<String>> {
        match self {
            Value::Tuples(v) => v.clone(),
            Value::List(v) => v.iter().map(|s| vec![s.clone()]).collect(),
            Value::Text(s) if !s.is_empty() => vec![vec![s.clone()]],
            _ => Vec::new(),
        }
    }

    /// `"1"` is true; anything else is false.
    pub fn is_true(&self) -> bool {
        self.as_text() == Some("1")
    }

    pub fn len(&self) -> usize {
        match self {
            Value::None => 0,
            Value::Text(s) => usize::from(!s.is_empty()),
            Value::List(v) => v.len(),
            Value::Tuples(v) => v.len(),
        }
    }

    /// Empty value of the right shape.
    pub fn empty(multivalue: bool) -> Self {
        if multivalue {
            Value::List(Vec::new())
        } else {
            Value::None
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::List(values)
    }
}

impl From<Vec<&str>> for Value {
    fn from(values: Vec<&str>) -> Self {
        Value::list(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(Value::None.is_empty());
        assert!(Value::text("").is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::list([""]).is_empty());
        assert!(!Value::text("0").is_empty());
    }

    #[test]
    fn test_views() {
        let entries = Value::tuples([["zone", "10.0.0.1"], ["zone2", "10.0.0.2"]]);
        assert_eq!(entries.as_list(), vec!["zone", "zone2"]);
        assert_eq!(entries.len(), 2);
        assert_eq!(Value::text("x").as_tuples(), vec![vec!["x".to_string()]]);
        assert!(Value::text("1").is_true());
        assert!(!Value::None.is_true());
    }
}
