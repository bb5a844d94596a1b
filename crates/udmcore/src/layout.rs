//! Presentation hints.
//!
//! How a front end should group an object type's properties into tabs.
//! The engine carries these for its consumers and never reads them.

#[derive(Debug, Clone, Copy)]
pub struct Tab {
    pub name: &'static str,
    pub description: &'static str,
    pub groups: &'static [Group],
    pub advanced: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Group {
    pub label: &'static str,
    /// Rows of property names laid out side by side.
    pub rows: &'static [&'static [&'static str]],
}

impl Tab {
    pub const fn new(name: &'static str, description: &'static str, groups: &'static [Group]) -> Self {
        Self {
            name,
            description,
            groups,
            advanced: false,
        }
    }

    pub const fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// Every property placed on this tab.
    pub fn properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .flat_map(|row| row.iter().copied())
    }
}

impl Group {
    pub const fn new(label: &'static str, rows: &'static [&'static [&'static str]]) -> Self {
        Self { label, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TAB: Tab = Tab::new(
        "General",
        "Basic settings",
        &[Group::new("Computer account", &[&["name", "description"], &["mac"]])],
    );

    #[test]
    fn test_properties_flatten_rows() {
        assert_eq!(TAB.properties().collect::<Vec<_>>(), vec!["name", "description", "mac"]);
        assert!(!TAB.advanced);
    }
}
