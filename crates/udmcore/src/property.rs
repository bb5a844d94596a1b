//! Property descriptors.
//!
//! Every object type declares its properties as a static table of
//! [`PropertyDescriptor`]s. Descriptors are built with `const fn` so the
//! tables live in `static` items next to the type they describe.

use crate::object::DirectoryObject;
use crate::syntax::Syntax;
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Computes a default from the current state of the object.
pub type DefaultFn = fn(&DirectoryObject) -> Value;

#[derive(Clone, Copy)]
pub enum DefaultValue {
    None,
    Text(&'static str),
    List(&'static [&'static str]),
    Computed(DefaultFn),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => f.write_str("None"),
            DefaultValue::Text(s) => write!(f, "Text({:?})", s),
            DefaultValue::List(v) => write!(f, "List({:?})", v),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl DefaultValue {
    pub fn resolve(&self, object: &DirectoryObject, multivalue: bool) -> Value {
        match self {
            DefaultValue::None => Value::empty(multivalue),
            DefaultValue::Text(s) if multivalue => Value::list([*s]),
            DefaultValue::Text(s) => Value::text(*s),
            DefaultValue::List(v) => Value::list(v.iter().copied()),
            DefaultValue::Computed(f) => f(object),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub short_description: &'static str,
    pub syntax: Syntax,
    pub multivalue: bool,
    pub required: bool,
    /// An existing value may be replaced by a different one.
    pub may_change: bool,
    /// The property can be written at all.
    pub editable: bool,
    /// Contributes to the RDN.
    pub identifies: bool,
    /// Options owning the property; empty means always visible.
    pub options: &'static [&'static str],
    pub default: DefaultValue,
    pub readonly_when_synced: bool,
}

impl PropertyDescriptor {
    pub const fn new(name: &'static str, short_description: &'static str, syntax: Syntax) -> Self {
        Self {
            name,
            short_description,
            syntax,
            multivalue: false,
            required: false,
            may_change: true,
            editable: true,
            identifies: false,
            options: &[],
            default: DefaultValue::None,
            readonly_when_synced: false,
        }
    }

    pub const fn multivalue(mut self) -> Self {
        self.multivalue = true;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn may_not_change(mut self) -> Self {
        self.may_change = false;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub const fn identifies(mut self) -> Self {
        self.identifies = true;
        self
    }

    pub const fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    pub const fn default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    pub const fn readonly_when_synced(mut self) -> Self {
        self.readonly_when_synced = true;
        self
    }

    /// Visible when unowned or when any owning option is enabled.
    pub fn is_visible(&self, enabled: &BTreeSet<String>) -> bool {
        self.options.is_empty() || self.options.iter().any(|o| enabled.contains(*o))
    }

    /// Parse `value` into the stored shape, skipping empty elements of
    /// multi-valued input.
    pub fn parse(&self, value: &Value) -> Result<Value, String> {
        if self.multivalue {
            if self.syntax.is_tuple() {
                let mut parsed = Vec::new();
                for item in value.as_tuples() {
                    if item.iter().all(|part| part.trim().is_empty()) {
                        continue;
                    }
                    parsed.push(self.syntax.parse_tuple(&item)?);
                }
                Ok(Value::Tuples(parsed))
            } else {
                let mut parsed = Vec::new();
                for item in value.as_list() {
                    if item.trim().is_empty() {
                        continue;
                    }
                    parsed.push(self.syntax.parse(&item)?);
                }
                Ok(Value::List(parsed))
            }
        } else {
            match value.as_text() {
                Some(text) if !text.is_empty() => Ok(Value::Text(self.syntax.parse(text)?)),
                _ => Ok(Value::None),
            }
        }
    }
}

/// Look up a descriptor by name.
pub fn find<'a>(
    properties: &'a [PropertyDescriptor],
    name: &str,
) -> Option<&'a PropertyDescriptor> {
    properties.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: PropertyDescriptor =
        PropertyDescriptor::new("mac", "MAC address", Syntax::MacAddress).multivalue();
    const HOME: PropertyDescriptor =
        PropertyDescriptor::new("unixhome", "Home directory", Syntax::AbsolutePath)
            .required()
            .options(&["posix"])
            .default(DefaultValue::Text("/dev/null"));

    #[test]
    fn test_builder_flags() {
        assert!(MAC.multivalue);
        assert!(!MAC.required);
        assert!(MAC.may_change);
        assert!(HOME.required);
        assert_eq!(HOME.options, &["posix"]);
    }

    #[test]
    fn test_visibility_follows_options() {
        let mut enabled = BTreeSet::new();
        assert!(MAC.is_visible(&enabled));
        assert!(!HOME.is_visible(&enabled));
        enabled.insert("posix".to_string());
        assert!(HOME.is_visible(&enabled));
    }

    #[test]
    fn test_parse_skips_empty_elements() {
        let parsed = MAC
            .parse(&Value::list(["AA:BB:CC:DD:EE:FF", "", "11-22-33-44-55-66"]))
            .unwrap();
        assert_eq!(
            parsed,
            Value::list(["aa:bb:cc:dd:ee:ff", "11:22:33:44:55:66"])
        );
        assert!(MAC.parse(&Value::list(["nope"])).is_err());
        assert_eq!(HOME.parse(&Value::text("")).unwrap(), Value::None);
    }
}
