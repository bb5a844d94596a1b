//! # Option Resolution
//!
//! Options are feature toggles on an object ("posix account", "samba
//! account"). Each one requires a set of object classes. This module maps
//! enabled options to object classes and back, and validates object-class
//! transitions when options are switched on an existing entry.
//!
//! ## Transition Rules
//!
//! [`reconcile_object_class_transition`] derives the classes to add and to
//! drop from the options toggled since load, then checks against the schema
//! and the [merged view](crate::merged::MergedAttributes) that:
//!
//! 1. a structural class remains,
//! 2. every attribute still set on the entry is permitted,
//! 3. every MUST attribute is populated.
//!
//! A failing check does not raise. The object classes are left as they are
//! and the caller gets [`Transition::Suppressed`] with the reason.

use crate::directory::{Attributes, Modification, Schema};
use crate::merged::MergedAttributes;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct ObjectOption {
    pub name: &'static str,
    pub short_description: &'static str,
    /// Enabled on new objects.
    pub default: bool,
    /// May be toggled on an existing object.
    pub editable: bool,
    /// Not available in this installation.
    pub disabled: bool,
    pub object_classes: &'static [&'static str],
}

impl ObjectOption {
    pub const fn new(
        name: &'static str,
        short_description: &'static str,
        object_classes: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            short_description,
            default: false,
            editable: true,
            disabled: false,
            object_classes,
        }
    }

    pub const fn enabled_by_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub const fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

fn lower_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().to_lowercase())
        .collect()
}

/// Options enabled on a brand-new object.
pub fn default_options(options: &[ObjectOption]) -> BTreeSet<String> {
    options
        .iter()
        .filter(|o| o.default && !o.disabled)
        .map(|o| o.name.to_string())
        .collect()
}

/// Options whose object classes are all present. With no object classes
/// known yet the defaults apply.
pub fn options_for_object_classes(
    options: &[ObjectOption],
    present: &[String],
) -> BTreeSet<String> {
    if present.is_empty() {
        return default_options(options);
    }
    let present = lower_set(present);
    options
        .iter()
        .filter(|o| !o.disabled && !o.object_classes.is_empty())
        .filter(|o| {
            o.object_classes
                .iter()
                .all(|oc| present.contains(&oc.to_lowercase()))
        })
        .map(|o| o.name.to_string())
        .collect()
}

/// Union of the object classes of every enabled option plus `extra`,
/// in declaration order without duplicates.
pub fn object_classes_for_options<I>(
    options: &[ObjectOption],
    enabled: &BTreeSet<String>,
    extra: I,
) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut classes: Vec<String> = Vec::new();
    let mut push = |oc: String| {
        if !classes.iter().any(|c| c.eq_ignore_ascii_case(&oc)) {
            classes.push(oc);
        }
    };
    for option in options.iter().filter(|o| enabled.contains(o.name)) {
        for oc in option.object_classes {
            push(oc.to_string());
        }
    }
    for oc in extra {
        push(oc);
    }
    classes
}

/// Inputs of an object-class transition.
pub struct TransitionInput<'a> {
    pub schema: &'a Schema,
    pub options: &'a [ObjectOption],
    pub enabled: &'a BTreeSet<String>,
    pub previously_enabled: &'a BTreeSet<String>,
    /// Attributes as last read from the directory.
    pub old_attributes: &'a Attributes,
    /// Classes needed regardless of options (extended attributes in use).
    pub required_extra: BTreeSet<String>,
    /// Classes that may go (extended attributes no longer in use).
    pub unneeded_extra: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to change; the modlist is returned as given.
    Unchanged(Vec<Modification>),
    /// The modlist now carries one `objectClass` replace triple.
    Applied(Vec<Modification>),
    /// A check failed; the modlist is returned as given.
    Suppressed {
        modlist: Vec<Modification>,
        reason: String,
    },
}

impl Transition {
    pub fn into_modlist(self) -> Vec<Modification> {
        match self {
            Transition::Unchanged(ml) | Transition::Applied(ml) => ml,
            Transition::Suppressed { modlist, .. } => modlist,
        }
    }
}

pub fn reconcile_object_class_transition(
    input: &TransitionInput<'_>,
    modlist: Vec<Modification>,
) -> Transition {
    let current = MergedAttributes::new(input.old_attributes, &modlist).get("objectClass");
    let mut classes = lower_set(&current);

    let unavailable: BTreeSet<&str> = input
        .options
        .iter()
        .filter(|o| o.disabled)
        .map(|o| o.name)
        .collect();
    let mut unneeded = input.unneeded_extra.clone();
    let mut required = input.required_extra.clone();
    for option in input.options {
        if unavailable.contains(option.name) {
            continue;
        }
        let now = input.enabled.contains(option.name);
        let before = input.previously_enabled.contains(option.name);
        if before && !now {
            unneeded.extend(lower_set(option.object_classes));
        } else if now && !before {
            required.extend(lower_set(option.object_classes));
        }
    }

    classes = classes.difference(&unneeded).cloned().collect();
    classes.extend(required);

    let old_classes = lower_set(input.old_attributes.values("objectClass"));
    if classes == old_classes {
        return Transition::Unchanged(modlist);
    }

    let canonical = |name: &String| -> String {
        input
            .schema
            .canonical_name(name)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone())
    };
    let mut classes: Vec<String> = classes.iter().map(canonical).collect();

    if !classes.iter().any(|c| input.schema.is_structural(c)) {
        match unneeded.iter().find(|c| input.schema.is_structural(c)) {
            Some(structural) => classes.push(canonical(structural)),
            None => {
                return Transition::Suppressed {
                    modlist,
                    reason: "no structural object class would remain".to_string(),
                }
            }
        }
    }

    let (must, may) = input.schema.attribute_types(&classes);
    let mut updated: Vec<Modification> = modlist
        .iter()
        .filter(|m| !m.targets("objectClass"))
        .cloned()
        .collect();
    updated.push(Modification::new(
        "objectClass",
        input.old_attributes.values("objectClass"),
        classes,
    ));

    let merged = MergedAttributes::new(input.old_attributes, &updated).non_empty();
    for name in merged.keys() {
        let bare = name.split(';').next().unwrap_or(name);
        if !must.contains(bare) && !may.contains(bare) {
            return Transition::Suppressed {
                modlist,
                reason: format!("attribute {} is not allowed by the new object classes", bare),
            };
        }
    }
    for name in &must {
        if !merged.contains_key(name) {
            return Transition::Suppressed {
                modlist,
                reason: format!("required attribute {} would be missing", name),
            };
        }
    }
    Transition::Applied(updated)
}
