//! Containers: organisational units and plain `cn` containers.

use crate::directory::Attributes;
use crate::layout::{Group, Tab};
use crate::mapping::Mapping;
use crate::module::{has_object_classes, ObjectType};
use crate::property::PropertyDescriptor;
use crate::syntax::Syntax;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", "Name", Syntax::String)
        .identifies()
        .required(),
    PropertyDescriptor::new("description", "Description", Syntax::String),
];

static LAYOUT: &[Tab] = &[Tab::new(
    "General",
    "Basic settings",
    &[Group::new("Container", &[&["name", "description"]])],
)];

fn is_ou(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["organizationalUnit"])
}

fn is_cn(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["organizationalRole", "univentionContainer"])
}

pub fn ou() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "ou", None, None)
        .with("description", "description", None, None);
    ObjectType::new("container/ou", "Container: Organisational unit", PROPERTIES, mapping, is_ou)
        .object_classes(&["top", "organizationalUnit"])
        .layout(LAYOUT)
        .childs()
}

pub fn cn() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "cn", None, None)
        .with("description", "description", None, None);
    ObjectType::new("container/cn", "Container: Container", PROPERTIES, mapping, is_cn)
        .object_classes(&["top", "organizationalRole", "univentionContainer"])
        .layout(LAYOUT)
        .childs()
}
