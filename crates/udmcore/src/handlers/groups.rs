//! Posix groups with DN and login-name membership.

use crate::directory::Attributes;
use crate::layout::{Group, Tab};
use crate::mapping::{integer_to_ldap, Mapping};
use crate::module::{has_object_classes, ObjectType};
use crate::property::PropertyDescriptor;
use crate::syntax::Syntax;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", "Name", Syntax::String)
        .identifies()
        .required(),
    PropertyDescriptor::new("gidNumber", "Group ID", Syntax::Integer)
        .required()
        .may_not_change(),
    PropertyDescriptor::new("description", "Description", Syntax::String),
    PropertyDescriptor::new("users", "Members", Syntax::Dn).multivalue(),
    PropertyDescriptor::new("memberUid", "Member login names", Syntax::String)
        .multivalue()
        .read_only(),
];

static LAYOUT: &[Tab] = &[Tab::new(
    "General",
    "Basic settings",
    &[
        Group::new("Group", &[&["name", "description"], &["gidNumber"]]),
        Group::new("Members", &[&["users"]]),
    ],
)];

fn identify(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["posixGroup", "univentionGroup"])
}

pub fn group() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "cn", None, None)
        .with("gidNumber", "gidNumber", Some(integer_to_ldap), None)
        .with("description", "description", None, None)
        .with("users", "uniqueMember", None, None)
        .with("memberUid", "memberUid", None, None);
    ObjectType::new("groups/group", "Group", PROPERTIES, mapping, identify)
        .object_classes(&["top", "posixGroup", "univentionGroup"])
        .layout(LAYOUT)
        .default_containers(&["cn=groups"])
}
