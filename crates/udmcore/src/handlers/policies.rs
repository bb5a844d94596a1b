//! Password history policy.

use crate::directory::Attributes;
use crate::mapping::{boolean_from_ldap, boolean_to_ldap, integer_to_ldap, Mapping};
use crate::module::{has_object_classes, ObjectKind, ObjectType};
use crate::property::{DefaultValue, PropertyDescriptor};
use crate::syntax::Syntax;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", "Name", Syntax::String)
        .identifies()
        .required(),
    PropertyDescriptor::new("length", "History length", Syntax::Integer),
    PropertyDescriptor::new("expiryInterval", "Password expiry interval", Syntax::Integer),
    PropertyDescriptor::new("pwLength", "Password length", Syntax::Integer),
    PropertyDescriptor::new("pwQualityCheck", "Password quality check", Syntax::Boolean)
        .default(DefaultValue::Text("0")),
    PropertyDescriptor::new("requiredObjectClasses", "Required object classes", Syntax::String)
        .multivalue(),
    PropertyDescriptor::new("prohibitedObjectClasses", "Excluded object classes", Syntax::String)
        .multivalue(),
    PropertyDescriptor::new("fixedAttributes", "Fixed attributes", Syntax::String).multivalue(),
    PropertyDescriptor::new("emptyAttributes", "Empty attributes", Syntax::String).multivalue(),
];

fn identify(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["univentionPolicy", "univentionPolicyPWHistory"])
}

pub fn pwhistory() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "cn", None, None)
        .with("length", "univentionPWHistoryLen", Some(integer_to_ldap), None)
        .with("expiryInterval", "univentionPWExpiryInterval", Some(integer_to_ldap), None)
        .with("pwLength", "univentionPWLength", Some(integer_to_ldap), None)
        .with(
            "pwQualityCheck",
            "univentionPWQualityCheck",
            Some(boolean_to_ldap),
            Some(boolean_from_ldap),
        )
        .with("requiredObjectClasses", "univentionRequiredObjectClasses", None, None)
        .with("prohibitedObjectClasses", "univentionProhibitedObjectClasses", None, None)
        .with("fixedAttributes", "univentionFixedAttributes", None, None)
        .with("emptyAttributes", "univentionEmptyAttributes", None, None);
    ObjectType::new("policies/pwhistory", "Policy: Passwords", PROPERTIES, mapping, identify)
        .kind(ObjectKind::Policy {
            object_class: "univentionPolicyPWHistory",
        })
        .object_classes(&["top", "univentionPolicy", "univentionPolicyPWHistory"])
        .default_containers(&["cn=policies"])
}
