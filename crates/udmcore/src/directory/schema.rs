//! Object class definitions.
//!
//! Only what object-class reconciliation needs: the kind of each class, its
//! MUST and MAY attributes and its superclasses. Names are case-insensitive.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClassKind {
    Structural,
    Auxiliary,
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectClassDef {
    pub name: String,
    pub kind: ObjectClassKind,
    pub sup: Vec<String>,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

impl ObjectClassDef {
    fn new(name: &str, kind: ObjectClassKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            sup: Vec::new(),
            must: Vec::new(),
            may: Vec::new(),
        }
    }

    pub fn structural(name: &str) -> Self {
        Self::new(name, ObjectClassKind::Structural)
    }

    pub fn auxiliary(name: &str) -> Self {
        Self::new(name, ObjectClassKind::Auxiliary)
    }

    pub fn abstract_class(name: &str) -> Self {
        Self::new(name, ObjectClassKind::Abstract)
    }

    pub fn sup(mut self, name: &str) -> Self {
        self.sup.push(name.to_string());
        self
    }

    pub fn must(mut self, attrs: &[&str]) -> Self {
        self.must.extend(attrs.iter().map(|a| a.to_string()));
        self
    }

    pub fn may(mut self, attrs: &[&str]) -> Self {
        self.may.extend(attrs.iter().map(|a| a.to_string()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    classes: BTreeMap<String, ObjectClassDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ObjectClassDef) {
        self.classes.insert(class.name.to_lowercase(), class);
    }

    pub fn with(mut self, class: ObjectClassDef) -> Self {
        self.insert(class);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ObjectClassDef> {
        self.classes.get(&name.to_lowercase())
    }

    /// Spelling of `name` as defined in the schema.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.get(name).map(|class| class.name.as_str())
    }

    pub fn is_structural(&self, name: &str) -> bool {
        self.get(name)
            .map(|class| class.kind == ObjectClassKind::Structural)
            .unwrap_or(false)
    }

    /// Lowercased MUST and MAY attributes of `classes` including every
    /// superclass. MUST attributes are not repeated in the MAY set.
    pub fn attribute_types<'a, I>(&self, classes: I) -> (BTreeSet<String>, BTreeSet<String>)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut must = BTreeSet::new();
        let mut may = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut pending: Vec<String> = classes.into_iter().map(|c| c.to_lowercase()).collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(class) = self.classes.get(&name) {
                must.extend(class.must.iter().map(|a| a.to_lowercase()));
                may.extend(class.may.iter().map(|a| a.to_lowercase()));
                pending.extend(class.sup.iter().map(|s| s.to_lowercase()));
            }
        }
        let may = may.difference(&must).cloned().collect();
        (must, may)
    }

    /// Object classes used by the built-in object types.
    pub fn core() -> Self {
        use ObjectClassDef as C;
        Schema::new()
            .with(C::abstract_class("top").must(&["objectClass"]))
            .with(C::auxiliary("univentionObject").must(&["univentionObjectType"]).may(&[
                "univentionObjectFlag",
            ]))
            .with(C::auxiliary("univentionPolicyReference").may(&["univentionPolicyReference"]))
            .with(
                C::structural("organizationalUnit")
                    .sup("top")
                    .must(&["ou"])
                    .may(&["description", "userPassword"]),
            )
            .with(
                C::structural("organizationalRole")
                    .sup("top")
                    .must(&["cn"])
                    .may(&["description"]),
            )
            .with(C::auxiliary("univentionContainer").may(&["description"]))
            .with(
                C::structural("person")
                    .sup("top")
                    .must(&["cn", "sn"])
                    .may(&["description", "userPassword", "seeAlso", "telephoneNumber"]),
            )
            .with(C::auxiliary("univentionHost").must(&["cn"]).may(&[
                "associatedDomain",
                "macAddress",
                "aRecord",
                "aAAARecord",
                "univentionInventoryNumber",
                "univentionOperatingSystem",
                "univentionOperatingSystemVersion",
                "univentionServerRole",
                "univentionService",
                "univentionNetworkLink",
                "description",
                "displayName",
                "secretary",
            ]))
            .with(C::auxiliary("univentionWindows").may(&[
                "univentionOperatingSystem",
                "univentionOperatingSystemVersion",
                "univentionServerRole",
            ]))
            .with(
                C::auxiliary("posixAccount")
                    .must(&["cn", "uid", "uidNumber", "gidNumber", "homeDirectory"])
                    .may(&["userPassword", "loginShell", "gecos", "description"]),
            )
            .with(C::auxiliary("shadowAccount").must(&["uid"]).may(&[
                "userPassword",
                "shadowLastChange",
                "shadowMin",
                "shadowMax",
                "shadowWarning",
                "shadowInactive",
                "shadowExpire",
                "shadowFlag",
                "description",
            ]))
            .with(
                C::auxiliary("sambaSamAccount")
                    .must(&["uid", "sambaSID"])
                    .may(&["sambaAcctFlags", "displayName", "sambaPrimaryGroupSID"]),
            )
            .with(C::auxiliary("krb5Principal").must(&["krb5PrincipalName"]))
            .with(
                C::auxiliary("krb5KDCEntry")
                    .sup("krb5Principal")
                    .must(&["krb5KeyVersionNumber"])
                    .may(&["krb5MaxLife", "krb5MaxRenew", "krb5KDCFlags", "krb5Key"]),
            )
            .with(
                C::structural("posixGroup")
                    .sup("top")
                    .must(&["cn", "gidNumber"])
                    .may(&["memberUid", "description", "userPassword"]),
            )
            .with(C::auxiliary("univentionGroup").may(&[
                "uniqueMember",
                "description",
                "univentionGroupType",
                "sambaGroupType",
            ]))
            .with(
                C::structural("dNSZone")
                    .sup("top")
                    .must(&["zoneName", "relativeDomainName"])
                    .may(&[
                        "aRecord",
                        "aAAARecord",
                        "pTRRecord",
                        "cNAMERecord",
                        "sOARecord",
                        "nSRecord",
                        "mXRecord",
                        "dNSTTL",
                    ]),
            )
            .with(C::structural("dhcpService").sup("top").must(&["cn"]).may(&[
                "dhcpStatements",
                "dhcpOption",
            ]))
            .with(C::auxiliary("univentionDhcpService"))
            .with(
                C::structural("univentionDhcpHost")
                    .sup("top")
                    .must(&["cn"])
                    .may(&["dhcpHWAddress", "univentionDhcpFixedAddress", "dhcpStatements"]),
            )
            .with(C::structural("univentionPolicy").sup("top").must(&["cn"]).may(&[
                "univentionPolicyObject",
                "univentionRequiredObjectClasses",
                "univentionProhibitedObjectClasses",
                "univentionFixedAttributes",
                "univentionEmptyAttributes",
                "ldapFilter",
                "description",
            ]))
            .with(C::auxiliary("univentionPolicyPWHistory").may(&[
                "univentionPWHistoryLen",
                "univentionPWExpiryInterval",
                "univentionPWLength",
                "univentionPWQualityCheck",
            ]))
    }
}
