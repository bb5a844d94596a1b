//! # Windows Computers
//!
//! The one computer type shipped with the engine. All of its behaviour
//! beyond the tables below lives in [`crate::computer`].

use crate::computer::{self, ALIAS, DHCP, FORWARD, REVERSE};
use crate::directory::Attributes;
use crate::layout::{Group, Tab};
use crate::mapping::Mapping;
use crate::module::{has_object_classes, ObjectKind, ObjectType, Operations};
use crate::options::ObjectOption;
use crate::property::{DefaultValue, PropertyDescriptor};
use crate::syntax::Syntax;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", "Computer name", Syntax::HostName)
        .identifies()
        .required(),
    PropertyDescriptor::new("description", "Description", Syntax::String).readonly_when_synced(),
    PropertyDescriptor::new("operatingSystem", "Operating system", Syntax::String)
        .readonly_when_synced(),
    PropertyDescriptor::new("operatingSystemVersion", "Operating system version", Syntax::String)
        .readonly_when_synced(),
    PropertyDescriptor::new("domain", "Domain", Syntax::DnsName),
    PropertyDescriptor::new("mac", "MAC address", Syntax::MacAddress).multivalue(),
    PropertyDescriptor::new("ip", "IP address", Syntax::IpAddress).multivalue(),
    PropertyDescriptor::new("inventoryNumber", "Inventory number", Syntax::String).multivalue(),
    PropertyDescriptor::new(FORWARD, "DNS forward lookup zone", Syntax::DnsEntry).multivalue(),
    PropertyDescriptor::new(REVERSE, "DNS reverse lookup zone", Syntax::DnsEntry).multivalue(),
    PropertyDescriptor::new(ALIAS, "DNS alias", Syntax::DnsAliasEntry).multivalue(),
    PropertyDescriptor::new(DHCP, "DHCP service", Syntax::DhcpEntry).multivalue(),
    PropertyDescriptor::new("groups", "Groups", Syntax::GroupDn).multivalue(),
    PropertyDescriptor::new("primaryGroup", "Primary group", Syntax::GroupDn)
        .required()
        .options(&["posix"])
        .default(DefaultValue::Computed(computer::default_primary_group)),
    PropertyDescriptor::new("unixhome", "Unix home directory", Syntax::AbsolutePath)
        .required()
        .options(&["posix"])
        .default(DefaultValue::Text("/dev/null")),
    PropertyDescriptor::new("shell", "Login shell", Syntax::String)
        .options(&["posix"])
        .default(DefaultValue::Text("/bin/false")),
    PropertyDescriptor::new("fqdn", "Fully qualified domain name", Syntax::DnsName)
        .read_only()
        .default(DefaultValue::Computed(computer::fqdn)),
    PropertyDescriptor::new("serverRole", "System role", Syntax::String).multivalue(),
];

static OPTIONS: &[ObjectOption] = &[
    ObjectOption::new("posix", "Posix account", &["posixAccount", "shadowAccount"])
        .enabled_by_default(),
    ObjectOption::new("samba", "Samba account", &["sambaSamAccount"]).enabled_by_default(),
    ObjectOption::new("kerberos", "Kerberos principal", &["krb5Principal", "krb5KDCEntry"])
        .enabled_by_default(),
];

static LAYOUT: &[Tab] = &[
    Tab::new(
        "General",
        "Basic settings",
        &[
            Group::new("Computer account", &[&["name", "description"], &["operatingSystem", "operatingSystemVersion"], &["inventoryNumber"]]),
            Group::new("Network settings", &[&["mac", "ip"], &["domain"]]),
            Group::new("DNS", &[&[FORWARD], &[REVERSE], &[ALIAS]]),
            Group::new("DHCP", &[&[DHCP]]),
        ],
    ),
    Tab::new(
        "Account",
        "Unix and group settings",
        &[
            Group::new("Groups", &[&["primaryGroup"], &["groups"]]),
            Group::new("Unix account", &[&["unixhome", "shell"]]),
        ],
    )
    .advanced(),
];

fn identify(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["univentionHost", "univentionWindows"])
}

pub fn windows() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "cn", None, None)
        .with("description", "description", None, None)
        .with("operatingSystem", "univentionOperatingSystem", None, None)
        .with("operatingSystemVersion", "univentionOperatingSystemVersion", None, None)
        .with("domain", "associatedDomain", None, None)
        .with("mac", "macAddress", None, None)
        .with("inventoryNumber", "univentionInventoryNumber", None, None)
        .with("unixhome", "homeDirectory", None, None)
        .with("shell", "loginShell", None, None)
        .with("serverRole", "univentionServerRole", None, None);
    ObjectType::new("computers/windows", "Computer: Windows", PROPERTIES, mapping, identify)
        .kind(ObjectKind::Computer)
        .options(OPTIONS)
        .layout(LAYOUT)
        .object_classes(&["top", "person", "univentionHost", "univentionWindows"])
        .operations(Operations::ALL.without_subtree_move())
        .default_containers(&["cn=computers"])
}
