//! DHCP services and the host entries below them.

use crate::directory::Attributes;
use crate::mapping::Mapping;
use crate::module::{has_object_classes, ObjectType, Operations};
use crate::property::PropertyDescriptor;
use crate::syntax::Syntax;

static SERVICE_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new(
    "service",
    "Service name",
    Syntax::String,
)
.identifies()
.required()];

static HOST_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("host", "Host name", Syntax::String)
        .identifies()
        .required(),
    PropertyDescriptor::new("hwaddress", "Hardware address", Syntax::String).required(),
    PropertyDescriptor::new("fixedaddress", "Fixed IP addresses", Syntax::IpAddress).multivalue(),
];

fn is_service(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["dhcpService"])
}

fn is_host(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["univentionDhcpHost"])
}

pub fn service() -> ObjectType {
    let mapping = Mapping::new().with("service", "cn", None, None);
    ObjectType::new("dhcp/service", "DHCP: Service", SERVICE_PROPERTIES, mapping, is_service)
        .object_classes(&["top", "dhcpService", "univentionDhcpService"])
        .default_containers(&["cn=dhcp"])
        .childs()
}

pub fn host() -> ObjectType {
    let mapping = Mapping::new()
        .with("host", "cn", None, None)
        .with("hwaddress", "dhcpHWAddress", None, None)
        .with("fixedaddress", "univentionDhcpFixedAddress", None, None);
    ObjectType::new("dhcp/host", "DHCP: Host", HOST_PROPERTIES, mapping, is_host)
        .object_classes(&["top", "univentionDhcpHost"])
        .superordinates(&["dhcp/service"])
        .operations(Operations::FIXED)
}
