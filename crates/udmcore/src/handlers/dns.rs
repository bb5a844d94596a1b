//! DNS zones and host records.
//!
//! Zone entries carry the SOA record as one attribute:
//! `nameserver contact serial refresh retry expire ttl`. The individual
//! fields are properties of their own, read back from the record on load
//! and written together when any of them changes.

use crate::directory::{Attributes, Modification};
use crate::dns as records;
use crate::error::Result;
use crate::mapping::Mapping;
use crate::module::{has_object_classes, ObjectType, Operations};
use crate::object::DirectoryObject;
use crate::property::{DefaultValue, PropertyDescriptor};
use crate::syntax::Syntax;
use crate::value::Value;

const SOA_FIELDS: [&str; 6] = ["contact", "serial", "refresh", "retry", "expire", "ttl"];

const SOA_PROPERTIES: [PropertyDescriptor; 7] = [
    PropertyDescriptor::new("nameserver", "Name servers", Syntax::DnsName)
        .multivalue()
        .required(),
    PropertyDescriptor::new("contact", "Contact person", Syntax::String)
        .default(DefaultValue::Computed(default_contact)),
    PropertyDescriptor::new("serial", "Serial number", Syntax::Integer)
        .default(DefaultValue::Text("1")),
    PropertyDescriptor::new("refresh", "Refresh interval", Syntax::Integer)
        .default(DefaultValue::Text("28800")),
    PropertyDescriptor::new("retry", "Retry interval", Syntax::Integer)
        .default(DefaultValue::Text("7200")),
    PropertyDescriptor::new("expire", "Expiry interval", Syntax::Integer)
        .default(DefaultValue::Text("604800")),
    PropertyDescriptor::new("ttl", "Minimum time to live", Syntax::Integer)
        .default(DefaultValue::Text("10800")),
];

static FORWARD_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("zone", "Zone name", Syntax::DnsName)
        .identifies()
        .required()
        .may_not_change(),
    SOA_PROPERTIES[0],
    SOA_PROPERTIES[1],
    SOA_PROPERTIES[2],
    SOA_PROPERTIES[3],
    SOA_PROPERTIES[4],
    SOA_PROPERTIES[5],
    SOA_PROPERTIES[6],
];

static REVERSE_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("subnet", "Subnet", Syntax::String)
        .identifies()
        .required()
        .may_not_change(),
    SOA_PROPERTIES[0],
    SOA_PROPERTIES[1],
    SOA_PROPERTIES[2],
    SOA_PROPERTIES[3],
    SOA_PROPERTIES[4],
    SOA_PROPERTIES[5],
    SOA_PROPERTIES[6],
];

static HOST_RECORD_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", "Host name", Syntax::DnsName)
        .identifies()
        .required(),
    PropertyDescriptor::new("a", "IP addresses", Syntax::Ipv4Address).multivalue(),
];

fn zone_label(object: &DirectoryObject) -> Option<String> {
    if let Some(zone) = object.info("zone").as_text() {
        return Some(zone.to_string());
    }
    object.info("subnet").as_text().map(records::reverse_zone_name)
}

fn default_contact(object: &DirectoryObject) -> Value {
    zone_label(object)
        .map(|zone| Value::text(format!("root.{}.", zone)))
        .unwrap_or_default()
}

fn soa_record(object: &DirectoryObject) -> String {
    let nameserver = object.info("nameserver").as_list().into_iter().next().unwrap_or_default();
    let mut fields = vec![nameserver];
    for field in SOA_FIELDS {
        fields.push(object.info(field).as_text().unwrap_or_default().to_string());
    }
    fields.join(" ")
}

fn load_soa(object: &mut DirectoryObject) {
    let Some(soa) = object.old_attrs.first("sOARecord").map(str::to_string) else {
        return;
    };
    let fields: Vec<&str> = soa.split_whitespace().collect();
    for (name, value) in SOA_FIELDS.iter().zip(fields.iter().skip(1)) {
        object.info.insert(name.to_string(), Value::text(*value));
    }
}

fn zone_addlist(object: &DirectoryObject) -> Result<Vec<Modification>> {
    Ok(vec![
        Modification::add("relativeDomainName", vec!["@".to_string()]),
        Modification::add("sOARecord", vec![soa_record(object)]),
    ])
}

fn zone_modlist(object: &DirectoryObject, mut modlist: Vec<Modification>) -> Result<Vec<Modification>> {
    if object.has_changed_any(&["nameserver"]) || object.has_changed_any(&SOA_FIELDS) {
        modlist.push(Modification::new(
            "sOARecord",
            object.old_attrs.values("sOARecord"),
            vec![soa_record(object)],
        ));
    }
    Ok(modlist)
}

fn is_zone(attrs: &Attributes, reverse: bool) -> bool {
    if !has_object_classes(attrs, &["dNSZone"]) || !attrs.has_value("relativeDomainName", "@") {
        return false;
    }
    let name = attrs.first("zoneName").unwrap_or_default().to_lowercase();
    let arpa = name.ends_with(".in-addr.arpa") || name.ends_with(".ip6.arpa");
    arpa == reverse
}

fn is_forward_zone(_dn: &str, attrs: &Attributes) -> bool {
    is_zone(attrs, false)
}

fn is_reverse_zone(_dn: &str, attrs: &Attributes) -> bool {
    is_zone(attrs, true)
}

fn is_host_record(_dn: &str, attrs: &Attributes) -> bool {
    has_object_classes(attrs, &["dNSZone"])
        && !attrs.has_value("relativeDomainName", "@")
        && (attrs.contains("aRecord") || attrs.contains("aAAARecord"))
        && !attrs.contains("cNAMERecord")
}

fn subnet_to_zone(value: &Value) -> Vec<String> {
    value
        .as_text()
        .map(|subnet| vec![records::reverse_zone_name(subnet)])
        .unwrap_or_default()
}

fn zone_to_subnet(raw: &[String]) -> Value {
    raw.first()
        .and_then(|zone| records::subnet_from_zone_name(zone))
        .map(Value::text)
        .unwrap_or_default()
}

fn soa_mapping(mapping: Mapping) -> Mapping {
    mapping.with("nameserver", "nSRecord", None, None)
}

pub fn forward_zone() -> ObjectType {
    let mapping = soa_mapping(Mapping::new().with("zone", "zoneName", None, None));
    ObjectType::new("dns/forward_zone", "DNS: Forward lookup zone", FORWARD_PROPERTIES, mapping, is_forward_zone)
        .object_classes(&["top", "dNSZone"])
        .addlist(zone_addlist)
        .modlist(zone_modlist)
        .post_load(load_soa)
        .operations(Operations::FIXED)
        .default_containers(&["cn=dns"])
        .childs()
}

pub fn reverse_zone() -> ObjectType {
    let mapping = soa_mapping(Mapping::new().with(
        "subnet",
        "zoneName",
        Some(subnet_to_zone),
        Some(zone_to_subnet),
    ));
    ObjectType::new("dns/reverse_zone", "DNS: Reverse lookup zone", REVERSE_PROPERTIES, mapping, is_reverse_zone)
        .object_classes(&["top", "dNSZone"])
        .addlist(zone_addlist)
        .modlist(zone_modlist)
        .post_load(load_soa)
        .operations(Operations::FIXED)
        .default_containers(&["cn=dns"])
        .childs()
}

fn host_record_addlist(object: &DirectoryObject) -> Result<Vec<Modification>> {
    let zone_dn = object
        .superordinate()
        .map(str::to_string)
        .unwrap_or_else(|| object.position().to_string());
    let zone = records::zone_name(object.context().directory.as_ref(), &zone_dn)?;
    Ok(vec![Modification::add("zoneName", vec![zone])])
}

pub fn host_record() -> ObjectType {
    let mapping = Mapping::new()
        .with("name", "relativeDomainName", None, None)
        .with("a", "aRecord", None, None);
    ObjectType::new("dns/host_record", "DNS: Host record", HOST_RECORD_PROPERTIES, mapping, is_host_record)
        .object_classes(&["top", "dNSZone"])
        .superordinates(&["dns/forward_zone"])
        .addlist(host_record_addlist)
        .operations(Operations::FIXED)
}
