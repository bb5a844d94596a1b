//! DNS record maintenance.
//!
//! Pointer-record encoding (RFC 1035 `in-addr.arpa`, RFC 3596 `ip6.arpa`)
//! and the host, pointer and alias records a computer keeps in DNS zones.
//! Every write bumps the serial of the zone it touched.

use crate::directory::{Attributes, DirectoryClient, Filter, Modification, Scope};
use crate::dn;
use crate::error::{Result, UdmError};
use std::net::{IpAddr, Ipv6Addr};
use tracing::debug;

const IPV4_SUFFIX: &str = ".in-addr.arpa";
const IPV6_SUFFIX: &str = ".ip6.arpa";

/// The 32 hex nibbles of an IPv6 address.
pub fn ipv6_nibbles(ip: &Ipv6Addr) -> Vec<char> {
    ip.segments()
        .iter()
        .flat_map(|s| format!("{:04x}", s).chars().collect::<Vec<_>>())
        .collect()
}

/// Fully written-out IPv6 address (`2001:0db8:0000:...`).
pub fn explode_ipv6(ip: &Ipv6Addr) -> String {
    ip.segments()
        .iter()
        .map(|s| format!("{:04x}", s))
        .collect::<Vec<_>>()
        .join(":")
}

fn zone_labels(zone: &str) -> Option<(bool, Vec<String>)> {
    let zone = zone.trim_end_matches('.').to_lowercase();
    if let Some(stripped) = zone.strip_suffix(IPV4_SUFFIX) {
        Some((false, stripped.split('.').map(str::to_string).collect()))
    } else {
        zone.strip_suffix(IPV6_SUFFIX)
            .map(|stripped| (true, stripped.split('.').map(str::to_string).collect()))
    }
}

/// Relative name of the pointer record for `ip` inside the reverse zone
/// `zone_dn`, or `None` when the address is not covered by the zone.
///
/// `("10.200.2.5", "zoneName=2.200.10.in-addr.arpa,...")` gives `"5"`,
/// with zone `200.10.in-addr.arpa` it gives `"5.2"`.
pub fn calc_reverse_entry_name(ip: &str, zone_dn: &str) -> Option<String> {
    let (v6, mut labels) = zone_labels(&dn::rdn_value(zone_dn))?;
    labels.reverse();
    let addr: IpAddr = ip.parse().ok()?;
    let parts: Vec<String> = match (addr, v6) {
        (IpAddr::V4(v4), false) => v4.octets().iter().map(|o| o.to_string()).collect(),
        (IpAddr::V6(v6), true) => ipv6_nibbles(&v6).iter().map(|c| c.to_string()).collect(),
        _ => return None,
    };
    if labels.len() >= parts.len() || parts[..labels.len()] != labels[..] {
        return None;
    }
    let mut rest: Vec<String> = parts[labels.len()..].to_vec();
    rest.reverse();
    Some(rest.join("."))
}

/// Address encoded by the pointer record `relative` in reverse zone
/// `zone_name`.
pub fn ip_from_ptr(zone_name: &str, relative: &str) -> Option<String> {
    let (v6, mut labels) = zone_labels(zone_name)?;
    labels.reverse();
    let mut rest: Vec<String> = relative.split('.').map(str::to_string).collect();
    rest.reverse();
    labels.extend(rest);
    if v6 {
        if labels.len() != 32
            || !labels.iter().all(|l| l.len() == 1 && l.as_bytes()[0].is_ascii_hexdigit())
        {
            return None;
        }
        let hex: String = labels.concat();
        let groups: Vec<&str> = (0..8).map(|i| &hex[i * 4..i * 4 + 4]).collect();
        groups
            .join(":")
            .parse::<Ipv6Addr>()
            .ok()
            .map(|ip| ip.to_string())
    } else {
        let ip = labels.join(".");
        ip.parse::<std::net::Ipv4Addr>().ok().map(|ip| ip.to_string())
    }
}

/// Reverse zone name covering `subnet` (`"10.200"` -> `200.10.in-addr.arpa`,
/// `"2001:0db8"` -> `8.b.d.0.1.0.0.2.ip6.arpa`).
pub fn reverse_zone_name(subnet: &str) -> String {
    if subnet.contains(':') {
        let mut nibbles: Vec<char> = subnet.chars().filter(|c| *c != ':').collect();
        nibbles.reverse();
        let labels: Vec<String> = nibbles.iter().map(|c| c.to_string()).collect();
        format!("{}{}", labels.join("."), IPV6_SUFFIX)
    } else {
        let mut octets: Vec<&str> = subnet.split('.').collect();
        octets.reverse();
        format!("{}{}", octets.join("."), IPV4_SUFFIX)
    }
}

/// Inverse of [`reverse_zone_name`].
pub fn subnet_from_zone_name(zone: &str) -> Option<String> {
    let (v6, mut labels) = zone_labels(zone)?;
    labels.reverse();
    if v6 {
        let chunks: Vec<String> = labels.chunks(4).map(|c| c.concat()).collect();
        Some(chunks.join(":"))
    } else {
        Some(labels.join("."))
    }
}

/// Name of the zone stored at `zone_dn`.
pub fn zone_name(directory: &dyn DirectoryClient, zone_dn: &str) -> Result<String> {
    Ok(directory
        .get(zone_dn)?
        .and_then(|attrs| attrs.first("zoneName").map(str::to_string))
        .unwrap_or_else(|| dn::rdn_value(zone_dn)))
}

fn address_attribute(ip: &str) -> &'static str {
    if ip.contains(':') {
        "aAAARecord"
    } else {
        "aRecord"
    }
}

/// Increment the serial in the zone's SOA record, if it has one.
pub fn bump_zone_serial(directory: &dyn DirectoryClient, zone_dn: &str) -> Result<()> {
    let Some(zone) = directory.get(zone_dn)? else {
        return Ok(());
    };
    let Some(soa) = zone.first("sOARecord") else {
        return Ok(());
    };
    let mut fields: Vec<String> = soa.split_whitespace().map(str::to_string).collect();
    if fields.len() < 3 {
        return Ok(());
    }
    // Serials are 32-bit sequence numbers and wrap around.
    let serial = fields[2].parse::<u64>().unwrap_or(0) as u32;
    fields[2] = serial.wrapping_add(1).to_string();
    directory.modify(
        zone_dn,
        &[Modification::new(
            "sOARecord",
            vec![soa.to_string()],
            vec![fields.join(" ")],
        )],
    )?;
    Ok(())
}

fn host_record_dn(name: &str, zone_dn: &str) -> String {
    dn::compose("relativeDomainName", name, zone_dn)
}

/// Add `ip` to the host record `name` in the forward zone, creating the
/// record when needed.
pub fn add_forward(
    directory: &dyn DirectoryClient,
    name: &str,
    zone_dn: &str,
    ip: &str,
) -> Result<()> {
    let record = host_record_dn(name, zone_dn);
    let attr = address_attribute(ip);
    match directory.get(&record)? {
        Some(existing) => {
            if existing.has_value(attr, ip) {
                return Ok(());
            }
            directory.modify(&record, &[Modification::add(attr, vec![ip.to_string()])])?;
        }
        None => {
            let zone = zone_name(directory, zone_dn)?;
            let attrs: Attributes = vec![
                ("objectClass", vec!["top".into(), "dNSZone".into(), "univentionObject".into()]),
                ("univentionObjectType", vec!["dns/host_record".into()]),
                ("zoneName", vec![zone]),
                ("relativeDomainName", vec![name.to_string()]),
                (attr, vec![ip.to_string()]),
            ]
            .into_iter()
            .collect();
            directory.add(&record, &attrs)?;
        }
    }
    debug!(record = %record, ip, "added forward DNS address");
    bump_zone_serial(directory, zone_dn)
}

/// Remove `ip` from the host record; the record goes when no address is
/// left or when `ip` is empty.
pub fn remove_forward(
    directory: &dyn DirectoryClient,
    name: &str,
    zone_dn: &str,
    ip: &str,
) -> Result<()> {
    let record = host_record_dn(name, zone_dn);
    let Some(existing) = directory.get(&record)? else {
        return Ok(());
    };
    let mut remaining = existing.values("aRecord");
    remaining.extend(existing.values("aAAARecord"));
    remaining.retain(|v| !ip.is_empty() && v != ip);
    if remaining.is_empty() {
        directory.delete(&record)?;
    } else if existing.has_value(address_attribute(ip), ip) {
        directory.modify(
            &record,
            &[Modification::new(address_attribute(ip), vec![ip.to_string()], vec![])],
        )?;
    }
    debug!(record = %record, ip, "removed forward DNS address");
    bump_zone_serial(directory, zone_dn)
}

/// Point the reverse record for `ip` at `fqdn`.
///
/// Returns `false` when the address is not inside the reverse zone.
pub fn add_reverse(
    directory: &dyn DirectoryClient,
    fqdn: &str,
    zone_dn: &str,
    ip: &str,
) -> Result<bool> {
    let Some(relative) = calc_reverse_entry_name(ip, zone_dn) else {
        return Ok(false);
    };
    let record = host_record_dn(&relative, zone_dn);
    let target = format!("{}.", fqdn.trim_end_matches('.'));
    match directory.get(&record)? {
        Some(existing) => {
            if !existing.has_value("pTRRecord", &target) {
                directory.modify(&record, &[Modification::add("pTRRecord", vec![target])])?;
            }
        }
        None => {
            let zone = zone_name(directory, zone_dn)?;
            let attrs: Attributes = vec![
                ("objectClass", vec!["top".into(), "dNSZone".into(), "univentionObject".into()]),
                ("univentionObjectType", vec!["dns/ptr_record".into()]),
                ("zoneName", vec![zone]),
                ("relativeDomainName", vec![relative]),
                ("pTRRecord", vec![target]),
            ]
            .into_iter()
            .collect();
            directory.add(&record, &attrs)?;
        }
    }
    bump_zone_serial(directory, zone_dn)?;
    Ok(true)
}

fn points_to(value: &str, name: &str) -> bool {
    let value = value.to_lowercase();
    let name = name.to_lowercase();
    value == name || value.starts_with(&format!("{}.", name))
}

/// Drop pointers to host `name` from the reverse record for `ip`.
pub fn remove_reverse(
    directory: &dyn DirectoryClient,
    name: &str,
    zone_dn: &str,
    ip: &str,
) -> Result<()> {
    let Some(relative) = calc_reverse_entry_name(ip, zone_dn) else {
        return Ok(());
    };
    let record = host_record_dn(&relative, zone_dn);
    let Some(existing) = directory.get(&record)? else {
        return Ok(());
    };
    let pointers = existing.values("pTRRecord");
    let (ours, others): (Vec<String>, Vec<String>) =
        pointers.into_iter().partition(|p| points_to(p, name));
    if ours.is_empty() {
        return Ok(());
    }
    if others.is_empty() {
        directory.delete(&record)?;
    } else {
        directory.modify(&record, &[Modification::new("pTRRecord", ours, vec![])])?;
    }
    bump_zone_serial(directory, zone_dn)
}

/// Create alias `alias` in `alias_zone_dn` pointing at `name` in the
/// forward zone.
pub fn add_alias(
    directory: &dyn DirectoryClient,
    name: &str,
    forward_zone_dn: &str,
    alias_zone_dn: &str,
    alias: &str,
) -> Result<()> {
    let target = format!("{}.{}.", name, zone_name(directory, forward_zone_dn)?);
    let record = host_record_dn(alias, alias_zone_dn);
    if let Some(existing) = directory.get(&record)? {
        if existing.has_value("cNAMERecord", &target) {
            return Ok(());
        }
        return Err(UdmError::DnsAliasAlreadyUsed(alias.to_string()));
    }
    let zone = zone_name(directory, alias_zone_dn)?;
    let attrs: Attributes = vec![
        ("objectClass", vec!["top".into(), "dNSZone".into(), "univentionObject".into()]),
        ("univentionObjectType", vec!["dns/alias".into()]),
        ("zoneName", vec![zone]),
        ("relativeDomainName", vec![alias.to_string()]),
        ("cNAMERecord", vec![target]),
    ]
    .into_iter()
    .collect();
    directory.add(&record, &attrs)?;
    bump_zone_serial(directory, alias_zone_dn)
}

pub fn remove_alias(
    directory: &dyn DirectoryClient,
    name: &str,
    alias_zone_dn: &str,
    alias: &str,
) -> Result<()> {
    let record = host_record_dn(alias, alias_zone_dn);
    let Some(existing) = directory.get(&record)? else {
        return Ok(());
    };
    if existing
        .values("cNAMERecord")
        .iter()
        .any(|target| points_to(target, name))
    {
        directory.delete(&record)?;
        bump_zone_serial(directory, alias_zone_dn)?;
    }
    Ok(())
}

/// Follow a host rename: host records, pointers and aliases.
pub fn rename_host(
    directory: &dyn DirectoryClient,
    old_name: &str,
    new_name: &str,
    forward_zones: &[String],
) -> Result<()> {
    let base = directory.base();
    for zone_dn in forward_zones {
        let old_record = host_record_dn(old_name, zone_dn);
        if directory.get(&old_record)?.is_some() {
            directory.rename(&old_record, &host_record_dn(new_name, zone_dn))?;
            bump_zone_serial(directory, zone_dn)?;
        }
        let zone = zone_name(directory, zone_dn)?;
        let old_target = format!("{}.{}.", old_name, zone);
        let new_target = format!("{}.{}.", new_name, zone);
        for attr in ["pTRRecord", "cNAMERecord"] {
            let hits = directory.search(&base, Scope::Sub, &Filter::eq(attr, &old_target), &[])?;
            for (record, _) in hits {
                directory.modify(
                    &record,
                    &[
                        Modification::new(attr, vec![old_target.clone()], vec![]),
                        Modification::add(attr, vec![new_target.clone()]),
                    ],
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemDirectory;

    const BASE: &str = "dc=example,dc=com";
    const FORWARD: &str = "zoneName=example.com,cn=dns,dc=example,dc=com";
    const REVERSE: &str = "zoneName=0.10.in-addr.arpa,cn=dns,dc=example,dc=com";

    fn zones() -> MemDirectory {
        let dir = MemDirectory::new(BASE);
        let zone = |name: &str| -> Attributes {
            vec![
                ("objectClass", vec!["dNSZone".to_string()]),
                ("zoneName", vec![name.to_string()]),
                ("relativeDomainName", vec!["@".to_string()]),
                ("sOARecord", vec!["ns.example.com. root.example.com. 7 28800 7200 604800 10800".to_string()]),
            ]
            .into_iter()
            .collect()
        };
        dir.seed("cn=dns,dc=example,dc=com", vec![("objectClass", vec!["organizationalRole".to_string()])].into_iter().collect());
        dir.seed(FORWARD, zone("example.com"));
        dir.seed(REVERSE, zone("0.10.in-addr.arpa"));
        dir
    }

    #[test]
    fn test_calc_reverse_entry_name() {
        assert_eq!(
            calc_reverse_entry_name("10.200.2.5", "subnet=2.200.10.in-addr.arpa").as_deref(),
            Some("5")
        );
        assert_eq!(
            calc_reverse_entry_name("10.200.2.5", "subnet=200.10.in-addr.arpa").as_deref(),
            Some("5.2")
        );
        assert_eq!(
            calc_reverse_entry_name(
                "2001:db8::3",
                "subnet=0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa"
            )
            .as_deref(),
            Some("3.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0")
        );
        assert_eq!(calc_reverse_entry_name("1.2.3.4", "subnet=2.200.10.in-addr.arpa"), None);
        assert_eq!(calc_reverse_entry_name("2001:db8::3", "subnet=2.200.10.in-addr.arpa"), None);
    }

    #[test]
    fn test_ip_from_ptr() {
        assert_eq!(ip_from_ptr("2.200.10.in-addr.arpa", "5").as_deref(), Some("10.200.2.5"));
        assert_eq!(ip_from_ptr("200.10.in-addr.arpa", "5.2").as_deref(), Some("10.200.2.5"));
        assert_eq!(
            ip_from_ptr(
                "0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa",
                "3.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0"
            )
            .as_deref(),
            Some("2001:db8::3")
        );
        assert_eq!(ip_from_ptr("example.com", "5"), None);
    }

    #[test]
    fn test_ip_from_ptr_rejects_labels_that_are_not_nibbles() {
        let zone = "0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa";
        assert_eq!(ip_from_ptr(zone, "é.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0"), None);
        assert_eq!(ip_from_ptr(zone, "g.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0"), None);
        assert_eq!(ip_from_ptr(zone, "10.0.0.0.0.0.0.0.0.0.0.0.0.0.0"), None);
    }

    #[test]
    fn test_reverse_zone_names() {
        assert_eq!(reverse_zone_name("10.200"), "200.10.in-addr.arpa");
        assert_eq!(reverse_zone_name("2001:0db8"), "8.b.d.0.1.0.0.2.ip6.arpa");
        assert_eq!(subnet_from_zone_name("200.10.in-addr.arpa").unwrap(), "10.200");
        assert_eq!(subnet_from_zone_name("8.b.d.0.1.0.0.2.ip6.arpa").unwrap(), "2001:0db8");
    }

    #[test]
    fn test_explode_ipv6() {
        let ip: Ipv6Addr = "2001:db8::3".parse().unwrap();
        assert_eq!(explode_ipv6(&ip), "2001:0db8:0000:0000:0000:0000:0000:0003");
    }

    #[test]
    fn test_forward_records_follow_addresses() {
        let dir = zones();
        add_forward(&dir, "pc1", FORWARD, "10.0.0.5").unwrap();
        add_forward(&dir, "pc1", FORWARD, "10.0.0.6").unwrap();
        let record = format!("relativeDomainName=pc1,{}", FORWARD);
        assert_eq!(dir.get_required(&record).unwrap().values("aRecord").len(), 2);

        remove_forward(&dir, "pc1", FORWARD, "10.0.0.5").unwrap();
        assert_eq!(
            dir.get_required(&record).unwrap().values("aRecord"),
            vec!["10.0.0.6".to_string()]
        );
        remove_forward(&dir, "pc1", FORWARD, "10.0.0.6").unwrap();
        assert!(!dir.exists(&record));

        let soa = dir.get_required(FORWARD).unwrap();
        assert!(soa.first("sOARecord").unwrap().contains(" 11 "));
    }

    #[test]
    fn test_zone_serial_wraps_at_32_bits() {
        let dir = zones();
        let soa = dir.get_required(FORWARD).unwrap().first("sOARecord").unwrap().to_string();
        dir.modify(
            FORWARD,
            &[Modification::new(
                "sOARecord",
                vec![soa],
                vec!["ns.example.com. root.example.com. 4294967295 28800 7200 604800 10800".to_string()],
            )],
        )
        .unwrap();

        bump_zone_serial(&dir, FORWARD).unwrap();

        let soa = dir.get_required(FORWARD).unwrap();
        assert!(soa.first("sOARecord").unwrap().contains(" 0 28800 "));
    }

    #[test]
    fn test_reverse_records() {
        let dir = zones();
        assert!(add_reverse(&dir, "pc1.example.com", REVERSE, "10.0.0.5").unwrap());
        let record = format!("relativeDomainName=5.0,{}", REVERSE);
        assert_eq!(
            dir.get_required(&record).unwrap().values("pTRRecord"),
            vec!["pc1.example.com.".to_string()]
        );
        assert!(!add_reverse(&dir, "pc1.example.com", REVERSE, "192.168.0.1").unwrap());
        remove_reverse(&dir, "pc1", REVERSE, "10.0.0.5").unwrap();
        assert!(!dir.exists(&record));
    }

    #[test]
    fn test_alias_collision() {
        let dir = zones();
        add_alias(&dir, "pc1", FORWARD, FORWARD, "www").unwrap();
        add_alias(&dir, "pc1", FORWARD, FORWARD, "www").unwrap();
        let err = add_alias(&dir, "pc2", FORWARD, FORWARD, "www").unwrap_err();
        assert!(matches!(err, UdmError::DnsAliasAlreadyUsed(_)));
        remove_alias(&dir, "pc2", FORWARD, "www").unwrap();
        assert!(dir.exists(&format!("relativeDomainName=www,{}", FORWARD)));
        remove_alias(&dir, "pc1", FORWARD, "www").unwrap();
        assert!(!dir.exists(&format!("relativeDomainName=www,{}", FORWARD)));
    }

    #[test]
    fn test_rename_host() {
        let dir = zones();
        add_forward(&dir, "pc1", FORWARD, "10.0.0.5").unwrap();
        add_reverse(&dir, "pc1.example.com", REVERSE, "10.0.0.5").unwrap();
        add_alias(&dir, "pc1", FORWARD, FORWARD, "www").unwrap();
        rename_host(&dir, "pc1", "pc2", &[FORWARD.to_string()]).unwrap();

        assert!(dir.exists(&format!("relativeDomainName=pc2,{}", FORWARD)));
        let ptr = dir
            .get_required(&format!("relativeDomainName=5.0,{}", REVERSE))
            .unwrap();
        assert_eq!(ptr.values("pTRRecord"), vec!["pc2.example.com.".to_string()]);
        let alias = dir
            .get_required(&format!("relativeDomainName=www,{}", FORWARD))
            .unwrap();
        assert_eq!(alias.values("cNAMERecord"), vec!["pc2.example.com.".to_string()]);
    }
}
