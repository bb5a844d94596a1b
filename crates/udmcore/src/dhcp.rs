//! DHCP host entries kept in sync with a computer's MAC and IP addresses.
//!
//! Host entries are found by hardware address. A new entry is named after
//! the computer; when that name is taken below the service, the first free
//! `name_uvN` is used.

use crate::directory::{Attributes, DirectoryClient, Filter, Modification, Scope};
use crate::dn;
use crate::error::Result;
use tracing::debug;

/// `dhcpHWAddress` value for a MAC.
pub fn hardware_address(mac: &str) -> String {
    format!("ethernet {}", mac)
}

fn host_filter(mac: &str) -> Filter {
    Filter::and(vec![
        Filter::eq("objectClass", "univentionDhcpHost"),
        Filter::eq("dhcpHWAddress", hardware_address(mac)),
    ])
}

/// Host entries anywhere below `base` carrying `mac`.
pub fn find_hosts(
    directory: &dyn DirectoryClient,
    base: &str,
    mac: &str,
) -> Result<Vec<(String, Attributes)>> {
    Ok(directory.search(base, Scope::Sub, &host_filter(mac), &[])?)
}

/// First of `name`, `name_uv1`, `name_uv2`, ... not used below `service_dn`.
pub fn unique_host_name(
    directory: &dyn DirectoryClient,
    service_dn: &str,
    name: &str,
) -> Result<String> {
    let taken: Vec<String> = directory
        .search(service_dn, Scope::Sub, &Filter::prefix("cn", name), &["cn"])?
        .into_iter()
        .filter_map(|(_, attrs)| attrs.first("cn").map(str::to_lowercase))
        .collect();
    if !taken.contains(&name.to_lowercase()) {
        return Ok(name.to_string());
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_uv{}", name, n);
        if !taken.contains(&candidate.to_lowercase()) {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Make sure a host entry for `mac` exists below `service_dn` and carries
/// `ip` as a fixed address.
pub fn upsert_host(
    directory: &dyn DirectoryClient,
    service_dn: &str,
    name: &str,
    mac: &str,
    ip: &str,
) -> Result<()> {
    let existing = find_hosts(directory, service_dn, mac)?;
    if existing.is_empty() {
        let cn = unique_host_name(directory, service_dn, name)?;
        let host = dn::compose("cn", &cn, service_dn);
        let mut attrs: Attributes = vec![
            ("objectClass", vec!["top".into(), "univentionObject".into(), "univentionDhcpHost".into()]),
            ("univentionObjectType", vec!["dhcp/host".into()]),
            ("cn", vec![cn]),
            ("dhcpHWAddress", vec![hardware_address(mac)]),
        ]
        .into_iter()
        .collect();
        if !ip.is_empty() {
            attrs.set("univentionDhcpFixedAddress", vec![ip.to_string()]);
        }
        directory.add(&host, &attrs)?;
        debug!(host = %host, mac, ip, "created DHCP host");
        return Ok(());
    }
    if ip.is_empty() {
        return Ok(());
    }
    for (host, attrs) in existing {
        if !attrs.has_value("univentionDhcpFixedAddress", ip) {
            directory.modify(
                &host,
                &[Modification::add("univentionDhcpFixedAddress", vec![ip.to_string()])],
            )?;
            debug!(host = %host, ip, "added fixed address");
        }
    }
    Ok(())
}

/// Drop `ip` from the host entries of `mac`; an entry goes when it has no
/// address left or when `ip` is empty.
pub fn remove_host(directory: &dyn DirectoryClient, mac: &str, ip: &str) -> Result<()> {
    for (host, attrs) in find_hosts(directory, &directory.base(), mac)? {
        let fixed = attrs.values("univentionDhcpFixedAddress");
        if ip.is_empty() {
            directory.delete(&host)?;
        } else if fixed.iter().any(|f| f == ip) {
            if fixed.len() > 1 {
                directory.modify(
                    &host,
                    &[Modification::new("univentionDhcpFixedAddress", vec![ip.to_string()], vec![])],
                )?;
            } else {
                directory.delete(&host)?;
            }
        } else {
            continue;
        }
        debug!(host = %host, mac, ip, "removed DHCP address");
    }
    Ok(())
}

/// Rename the host entries of the given MACs that are named after
/// `old_name`.
pub fn rename_hosts(
    directory: &dyn DirectoryClient,
    macs: &[String],
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    for mac in macs {
        for (host, _) in find_hosts(directory, &directory.base(), mac)? {
            if !dn::rdn_value(&host).eq_ignore_ascii_case(old_name) {
                continue;
            }
            let Some(service) = dn::parent(&host) else {
                continue;
            };
            let cn = unique_host_name(directory, &service, new_name)?;
            directory.rename(&host, &dn::compose("cn", &cn, &service))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemDirectory;

    const SERVICE: &str = "cn=dhcp,dc=example,dc=com";

    fn directory() -> MemDirectory {
        let dir = MemDirectory::new("dc=example,dc=com");
        dir.seed(
            SERVICE,
            vec![("objectClass", vec!["dhcpService".to_string()]), ("cn", vec!["dhcp".to_string()])]
                .into_iter()
                .collect(),
        );
        dir
    }

    #[test]
    fn test_upsert_creates_then_extends() {
        let dir = directory();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:ff", "10.0.0.5").unwrap();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:ff", "10.0.0.6").unwrap();
        let host = dir.get_required("cn=pc1,cn=dhcp,dc=example,dc=com").unwrap();
        assert_eq!(host.values("dhcpHWAddress"), vec!["ethernet aa:bb:cc:dd:ee:ff".to_string()]);
        assert_eq!(host.values("univentionDhcpFixedAddress").len(), 2);
    }

    #[test]
    fn test_taken_names_get_uv_suffix() {
        let dir = directory();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:01", "").unwrap();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:02", "").unwrap();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:03", "").unwrap();
        assert!(dir.exists("cn=pc1_uv1,cn=dhcp,dc=example,dc=com"));
        assert!(dir.exists("cn=pc1_uv2,cn=dhcp,dc=example,dc=com"));
    }

    #[test]
    fn test_remove_host_keeps_other_addresses() {
        let dir = directory();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:ff", "10.0.0.5").unwrap();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:ff", "10.0.0.6").unwrap();
        remove_host(&dir, "aa:bb:cc:dd:ee:ff", "10.0.0.5").unwrap();
        let host = dir.get_required("cn=pc1,cn=dhcp,dc=example,dc=com").unwrap();
        assert_eq!(host.values("univentionDhcpFixedAddress"), vec!["10.0.0.6".to_string()]);
        remove_host(&dir, "aa:bb:cc:dd:ee:ff", "10.0.0.6").unwrap();
        assert!(!dir.exists("cn=pc1,cn=dhcp,dc=example,dc=com"));
    }

    #[test]
    fn test_rename_hosts() {
        let dir = directory();
        upsert_host(&dir, SERVICE, "pc1", "aa:bb:cc:dd:ee:ff", "10.0.0.5").unwrap();
        rename_hosts(&dir, &["aa:bb:cc:dd:ee:ff".to_string()], "pc1", "pc2").unwrap();
        assert!(dir.exists("cn=pc2,cn=dhcp,dc=example,dc=com"));
        assert!(!dir.exists("cn=pc1,cn=dhcp,dc=example,dc=com"));
    }
}
