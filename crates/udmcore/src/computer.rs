//! # Computers
//!
//! Computer objects keep a set of dependent entries in step with their own
//! properties:
//!
//! - **DNS**: host records (`dnsEntryZoneForward`, `[zone, ip]`), pointer
//!   records (`dnsEntryZoneReverse`, `[zone, ip]`) and aliases
//!   (`dnsEntryZoneAlias`, `[zone, alias zone, alias]`).
//! - **DHCP**: host entries (`dhcpEntryZone`, `[service, ip, mac]`).
//! - **Groups**: `uniqueMember` and `memberUid` on every group in `groups`.
//! - **Accounts**: the `uid`, `uidNumber`, SID and Kerberos principal of
//!   the posix, samba and kerberos options.
//!
//! None of these collections is stored on the computer entry. `open`
//! reconstructs them by searching the directory; writes compare them with
//! the snapshot and apply the difference.
//!
//! With one MAC and at most one IP the object is in simple mode: changing
//! the address rewrites the DHCP and DNS entries to match. With more, only
//! entries whose address was removed are dropped.

use crate::allocator::ResourceKind;
use crate::dhcp;
use crate::directory::{Filter, Modification, Scope};
use crate::dn;
use crate::dns;
use crate::error::{Result, UdmError};
use crate::groups;
use crate::object::DirectoryObject;
use crate::value::Value;
use std::net::IpAddr;
use tracing::debug;

pub const FORWARD: &str = "dnsEntryZoneForward";
pub const REVERSE: &str = "dnsEntryZoneReverse";
pub const ALIAS: &str = "dnsEntryZoneAlias";
pub const DHCP: &str = "dhcpEntryZone";

/// Properties whose values live in other entries, not on the computer.
pub const DEPENDENT_PROPERTIES: &[&str] = &[FORWARD, REVERSE, ALIAS, DHCP, "groups"];

/// Upper bound for host name plus zone name (one DNS label).
const MAX_COMMON_NAME: usize = 63;

const SAMBA_ACCOUNT_FLAGS: &str = "[W          ]";

#[derive(Debug, Clone, Default)]
pub struct ComputerState {
    /// More than one MAC or IP; DHCP and DNS entries are not inferred.
    pub multi_ip: bool,
}

fn name(object: &DirectoryObject) -> String {
    object.info("name").as_text().unwrap_or_default().to_string()
}

fn old_name(object: &DirectoryObject) -> String {
    object.old_info("name").as_text().unwrap_or_default().to_string()
}

fn account_uid(name: &str) -> String {
    format!("{}$", name)
}

fn has_account(object: &DirectoryObject) -> bool {
    object.has_option("posix") || object.has_option("samba")
}

/// `name.domain`, or the bare name without a domain.
pub fn fqdn(object: &DirectoryObject) -> Value {
    let name = name(object);
    if name.is_empty() {
        return Value::None;
    }
    match object.info("domain").as_text() {
        Some(domain) if !domain.is_empty() => Value::text(format!("{}.{}", name, domain)),
        _ => Value::text(name),
    }
}

/// Default primary group: `cn=Windows Hosts,cn=groups,<base>` if present.
pub fn default_primary_group(object: &DirectoryObject) -> Value {
    let directory = &object.context().directory;
    let candidate = format!("cn=Windows Hosts,cn=groups,{}", directory.base());
    match directory.get(&candidate) {
        Ok(Some(_)) => Value::text(candidate),
        _ => Value::None,
    }
}

fn normalize_ip(raw: &str) -> String {
    raw.parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn split_addresses(ips: &[String]) -> (Vec<String>, Vec<String>) {
    ips.iter().cloned().partition(|ip| !ip.contains(':'))
}

fn set_tuples(object: &mut DirectoryObject, property: &str, mut entries: Vec<Vec<String>>) {
    entries.dedup();
    if entries.is_empty() {
        object.info.remove(property);
    } else {
        object.info.insert(property.to_string(), Value::Tuples(entries));
    }
}

/// Entries only in the snapshot, entries only in the current value.
fn tuple_changes(object: &DirectoryObject, property: &str) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let old = object.old_info(property).as_tuples();
    let new = object.info(property).as_tuples();
    let removed = old.iter().filter(|e| !new.contains(e)).cloned().collect();
    let added = new.iter().filter(|e| !old.contains(e)).cloned().collect();
    (removed, added)
}

fn reserve(object: &mut DirectoryObject, kind: ResourceKind, value: Option<&str>) -> Result<String> {
    let reserved = object
        .ctx
        .allocator
        .request(kind, value)
        .map_err(|e| match (kind, e) {
            (ResourceKind::MacAddress, UdmError::NoLockAvailable { value, .. }) => {
                UdmError::MacAlreadyUsed(value)
            }
            (ResourceKind::IpAddress, UdmError::NoLockAvailable { value, .. }) => {
                UdmError::IpAlreadyUsed(value)
            }
            (_, e) => e,
        })?;
    object.ledger.record(kind, reserved.clone());
    Ok(reserved)
}

fn release(object: &mut DirectoryObject, kind: ResourceKind, value: &str) {
    if let Err(e) = object.ctx.allocator.release(kind, value) {
        object.warn(format!("could not release {} {}: {}", kind, value, e));
    }
}

/// IP addresses from the address records and the primary group from
/// `gidNumber` of a freshly read entry.
pub(crate) fn post_load(object: &mut DirectoryObject) -> Result<()> {
    let mut ips: Vec<String> = object
        .old_attrs
        .values("aRecord")
        .iter()
        .map(|ip| normalize_ip(ip))
        .collect();
    ips.extend(object.old_attrs.values("aAAARecord").iter().map(|ip| normalize_ip(ip)));
    if !ips.is_empty() {
        object.info.insert("ip".to_string(), Value::List(ips));
    }

    if let Some(gid) = object.old_attrs.first("gidNumber").map(str::to_string) {
        let directory = object.ctx.directory.clone();
        let filter = Filter::and(vec![
            Filter::eq("objectClass", "posixGroup"),
            Filter::eq("gidNumber", gid),
        ]);
        if let Some(group) = directory
            .search_dn(&directory.base(), Scope::Sub, &filter)?
            .into_iter()
            .next()
        {
            object.info.insert("primaryGroup".to_string(), Value::text(group));
        }
    }
    Ok(())
}

/// Reconstruct DNS, DHCP and group collections from the directory.
pub(crate) fn open(object: &mut DirectoryObject) -> Result<()> {
    let name = name(object);
    if name.is_empty() {
        return Ok(());
    }
    let directory = object.ctx.directory.clone();
    let base = directory.base();
    let dn = object.require_dn()?;
    let macs = object.info("mac").as_list();
    let ips = object.info("ip").as_list();
    if let Some(state) = object.computer_state_mut() {
        state.multi_ip = macs.len() > 1 || ips.len() > 1;
    }

    let mut forward = Vec::new();
    let host_filter = Filter::and(vec![
        Filter::eq("objectClass", "dNSZone"),
        Filter::eq("relativeDomainName", &name),
        Filter::negate(Filter::present("cNAMERecord")),
    ]);
    for (record, attrs) in directory.search(&base, Scope::Sub, &host_filter, &[])? {
        let Some(zone) = dn::parent(&record) else {
            continue;
        };
        let mut addresses = attrs.values("aRecord");
        addresses.extend(attrs.values("aAAARecord"));
        for ip in addresses {
            forward.push(vec![zone.clone(), normalize_ip(&ip)]);
        }
    }

    let mut reverse = Vec::new();
    let ptr_filter = Filter::and(vec![
        Filter::eq("objectClass", "dNSZone"),
        Filter::or(vec![
            Filter::eq("pTRRecord", &name),
            Filter::prefix("pTRRecord", format!("{}.", name)),
        ]),
    ]);
    for (record, attrs) in directory.search(&base, Scope::Sub, &ptr_filter, &[])? {
        let Some(zone) = dn::parent(&record) else {
            continue;
        };
        let zone_name = attrs
            .first("zoneName")
            .map(str::to_string)
            .unwrap_or_else(|| dn::rdn_value(&zone));
        let relative = attrs.first("relativeDomainName").unwrap_or_default();
        if let Some(ip) = dns::ip_from_ptr(&zone_name, relative) {
            reverse.push(vec![zone, ip]);
        }
    }

    let mut aliases = Vec::new();
    let mut zones: Vec<String> = forward.iter().map(|e| e[0].clone()).collect();
    zones.dedup();
    for zone in &zones {
        let target = format!("{}.{}.", name, dns::zone_name(directory.as_ref(), zone)?);
        let alias_filter = Filter::and(vec![
            Filter::eq("objectClass", "dNSZone"),
            Filter::eq("cNAMERecord", target),
        ]);
        for (record, attrs) in directory.search(&base, Scope::Sub, &alias_filter, &[])? {
            let Some(alias_zone) = dn::parent(&record) else {
                continue;
            };
            let alias = attrs
                .first("relativeDomainName")
                .map(str::to_string)
                .unwrap_or_else(|| dn::rdn_value(&record));
            aliases.push(vec![zone.clone(), alias_zone, alias]);
        }
    }

    let mut dhcp_entries = Vec::new();
    for mac in &macs {
        for (host, attrs) in dhcp::find_hosts(directory.as_ref(), &base, mac)? {
            let Some(service) = dn::parent(&host) else {
                continue;
            };
            let fixed = attrs.values("univentionDhcpFixedAddress");
            if fixed.is_empty() {
                dhcp_entries.push(vec![service.clone(), String::new(), mac.clone()]);
            }
            for ip in fixed {
                dhcp_entries.push(vec![service.clone(), ip, mac.clone()]);
            }
        }
    }

    let member_of = groups::groups_of(directory.as_ref(), &dn)?;

    set_tuples(object, FORWARD, forward);
    set_tuples(object, REVERSE, reverse);
    set_tuples(object, ALIAS, aliases);
    set_tuples(object, DHCP, dhcp_entries);
    if !member_of.is_empty() {
        object.info.insert("groups".to_string(), Value::List(member_of));
    }
    debug!(dn = %dn, "opened computer");
    Ok(())
}

/// Checks shared by create and modify.
pub(crate) fn pre_write(object: &mut DirectoryObject) -> Result<()> {
    let name = name(object);
    if name.is_empty() {
        return Ok(());
    }
    let directory = object.ctx.directory.clone();
    for entry in object.info(FORWARD).as_tuples() {
        let Some(zone) = entry.first() else {
            continue;
        };
        let zone_name = dns::zone_name(directory.as_ref(), zone)?;
        if zone_name.len() + name.len() >= MAX_COMMON_NAME {
            return Err(UdmError::CommonNameTooLong(format!("{}.{}", name, zone_name)));
        }
    }
    Ok(())
}

fn primary_gid(object: &mut DirectoryObject) -> Result<String> {
    let group = object.get("primaryGroup")?;
    let group = group
        .as_text()
        .ok_or_else(|| UdmError::RequiredValue("primaryGroup".to_string()))?;
    object
        .ctx
        .directory
        .get(group)?
        .and_then(|attrs| attrs.first("gidNumber").map(str::to_string))
        .ok_or_else(|| UdmError::syntax("primaryGroup", format!("{} has no gidNumber", group)))
}

fn kerberos_principal(object: &DirectoryObject) -> String {
    let fqdn = fqdn(object);
    object
        .ctx
        .config
        .host_principal(fqdn.as_text().unwrap_or_default())
}

/// Account attributes implied by the enabled options, compared with what
/// the entry holds.
fn account_modlist(object: &mut DirectoryObject) -> Result<Vec<Modification>> {
    let mut modlist = Vec::new();
    let name = name(object);
    let old = object.old_attrs.clone();
    let posix = object.has_option("posix");
    let samba = object.has_option("samba");
    let kerberos = object.has_option("kerberos");

    let uid = account_uid(&name);
    match (has_account(object), old.first("uid")) {
        (true, None) => {
            reserve(object, ResourceKind::Uid, Some(&uid))?;
            modlist.push(Modification::add("uid", vec![uid.clone()]));
        }
        (true, Some(current)) if current != uid => {
            reserve(object, ResourceKind::Uid, Some(&uid))?;
            modlist.push(Modification::new("uid", vec![current.to_string()], vec![uid.clone()]));
        }
        (false, Some(current)) => {
            modlist.push(Modification::new("uid", vec![current.to_string()], vec![]));
        }
        _ => {}
    }

    let mut uid_number = old.first("uidNumber").map(str::to_string);
    if posix && uid_number.is_none() {
        let allocated = reserve(object, ResourceKind::UidNumber, None)?;
        let gid = primary_gid(object)?;
        modlist.push(Modification::add("uidNumber", vec![allocated.clone()]));
        modlist.push(Modification::add("gidNumber", vec![gid]));
        uid_number = Some(allocated);
    } else if posix && object.exists && object.has_changed("primaryGroup") {
        let gid = primary_gid(object)?;
        modlist.push(Modification::new("gidNumber", old.values("gidNumber"), vec![gid]));
    } else if !posix && uid_number.is_some() {
        modlist.push(Modification::new("uidNumber", old.values("uidNumber"), vec![]));
        modlist.push(Modification::new("gidNumber", old.values("gidNumber"), vec![]));
    }

    if samba && !old.contains("sambaSID") {
        let number = match uid_number {
            Some(n) => n,
            None => reserve(object, ResourceKind::UidNumber, None)?,
        };
        let sid = if object.ctx.config.s4connector_present {
            format!("S-1-4-{}", number)
        } else {
            let rid = number.parse::<u64>().unwrap_or(0) * 2 + 1000;
            let candidate = format!("{}-{}", object.ctx.config.domain_sid, rid);
            reserve(object, ResourceKind::Sid, Some(&candidate))?
        };
        modlist.push(Modification::add("sambaSID", vec![sid]));
        modlist.push(Modification::add("sambaAcctFlags", vec![SAMBA_ACCOUNT_FLAGS.to_string()]));
    } else if !samba && old.contains("sambaSID") {
        for attr in ["sambaSID", "sambaAcctFlags"] {
            if old.contains(attr) {
                modlist.push(Modification::new(attr, old.values(attr), vec![]));
            }
        }
    }

    let principal = kerberos_principal(object);
    match (kerberos, old.first("krb5PrincipalName")) {
        (true, None) => {
            modlist.push(Modification::add("krb5PrincipalName", vec![principal]));
            modlist.push(Modification::add("krb5MaxLife", vec!["86400".to_string()]));
            modlist.push(Modification::add("krb5MaxRenew", vec!["604800".to_string()]));
            modlist.push(Modification::add("krb5KDCFlags", vec!["126".to_string()]));
            modlist.push(Modification::add("krb5KeyVersionNumber", vec!["1".to_string()]));
        }
        (true, Some(current)) if current != principal => {
            modlist.push(Modification::new(
                "krb5PrincipalName",
                vec![current.to_string()],
                vec![principal],
            ));
        }
        (false, Some(_)) => {
            for attr in [
                "krb5PrincipalName",
                "krb5MaxLife",
                "krb5MaxRenew",
                "krb5KDCFlags",
                "krb5KeyVersionNumber",
                "krb5Key",
            ] {
                if old.contains(attr) {
                    modlist.push(Modification::new(attr, old.values(attr), vec![]));
                }
            }
        }
        _ => {}
    }
    Ok(modlist)
}

/// Keep DHCP and DNS entries consistent with changed addresses.
fn infer_entries(object: &mut DirectoryObject) {
    let old_ips = object.old_info("ip").as_list();
    let new_ips = object.info("ip").as_list();
    let old_macs = object.old_info("mac").as_list();
    let new_macs = object.info("mac").as_list();

    let mut dhcp_entries = object.info(DHCP).as_tuples();
    if new_ips.len() <= 1 && new_macs.len() == 1 && !dhcp_entries.is_empty() {
        let ip = new_ips.first().cloned().unwrap_or_default();
        for entry in dhcp_entries.iter_mut() {
            let service = entry.first().cloned().unwrap_or_default();
            *entry = vec![service, ip.clone(), new_macs[0].clone()];
        }
    } else {
        dhcp_entries.retain(|entry| {
            let ip_gone = entry.get(1).map(|ip| !ip.is_empty() && old_ips.contains(ip) && !new_ips.contains(ip));
            let mac_gone = entry.get(2).map(|mac| old_macs.contains(mac) && !new_macs.contains(mac));
            !(ip_gone.unwrap_or(false) || mac_gone.unwrap_or(false))
        });
    }
    set_tuples(object, DHCP, dhcp_entries);

    if old_ips.len() != 1 || new_ips.len() != 1 || old_ips == new_ips {
        return;
    }
    let (old_ip, new_ip) = (&old_ips[0], &new_ips[0]);
    let forward: Vec<Vec<String>> = object
        .info(FORWARD)
        .as_tuples()
        .into_iter()
        .map(|entry| match entry.get(1) {
            Some(ip) if ip == old_ip => vec![entry[0].clone(), new_ip.clone()],
            _ => entry,
        })
        .collect();
    set_tuples(object, FORWARD, forward);

    let mut reverse = Vec::new();
    for entry in object.info(REVERSE).as_tuples() {
        match entry.get(1) {
            Some(ip) if ip == old_ip => {
                if dns::calc_reverse_entry_name(new_ip, &entry[0]).is_some() {
                    reverse.push(vec![entry[0].clone(), new_ip.clone()]);
                } else {
                    object.warn(format!("{} is not inside reverse zone {}", new_ip, entry[0]));
                }
            }
            _ => reverse.push(entry),
        }
    }
    set_tuples(object, REVERSE, reverse);
}

fn validate_entries(object: &DirectoryObject) -> Result<()> {
    for entry in object.info(DHCP).as_tuples() {
        let complete = entry.len() == 3 && !entry[0].is_empty() && !entry[2].is_empty();
        if !complete {
            return Err(UdmError::InvalidDhcpEntry(entry.join(", ")));
        }
    }
    for entry in object.info(ALIAS).as_tuples() {
        if entry.len() != 3 || entry.iter().any(|part| part.is_empty()) {
            return Err(UdmError::InvalidDnsAliasEntry(entry.join(", ")));
        }
    }
    Ok(())
}

/// Computer modlist: reservations, address records, account attributes,
/// then the generic property diff.
pub(crate) fn modlist(object: &mut DirectoryObject) -> Result<Vec<Modification>> {
    let mut modlist = Vec::new();
    let old_macs = object.old_info("mac").as_list();
    let new_macs = object.info("mac").as_list();
    let old_ips = object.old_info("ip").as_list();
    let new_ips = object.info("ip").as_list();

    if object.has_changed("mac") {
        for mac in new_macs.iter().filter(|m| !old_macs.contains(m)) {
            reserve(object, ResourceKind::MacAddress, Some(mac))?;
        }
    }
    if object.has_changed("ip") {
        for ip in new_ips.iter().filter(|ip| !old_ips.contains(ip)) {
            reserve(object, ResourceKind::IpAddress, Some(ip))?;
        }
        let (old_v4, old_v6) = split_addresses(&old_ips);
        let (new_v4, new_v6) = split_addresses(&new_ips);
        if old_v4 != new_v4 {
            modlist.push(Modification::new("aRecord", old_v4, new_v4));
        }
        if old_v6 != new_v6 {
            modlist.push(Modification::new("aAAARecord", old_v6, new_v6));
        }
    }
    if object.has_changed("name") {
        let old = object.old_info("name").as_list();
        let new = object.info("name").as_list();
        modlist.push(Modification::new("sn", old, new));
    }
    modlist.extend(account_modlist(object)?);

    if object.has_changed("ip") || object.has_changed("mac") {
        infer_entries(object);
    }
    validate_entries(object)?;
    if let Some(state) = object.computer_state_mut() {
        state.multi_ip = new_macs.len() > 1 || new_ips.len() > 1;
    }

    modlist.extend(object.base_modlist());
    Ok(modlist)
}

/// Name for pointer records: the FQDN, or the name in the first forward
/// zone when no domain is set.
fn pointer_target(object: &DirectoryObject) -> Result<String> {
    let name = name(object);
    if let Some(domain) = object.info("domain").as_text() {
        return Ok(format!("{}.{}", name, domain));
    }
    if let Some(zone) = object.info(FORWARD).as_tuples().first().and_then(|e| e.first().cloned()) {
        let zone_name = dns::zone_name(object.ctx.directory.as_ref(), &zone)?;
        return Ok(format!("{}.{}", name, zone_name));
    }
    Ok(name)
}

/// Apply the difference of every dependent collection after the entry
/// itself was written.
pub(crate) fn post_write(object: &mut DirectoryObject) -> Result<()> {
    let directory = object.ctx.directory.clone();
    let directory = directory.as_ref();
    let name = name(object);
    let old_name = old_name(object);
    let dn = object.require_dn()?;
    let current_ips = object.info("ip").as_list();
    let previous_ips = object.old_info("ip").as_list();

    let old_macs = object.old_info("mac").as_list();
    let new_macs = object.info("mac").as_list();
    for mac in old_macs.iter().filter(|m| !new_macs.contains(m)) {
        release(object, ResourceKind::MacAddress, mac);
    }
    for ip in previous_ips.iter().filter(|ip| !current_ips.contains(ip)) {
        release(object, ResourceKind::IpAddress, ip);
    }

    if !old_name.is_empty() && old_name != name {
        let zones: Vec<String> = object
            .old_info(FORWARD)
            .as_tuples()
            .into_iter()
            .filter_map(|e| e.first().cloned())
            .collect();
        dns::rename_host(directory, &old_name, &name, &zones)?;
        dhcp::rename_hosts(directory, &object.old_info("mac").as_list(), &old_name, &name)?;
        if has_account(object) {
            groups::rename_uid(directory, &dn, &account_uid(&old_name), &account_uid(&name))?;
        }
    }

    let (removed, added) = tuple_changes(object, DHCP);
    for entry in removed {
        if let (Some(ip), Some(mac)) = (entry.get(1), entry.get(2)) {
            dhcp::remove_host(directory, mac, ip)?;
        }
    }
    for entry in added {
        if let [service, ip, mac] = entry.as_slice() {
            dhcp::upsert_host(directory, service, &name, mac, ip)?;
        }
    }

    let (removed, added) = tuple_changes(object, FORWARD);
    for entry in removed {
        let ips = entry.get(1).map(|ip| vec![ip.clone()]).unwrap_or_else(|| previous_ips.clone());
        for ip in ips {
            dns::remove_forward(directory, &name, &entry[0], &ip)?;
        }
    }
    for entry in added {
        let ips = entry.get(1).map(|ip| vec![ip.clone()]).unwrap_or_else(|| current_ips.clone());
        for ip in ips {
            dns::add_forward(directory, &name, &entry[0], &ip)?;
        }
    }

    let target = pointer_target(object)?;
    let (removed, added) = tuple_changes(object, REVERSE);
    for entry in removed {
        if let Some(ip) = entry.get(1) {
            dns::remove_reverse(directory, &name, &entry[0], ip)?;
        }
    }
    for entry in added {
        let ips = entry.get(1).map(|ip| vec![ip.clone()]).unwrap_or_else(|| current_ips.clone());
        for ip in ips {
            if !dns::add_reverse(directory, &target, &entry[0], &ip)? {
                object.warn(format!("{} is not inside reverse zone {}", ip, entry[0]));
            }
        }
    }

    let (removed, added) = tuple_changes(object, ALIAS);
    for entry in removed {
        if let [_, alias_zone, alias] = entry.as_slice() {
            dns::remove_alias(directory, &name, alias_zone, alias)?;
        }
    }
    for entry in added {
        if let [zone, alias_zone, alias] = entry.as_slice() {
            dns::add_alias(directory, &name, zone, alias_zone, alias)?;
        }
    }

    update_groups(object, &dn)
}

fn update_groups(object: &mut DirectoryObject, dn: &str) -> Result<()> {
    let directory = object.ctx.directory.clone();
    let uid = has_account(object).then(|| account_uid(&name(object)));
    let mut old = object.old_info("groups").as_list();
    let mut new = object.info("groups").as_list();
    if object.has_option("posix") {
        if let Some(primary) = object.old_info("primaryGroup").as_text() {
            old.push(primary.to_string());
        }
        if let Some(primary) = object.info("primaryGroup").as_text() {
            new.push(primary.to_string());
        }
    }
    let contains = |list: &[String], dn: &str| list.iter().any(|g| dn::compare(g, dn));

    for group in new.iter().filter(|g| !contains(&old, g)) {
        groups::add_member(directory.as_ref(), group, dn, uid.as_deref())?;
    }
    for group in old.iter().filter(|g| !contains(&new, g)) {
        groups::remove_member(directory.as_ref(), group, dn, uid.as_deref())?;
    }
    Ok(())
}

/// The uid number a SID was derived from. Without posix it is held only
/// through the SID.
fn sid_uid_number(object: &DirectoryObject, sid: &str) -> Option<String> {
    if let Some(number) = sid.strip_prefix("S-1-4-") {
        return Some(number.to_string());
    }
    let rid: u64 = sid
        .strip_prefix(object.ctx.config.domain_sid.as_str())?
        .strip_prefix('-')?
        .parse()
        .ok()?;
    (rid >= 1000 && rid % 2 == 0).then(|| ((rid - 1000) / 2).to_string())
}

/// Give back every identifier and leave every group.
pub(crate) fn post_remove(object: &mut DirectoryObject) -> Result<()> {
    let dn = object.require_dn()?;
    let name = name(object);
    for mac in object.old_info("mac").as_list() {
        release(object, ResourceKind::MacAddress, &mac);
    }
    for ip in object.old_info("ip").as_list() {
        release(object, ResourceKind::IpAddress, &ip);
    }
    let attrs = object.old_attrs.clone();
    if let Some(uid) = attrs.first("uid") {
        release(object, ResourceKind::Uid, uid);
    }
    if let Some(number) = attrs.first("uidNumber") {
        release(object, ResourceKind::UidNumber, number);
    }
    if let Some(sid) = attrs.first("sambaSID") {
        if !sid.starts_with("S-1-4-") {
            release(object, ResourceKind::Sid, sid);
        }
        if !attrs.contains("uidNumber") {
            if let Some(number) = sid_uid_number(object, sid) {
                release(object, ResourceKind::UidNumber, &number);
            }
        }
    }

    let directory = object.ctx.directory.clone();
    let uid = account_uid(&name);
    for group in groups::groups_of(directory.as_ref(), &dn)? {
        groups::remove_member(directory.as_ref(), &group, &dn, Some(&uid))?;
    }
    Ok(())
}

/// Remove the DNS and DHCP entries of a computer. Failures become
/// warnings.
pub(crate) fn cleanup(object: &mut DirectoryObject) {
    let directory = object.ctx.directory.clone();
    let directory = directory.as_ref();
    let name = name(object);
    let mut failures = Vec::new();

    for entry in object.info(FORWARD).as_tuples() {
        let ip = entry.get(1).cloned().unwrap_or_default();
        if let Err(e) = dns::remove_forward(directory, &name, &entry[0], &ip) {
            failures.push(format!("forward record in {}: {}", entry[0], e));
        }
    }
    for entry in object.info(REVERSE).as_tuples() {
        if let Some(ip) = entry.get(1) {
            if let Err(e) = dns::remove_reverse(directory, &name, &entry[0], ip) {
                failures.push(format!("pointer record in {}: {}", entry[0], e));
            }
        }
    }
    for entry in object.info(ALIAS).as_tuples() {
        if let [_, alias_zone, alias] = entry.as_slice() {
            if let Err(e) = dns::remove_alias(directory, &name, alias_zone, alias) {
                failures.push(format!("alias {}: {}", alias, e));
            }
        }
    }
    for entry in object.info(DHCP).as_tuples() {
        if let Some(mac) = entry.get(2).filter(|m| !m.is_empty()) {
            if let Err(e) = dhcp::remove_host(directory, mac, "") {
                failures.push(format!("DHCP host for {}: {}", mac, e));
            }
        }
    }
    for failure in failures {
        object.warn(format!("cleanup failed for {}", failure));
    }
}
