//! Group membership maintained on the group entries.
//!
//! A member is listed by DN in `uniqueMember` and, for accounts, by login
//! name in `memberUid`.

use crate::directory::{DirectoryClient, Filter, Modification, Scope};
use crate::error::Result;
use tracing::debug;

fn member_filter(member_dn: &str) -> Filter {
    Filter::and(vec![
        Filter::eq("objectClass", "univentionGroup"),
        Filter::eq("uniqueMember", member_dn),
    ])
}

/// DNs of every group listing `member_dn`.
pub fn groups_of(directory: &dyn DirectoryClient, member_dn: &str) -> Result<Vec<String>> {
    Ok(directory.search_dn(&directory.base(), Scope::Sub, &member_filter(member_dn))?)
}

pub fn add_member(
    directory: &dyn DirectoryClient,
    group_dn: &str,
    member_dn: &str,
    uid: Option<&str>,
) -> Result<()> {
    let group = directory.get_required(group_dn)?;
    let mut modlist = Vec::new();
    if !group.has_value("uniqueMember", member_dn) {
        modlist.push(Modification::add("uniqueMember", vec![member_dn.to_string()]));
    }
    if let Some(uid) = uid {
        if !group.has_value("memberUid", uid) {
            modlist.push(Modification::add("memberUid", vec![uid.to_string()]));
        }
    }
    if !modlist.is_empty() {
        directory.modify(group_dn, &modlist)?;
        debug!(group = %group_dn, member = %member_dn, "added group member");
    }
    Ok(())
}

pub fn remove_member(
    directory: &dyn DirectoryClient,
    group_dn: &str,
    member_dn: &str,
    uid: Option<&str>,
) -> Result<()> {
    let Some(group) = directory.get(group_dn)? else {
        return Ok(());
    };
    let mut modlist = Vec::new();
    let listed: Vec<String> = group
        .values("uniqueMember")
        .into_iter()
        .filter(|m| crate::dn::compare(m, member_dn))
        .collect();
    if !listed.is_empty() {
        modlist.push(Modification::new("uniqueMember", listed, vec![]));
    }
    if let Some(uid) = uid {
        let listed: Vec<String> = group
            .values("memberUid")
            .into_iter()
            .filter(|m| m.eq_ignore_ascii_case(uid))
            .collect();
        if !listed.is_empty() {
            modlist.push(Modification::new("memberUid", listed, vec![]));
        }
    }
    if !modlist.is_empty() {
        directory.modify(group_dn, &modlist)?;
        debug!(group = %group_dn, member = %member_dn, "removed group member");
    }
    Ok(())
}

/// Rewrite every membership of `old_dn` to `new_dn`, and the login name
/// when one is given.
pub fn rename_member(
    directory: &dyn DirectoryClient,
    old_dn: &str,
    new_dn: &str,
    uids: Option<(&str, &str)>,
) -> Result<()> {
    for group_dn in groups_of(directory, old_dn)? {
        let group = directory.get_required(&group_dn)?;
        let old_members: Vec<String> = group
            .values("uniqueMember")
            .into_iter()
            .filter(|m| crate::dn::compare(m, old_dn))
            .collect();
        let mut modlist = vec![
            Modification::new("uniqueMember", old_members, vec![]),
            Modification::add("uniqueMember", vec![new_dn.to_string()]),
        ];
        if let Some((old_uid, new_uid)) = uids {
            if group.has_value("memberUid", old_uid) {
                modlist.push(Modification::new("memberUid", vec![old_uid.to_string()], vec![]));
                modlist.push(Modification::add("memberUid", vec![new_uid.to_string()]));
            }
        }
        directory.modify(&group_dn, &modlist)?;
        debug!(group = %group_dn, from = %old_dn, to = %new_dn, "renamed group member");
    }
    Ok(())
}

/// Replace the login name of `member_dn` in every group listing it.
pub fn rename_uid(
    directory: &dyn DirectoryClient,
    member_dn: &str,
    old_uid: &str,
    new_uid: &str,
) -> Result<()> {
    for group_dn in groups_of(directory, member_dn)? {
        let group = directory.get_required(&group_dn)?;
        let listed: Vec<String> = group
            .values("memberUid")
            .into_iter()
            .filter(|m| m.eq_ignore_ascii_case(old_uid))
            .collect();
        if listed.is_empty() {
            continue;
        }
        let mut modlist = vec![Modification::new("memberUid", listed, vec![])];
        if !group.has_value("memberUid", new_uid) {
            modlist.push(Modification::add("memberUid", vec![new_uid.to_string()]));
        }
        directory.modify(&group_dn, &modlist)?;
    }
    Ok(())
}
