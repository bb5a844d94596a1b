//! External resource allocation.
//!
//! Identifiers that must be unique across the domain (uid numbers, SIDs,
//! MAC and IP addresses) are reserved through an [`Allocator`] before they
//! are written. The reservation is confirmed after the directory write
//! succeeded and released on every failure path. Objects record what they
//! hold in an [`AllocationLedger`].

use crate::error::{Result, UdmError};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    UidNumber,
    Uid,
    Sid,
    MacAddress,
    IpAddress,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::UidNumber => "uidNumber",
            ResourceKind::Uid => "uid",
            ResourceKind::Sid => "sid",
            ResourceKind::MacAddress => "mac",
            ResourceKind::IpAddress => "aRecord",
        };
        f.write_str(name)
    }
}

pub trait Allocator {
    /// Reserve `value`, or pick the next free one when `None`.
    fn request(&self, kind: ResourceKind, value: Option<&str>) -> Result<String>;

    fn confirm(&self, kind: ResourceKind, value: &str) -> Result<()>;

    /// Give a reservation back. Releasing something that was never
    /// reserved, or was already released, is not an error.
    fn release(&self, kind: ResourceKind, value: &str) -> Result<()>;
}

/// Reservations held by one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLedger {
    entries: Vec<(ResourceKind, String)>,
}

impl AllocationLedger {
    pub fn record(&mut self, kind: ResourceKind, value: impl Into<String>) {
        let value = value.into();
        if !self.contains(kind, &value) {
            self.entries.push((kind, value));
        }
    }

    pub fn contains(&self, kind: ResourceKind, value: &str) -> bool {
        self.entries.iter().any(|(k, v)| *k == kind && v == value)
    }

    pub fn of_kind(&self, kind: ResourceKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn forget(&mut self, kind: ResourceKind, value: &str) {
        self.entries.retain(|(k, v)| !(*k == kind && v == value));
    }

    pub fn take(&mut self) -> Vec<(ResourceKind, String)> {
        std::mem::take(&mut self.entries)
    }

    pub fn entries(&self) -> &[(ResourceKind, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory allocator.
///
/// Uid numbers are handed out sequentially; every other kind must be
/// requested by value.
pub struct MemAllocator {
    locked: RefCell<BTreeSet<(ResourceKind, String)>>,
    confirmed: RefCell<BTreeSet<(ResourceKind, String)>>,
    next_uid: Cell<u32>,
}

impl Default for MemAllocator {
    fn default() -> Self {
        Self::starting_at(1000)
    }
}

impl MemAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first_uid: u32) -> Self {
        Self {
            locked: RefCell::new(BTreeSet::new()),
            confirmed: RefCell::new(BTreeSet::new()),
            next_uid: Cell::new(first_uid),
        }
    }

    /// Mark `value` as taken by some other object.
    pub fn mark_used(&self, kind: ResourceKind, value: &str) {
        self.confirmed.borrow_mut().insert((kind, value.to_string()));
    }

    pub fn is_locked(&self, kind: ResourceKind, value: &str) -> bool {
        self.locked.borrow().contains(&(kind, value.to_string()))
    }

    pub fn is_confirmed(&self, kind: ResourceKind, value: &str) -> bool {
        self.confirmed.borrow().contains(&(kind, value.to_string()))
    }

    /// Number of reservations neither confirmed nor released.
    pub fn pending(&self) -> usize {
        self.locked.borrow().len()
    }

    fn is_taken(&self, key: &(ResourceKind, String)) -> bool {
        self.locked.borrow().contains(key) || self.confirmed.borrow().contains(key)
    }
}

impl Allocator for MemAllocator {
    fn request(&self, kind: ResourceKind, value: Option<&str>) -> Result<String> {
        let value = match (kind, value) {
            (_, Some(value)) => value.to_string(),
            (ResourceKind::UidNumber, None) => {
                let mut candidate = self.next_uid.get();
                while self.is_taken(&(kind, candidate.to_string())) {
                    candidate += 1;
                }
                self.next_uid.set(candidate + 1);
                candidate.to_string()
            }
            (_, None) => {
                return Err(UdmError::NoLockAvailable {
                    kind,
                    value: String::new(),
                })
            }
        };
        let key = (kind, value.clone());
        if self.is_taken(&key) {
            return Err(UdmError::NoLockAvailable { kind, value });
        }
        self.locked.borrow_mut().insert(key);
        Ok(value)
    }

    fn confirm(&self, kind: ResourceKind, value: &str) -> Result<()> {
        let key = (kind, value.to_string());
        self.locked.borrow_mut().remove(&key);
        self.confirmed.borrow_mut().insert(key);
        Ok(())
    }

    fn release(&self, kind: ResourceKind, value: &str) -> Result<()> {
        let key = (kind, value.to_string());
        self.locked.borrow_mut().remove(&key);
        self.confirmed.borrow_mut().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_numbers_are_sequential_and_skip_used() {
        let alloc = MemAllocator::starting_at(2000);
        alloc.mark_used(ResourceKind::UidNumber, "2001");
        assert_eq!(alloc.request(ResourceKind::UidNumber, None).unwrap(), "2000");
        assert_eq!(alloc.request(ResourceKind::UidNumber, None).unwrap(), "2002");
    }

    #[test]
    fn test_request_twice_fails() {
        let alloc = MemAllocator::new();
        alloc
            .request(ResourceKind::MacAddress, Some("aa:bb:cc:dd:ee:ff"))
            .unwrap();
        let err = alloc
            .request(ResourceKind::MacAddress, Some("aa:bb:cc:dd:ee:ff"))
            .unwrap_err();
        assert!(matches!(err, UdmError::NoLockAvailable { .. }));
    }

    #[test]
    fn test_release_is_idempotent() {
        let alloc = MemAllocator::new();
        alloc.request(ResourceKind::IpAddress, Some("10.0.0.5")).unwrap();
        alloc.release(ResourceKind::IpAddress, "10.0.0.5").unwrap();
        alloc.release(ResourceKind::IpAddress, "10.0.0.5").unwrap();
        alloc.release(ResourceKind::Sid, "never-requested").unwrap();
        assert_eq!(alloc.pending(), 0);
    }

    #[test]
    fn test_confirm_moves_lock_to_confirmed() {
        let alloc = MemAllocator::new();
        alloc.request(ResourceKind::Uid, Some("pc1$")).unwrap();
        alloc.confirm(ResourceKind::Uid, "pc1$").unwrap();
        assert!(!alloc.is_locked(ResourceKind::Uid, "pc1$"));
        assert!(alloc.is_confirmed(ResourceKind::Uid, "pc1$"));
    }

    #[test]
    fn test_ledger_records_once() {
        let mut ledger = AllocationLedger::default();
        ledger.record(ResourceKind::Uid, "pc1$");
        ledger.record(ResourceKind::Uid, "pc1$");
        ledger.record(ResourceKind::UidNumber, "1000");
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.of_kind(ResourceKind::UidNumber), vec!["1000".to_string()]);
        ledger.forget(ResourceKind::Uid, "pc1$");
        assert_eq!(ledger.take().len(), 1);
        assert!(ledger.is_empty());
    }
}
