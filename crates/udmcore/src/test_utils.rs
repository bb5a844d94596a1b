//! Test fixtures: an in-memory directory with the containers, zones,
//! services and groups the built-in types expect.

use crate::allocator::MemAllocator;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::directory::{Attributes, MemDirectory};
use crate::object::DirectoryObject;
use std::rc::Rc;

pub const BASE: &str = "dc=example,dc=com";

pub struct TestEnv {
    pub ctx: Context,
    pub directory: Rc<MemDirectory>,
    pub allocator: Rc<MemAllocator>,
    pub base: String,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn entry(pairs: &[(&str, &[&str])]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (*k, v.iter().map(|s| s.to_string()).collect::<Vec<_>>()))
        .collect()
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let directory = Rc::new(MemDirectory::new(BASE));
        let allocator = Rc::new(MemAllocator::new());
        let ctx = Context::new(directory.clone(), allocator.clone(), config);
        let env = Self {
            ctx,
            directory,
            allocator,
            base: BASE.to_string(),
        };
        env.seed_fixtures();
        env
    }

    fn seed_fixtures(&self) {
        for name in ["computers", "groups", "dns", "dhcp", "policies"] {
            self.seed_container(name);
        }
        self.seed_group("Windows Hosts", "5000");
        self.directory.seed(
            &self.forward_zone(),
            entry(&[
                ("objectClass", &["top", "dNSZone", "univentionObject"]),
                ("univentionObjectType", &["dns/forward_zone"]),
                ("zoneName", &["example.com"]),
                ("relativeDomainName", &["@"]),
                ("nSRecord", &["ns.example.com."]),
                ("sOARecord", &["ns.example.com. root.example.com. 1 28800 7200 604800 10800"]),
            ]),
        );
        self.directory.seed(
            &self.reverse_zone(),
            entry(&[
                ("objectClass", &["top", "dNSZone", "univentionObject"]),
                ("univentionObjectType", &["dns/reverse_zone"]),
                ("zoneName", &["2.200.10.in-addr.arpa"]),
                ("relativeDomainName", &["@"]),
                ("nSRecord", &["ns.example.com."]),
                ("sOARecord", &["ns.example.com. root.example.com. 1 28800 7200 604800 10800"]),
            ]),
        );
        self.directory.seed(
            &self.dhcp_service(),
            entry(&[
                ("objectClass", &["top", "dhcpService", "univentionDhcpService", "univentionObject"]),
                ("univentionObjectType", &["dhcp/service"]),
                ("cn", &["example.com"]),
            ]),
        );
    }

    /// `cn=<name>` directly below the base.
    pub fn seed_container(&self, name: &str) -> String {
        let dn = format!("cn={},{}", name, self.base);
        self.directory.seed(
            &dn,
            entry(&[
                ("objectClass", &["top", "organizationalRole", "univentionContainer", "univentionObject"]),
                ("univentionObjectType", &["container/cn"]),
                ("cn", &[name]),
            ]),
        );
        dn
    }

    /// An organisational unit below `parent`.
    pub fn seed_ou(&self, name: &str, parent: &str) -> String {
        let dn = format!("ou={},{}", name, parent);
        self.directory.seed(
            &dn,
            entry(&[
                ("objectClass", &["top", "organizationalUnit", "univentionObject"]),
                ("univentionObjectType", &["container/ou"]),
                ("ou", &[name]),
            ]),
        );
        dn
    }

    pub fn seed_group(&self, name: &str, gid: &str) -> String {
        let dn = format!("cn={},cn=groups,{}", name, self.base);
        self.directory.seed(
            &dn,
            entry(&[
                ("objectClass", &["top", "posixGroup", "univentionGroup", "univentionObject"]),
                ("univentionObjectType", &["groups/group"]),
                ("cn", &[name]),
                ("gidNumber", &[gid]),
            ]),
        );
        dn
    }

    pub fn computers(&self) -> String {
        format!("cn=computers,{}", self.base)
    }

    pub fn windows_hosts(&self) -> String {
        format!("cn=Windows Hosts,cn=groups,{}", self.base)
    }

    pub fn forward_zone(&self) -> String {
        format!("zoneName=example.com,cn=dns,{}", self.base)
    }

    pub fn reverse_zone(&self) -> String {
        format!("zoneName=2.200.10.in-addr.arpa,cn=dns,{}", self.base)
    }

    pub fn dhcp_service(&self) -> String {
        format!("cn=example.com,cn=dhcp,{}", self.base)
    }

    /// An unsaved Windows computer named `name` in `cn=computers`.
    pub fn new_computer(&self, name: &str) -> DirectoryObject {
        let mut computer = self
            .ctx
            .new_object("computers/windows", &self.computers())
            .expect("computer type is registered");
        computer.set("name", name).expect("valid computer name");
        computer
    }

    /// Create a computer and open it again from the directory.
    pub fn create_computer(&self, name: &str) -> DirectoryObject {
        let mut computer = self.new_computer(name);
        let dn = computer.create().expect("computer created");
        self.ctx.open(&dn).expect("computer opened")
    }
}
