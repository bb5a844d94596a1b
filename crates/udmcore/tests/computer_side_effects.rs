use tracing_subscriber::EnvFilter;
use udmcore::allocator::ResourceKind;
use udmcore::computer::{ALIAS, DHCP, FORWARD, REVERSE};
use udmcore::directory::{DirectoryClient, DirectoryError, Filter, Operation, Scope};
use udmcore::object::Specialization;
use udmcore::test_utils::TestEnv;
use udmcore::{DirectoryObject, UdmError, Value};

const MAC: &str = "aa:bb:cc:dd:ee:ff";
const IP: &str = "10.200.2.5";

fn setup() -> TestEnv {
    // RUST_LOG=udmcore=debug shows the directory writes of a failing test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    TestEnv::new()
}

/// A computer with one MAC and one IP, registered in the forward and
/// reverse zone and the DHCP service of the fixture.
fn networked_computer(env: &TestEnv, name: &str) -> DirectoryObject {
    let mut computer = env.new_computer(name);
    computer.set("mac", Value::list([MAC])).unwrap();
    computer.set("ip", Value::list([IP])).unwrap();
    computer
        .set(FORWARD, Value::tuples([[env.forward_zone()]]))
        .unwrap();
    computer
        .set(REVERSE, Value::tuples([[env.reverse_zone()]]))
        .unwrap();
    computer
        .set(DHCP, Value::tuples([[env.dhcp_service()]]))
        .unwrap();
    let dn = computer.create().unwrap();
    env.ctx.open(&dn).unwrap()
}

fn host_record(env: &TestEnv, name: &str) -> String {
    format!("relativeDomainName={},{}", name, env.forward_zone())
}

fn pointer_record(env: &TestEnv, relative: &str) -> String {
    format!("relativeDomainName={},{}", relative, env.reverse_zone())
}

fn dhcp_hosts(env: &TestEnv) -> Vec<(String, udmcore::directory::Attributes)> {
    env.directory
        .search(
            &env.dhcp_service(),
            Scope::Sub,
            &Filter::eq("objectClass", "univentionDhcpHost"),
            &[],
        )
        .unwrap()
}

#[test]
fn test_create_registers_dns_and_dhcp_entries() {
    let env = setup();
    let computer = networked_computer(&env, "pc1");
    let dn = computer.dn().unwrap().to_string();

    // 1. DHCP host below the service
    let hosts = dhcp_hosts(&env);
    assert_eq!(hosts.len(), 1);
    let (host_dn, host) = &hosts[0];
    assert_eq!(host_dn, &format!("cn=pc1,{}", env.dhcp_service()));
    assert_eq!(host.values("dhcpHWAddress"), vec![format!("ethernet {}", MAC)]);
    assert_eq!(host.values("univentionDhcpFixedAddress"), vec![IP.to_string()]);

    // 2. Host record in the forward zone
    let record = env.directory.get_required(&host_record(&env, "pc1")).unwrap();
    assert_eq!(record.values("aRecord"), vec![IP.to_string()]);
    assert_eq!(record.values("zoneName"), vec!["example.com".to_string()]);

    // 3. Pointer record in the reverse zone
    let pointer = env.directory.get_required(&pointer_record(&env, "5")).unwrap();
    assert_eq!(pointer.values("pTRRecord"), vec!["pc1.example.com.".to_string()]);

    // 4. Entry itself and the primary group
    let entry = env.directory.get_required(&dn).unwrap();
    assert_eq!(entry.values("aRecord"), vec![IP.to_string()]);
    assert_eq!(entry.values("uid"), vec!["pc1$".to_string()]);
    assert_eq!(entry.values("gidNumber"), vec!["5000".to_string()]);
    assert_eq!(entry.values("sambaAcctFlags"), vec!["[W          ]".to_string()]);
    assert_eq!(
        entry.values("krb5PrincipalName"),
        vec!["host/pc1@EXAMPLE.COM".to_string()]
    );
    let group = env.directory.get_required(&env.windows_hosts()).unwrap();
    assert_eq!(group.values("uniqueMember"), vec![dn.clone()]);
    assert_eq!(group.values("memberUid"), vec!["pc1$".to_string()]);
}

#[test]
fn test_create_bumps_zone_serials() {
    let env = setup();
    networked_computer(&env, "pc1");

    let zone = env.directory.get_required(&env.forward_zone()).unwrap();
    let soa = zone.first("sOARecord").unwrap();
    assert_eq!(soa.split_whitespace().nth(2), Some("2"));
}

#[test]
fn test_open_reconstructs_collections() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");

    assert_eq!(
        computer.get(FORWARD).unwrap(),
        Value::tuples([[env.forward_zone(), IP.to_string()]])
    );
    assert_eq!(
        computer.get(REVERSE).unwrap(),
        Value::tuples([[env.reverse_zone(), IP.to_string()]])
    );
    assert_eq!(
        computer.get(DHCP).unwrap(),
        Value::tuples([[env.dhcp_service(), IP.to_string(), MAC.to_string()]])
    );
    assert_eq!(computer.get("ip").unwrap(), Value::list([IP]));
    assert_eq!(
        computer.get("primaryGroup").unwrap(),
        Value::text(env.windows_hosts())
    );
    assert_eq!(computer.get("fqdn").unwrap(), Value::text("pc1"));
    assert!(computer.diff().is_empty());
    assert!(matches!(
        computer.specialization(),
        Specialization::Computer(state) if !state.multi_ip
    ));
}

#[test]
fn test_allocations_are_confirmed_after_create() {
    let env = setup();
    networked_computer(&env, "pc1");

    assert_eq!(env.allocator.pending(), 0);
    assert!(env.allocator.is_confirmed(ResourceKind::MacAddress, MAC));
    assert!(env.allocator.is_confirmed(ResourceKind::IpAddress, IP));
    assert!(env.allocator.is_confirmed(ResourceKind::Uid, "pc1$"));
    assert!(env.allocator.is_confirmed(ResourceKind::UidNumber, "1000"));
}

#[test]
fn test_used_mac_is_rejected_without_leaking_reservations() {
    let env = setup();
    env.allocator.mark_used(ResourceKind::MacAddress, MAC);
    let mut computer = env.new_computer("pc1");
    computer.set("mac", Value::list([MAC])).unwrap();
    computer.set("ip", Value::list([IP])).unwrap();

    match computer.create() {
        Err(UdmError::MacAlreadyUsed(mac)) => assert_eq!(mac, MAC),
        other => panic!("expected MAC conflict, got {:?}", other),
    }
    assert!(!computer.exists());
    assert_eq!(env.allocator.pending(), 0);
}

#[test]
fn test_failed_add_releases_reservations() {
    let env = setup();
    let dn = format!("cn=pc1,{}", env.computers());
    env.directory.fail_next(Operation::Add, &dn);
    let mut computer = env.new_computer("pc1");
    computer.set("mac", Value::list([MAC])).unwrap();

    let err = computer.create().unwrap_err();

    assert!(matches!(err, UdmError::Directory(DirectoryError::Unavailable(_))));
    assert_eq!(env.allocator.pending(), 0);
    assert!(!env.allocator.is_locked(ResourceKind::MacAddress, MAC));
    assert!(computer.ledger().is_empty());
}

#[test]
fn test_failed_side_effect_undoes_create() {
    let env = setup();
    env.directory
        .fail_next(Operation::Add, &host_record(&env, "pc1"));
    let mut computer = env.new_computer("pc1");
    computer.set("mac", Value::list([MAC])).unwrap();
    computer.set("ip", Value::list([IP])).unwrap();
    computer
        .set(FORWARD, Value::tuples([[env.forward_zone()]]))
        .unwrap();
    computer
        .set(DHCP, Value::tuples([[env.dhcp_service()]]))
        .unwrap();

    let err = computer.create().unwrap_err();

    assert!(matches!(err, UdmError::Directory(DirectoryError::Unavailable(_))));
    assert!(!computer.exists());
    assert!(!env.directory.exists(&format!("cn=pc1,{}", env.computers())));
    // The DHCP host written before the failure is cleaned up again
    assert!(dhcp_hosts(&env).is_empty());
    assert_eq!(env.allocator.pending(), 0);
    assert!(!env.allocator.is_confirmed(ResourceKind::MacAddress, MAC));
}

#[test]
fn test_changing_ip_moves_dns_and_dhcp_entries() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");

    computer.set("ip", Value::list(["10.200.2.6"])).unwrap();
    computer.modify(false).unwrap();

    let record = env.directory.get_required(&host_record(&env, "pc1")).unwrap();
    assert_eq!(record.values("aRecord"), vec!["10.200.2.6".to_string()]);
    assert!(!env.directory.exists(&pointer_record(&env, "5")));
    let pointer = env.directory.get_required(&pointer_record(&env, "6")).unwrap();
    assert_eq!(pointer.values("pTRRecord"), vec!["pc1.example.com.".to_string()]);

    let hosts = dhcp_hosts(&env);
    assert_eq!(hosts.len(), 1);
    assert_eq!(
        hosts[0].1.values("univentionDhcpFixedAddress"),
        vec!["10.200.2.6".to_string()]
    );

    assert!(!env.allocator.is_confirmed(ResourceKind::IpAddress, IP));
    assert!(env.allocator.is_confirmed(ResourceKind::IpAddress, "10.200.2.6"));
}

#[test]
fn test_address_outside_reverse_zone_is_a_warning() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");

    computer.set("ip", Value::list(["10.99.0.1"])).unwrap();
    computer.modify(false).unwrap();

    assert!(!env.directory.exists(&pointer_record(&env, "5")));
    assert!(computer.info(REVERSE).is_empty());
    let messages = computer.take_messages();
    assert!(messages
        .iter()
        .any(|m| m.content.contains("not inside reverse zone")));
}

#[test]
fn test_rename_updates_group_memberships() {
    let env = setup();
    let group = env.seed_group("group1", "5001");
    let mut computer = env.new_computer("host1");
    computer.set("groups", Value::list([group.clone()])).unwrap();
    let old_dn = computer.create().unwrap();

    let listed = env.directory.get_required(&group).unwrap();
    assert_eq!(listed.values("uniqueMember"), vec![old_dn.clone()]);
    assert_eq!(listed.values("memberUid"), vec!["host1$".to_string()]);

    let mut computer = env.ctx.open(&old_dn).unwrap();
    computer.set("name", "host2").unwrap();
    let new_dn = computer.modify(false).unwrap();

    assert_eq!(new_dn, format!("cn=host2,{}", env.computers()));
    for group_dn in [group, env.windows_hosts()] {
        let entry = env.directory.get_required(&group_dn).unwrap();
        assert_eq!(entry.values("uniqueMember"), vec![new_dn.clone()]);
        assert_eq!(entry.values("memberUid"), vec!["host2$".to_string()]);
    }
    let entry = env.directory.get_required(&new_dn).unwrap();
    assert_eq!(entry.values("uid"), vec!["host2$".to_string()]);
    assert_eq!(entry.values("sn"), vec!["host2".to_string()]);
}

#[test]
fn test_rename_follows_dns_and_dhcp_entries() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");

    computer.set("name", "pc2").unwrap();
    computer.modify(false).unwrap();

    assert!(!env.directory.exists(&host_record(&env, "pc1")));
    let record = env.directory.get_required(&host_record(&env, "pc2")).unwrap();
    assert_eq!(record.values("aRecord"), vec![IP.to_string()]);
    let pointer = env.directory.get_required(&pointer_record(&env, "5")).unwrap();
    assert_eq!(pointer.values("pTRRecord"), vec!["pc2.example.com.".to_string()]);
    let hosts = dhcp_hosts(&env);
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].0, format!("cn=pc2,{}", env.dhcp_service()));
}

#[test]
fn test_group_changes_are_written_to_groups() {
    let env = setup();
    let group = env.seed_group("group1", "5001");
    let mut computer = env.create_computer("pc1");
    let dn = computer.dn().unwrap().to_string();

    computer.set("groups", Value::list([env.windows_hosts(), group.clone()])).unwrap();
    computer.modify(false).unwrap();
    let entry = env.directory.get_required(&group).unwrap();
    assert!(entry.has_value("uniqueMember", &dn));
    assert!(entry.has_value("memberUid", "pc1$"));

    computer.set("groups", Value::list([env.windows_hosts()])).unwrap();
    computer.modify(false).unwrap();
    let entry = env.directory.get_required(&group).unwrap();
    assert!(!entry.contains("uniqueMember"));
    assert!(!entry.contains("memberUid"));
}

#[test]
fn test_alias_records() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");
    let alias_dn = format!("relativeDomainName=www,{}", env.forward_zone());

    computer
        .set(
            ALIAS,
            Value::tuples([[env.forward_zone(), env.forward_zone(), "www".to_string()]]),
        )
        .unwrap();
    computer.modify(false).unwrap();
    let alias = env.directory.get_required(&alias_dn).unwrap();
    assert_eq!(alias.values("cNAMERecord"), vec!["pc1.example.com.".to_string()]);

    let reopened = env.ctx.open(computer.dn().unwrap()).unwrap();
    assert_eq!(reopened.info(ALIAS).len(), 1);

    computer.set(ALIAS, Value::None).unwrap();
    computer.modify(false).unwrap();
    assert!(!env.directory.exists(&alias_dn));
}

#[test]
fn test_incomplete_dhcp_entry_is_rejected() {
    let env = setup();
    let mut computer = env.new_computer("pc1");
    computer
        .set(DHCP, Value::tuples([[env.dhcp_service()]]))
        .unwrap();

    assert!(matches!(
        computer.create(),
        Err(UdmError::InvalidDhcpEntry(_))
    ));
    assert_eq!(env.allocator.pending(), 0);
}

#[test]
fn test_too_long_name_for_zone() {
    let env = setup();
    let mut computer = env.new_computer(&"a".repeat(55));
    computer
        .set(FORWARD, Value::tuples([[env.forward_zone()]]))
        .unwrap();

    assert!(matches!(
        computer.create(),
        Err(UdmError::CommonNameTooLong(_))
    ));
}

#[test]
fn test_disabling_posix_drops_account_attributes() {
    let env = setup();
    let mut computer = env.create_computer("pc1");
    let dn = computer.dn().unwrap().to_string();

    computer.set_option("posix", false).unwrap();
    let changes = computer.diff();
    let unixhome = changes.iter().find(|c| c.property == "unixhome").unwrap();
    assert_eq!(unixhome.old, Value::text("/dev/null"));
    assert!(unixhome.new.is_empty());
    computer.modify(false).unwrap();

    let entry = env.directory.get_required(&dn).unwrap();
    assert!(!entry.has_value("objectClass", "posixAccount"));
    assert!(!entry.has_value("objectClass", "shadowAccount"));
    assert!(entry.has_value("objectClass", "sambaSamAccount"));
    for attr in ["uidNumber", "gidNumber", "homeDirectory", "loginShell"] {
        assert!(!entry.contains(attr), "{} still present", attr);
    }
    assert_eq!(entry.values("uid"), vec!["pc1$".to_string()]);
    assert!(computer.take_messages().is_empty());
}

#[test]
fn test_samba_without_posix_gives_back_its_rid_number() {
    let env = setup();
    let mut computer = env.new_computer("pc2");
    computer.set_option("posix", false).unwrap();
    let dn = computer.create().unwrap();

    // 1. The uid number only lives in the SID
    let entry = env.directory.get_required(&dn).unwrap();
    assert!(!entry.contains("uidNumber"));
    let sid = entry.first("sambaSID").unwrap().to_string();
    let rid: u64 = sid.rsplit('-').next().unwrap().parse().unwrap();
    let number = ((rid - 1000) / 2).to_string();
    assert!(env.allocator.is_confirmed(ResourceKind::UidNumber, &number));

    // 2. Removing the computer releases both
    let mut computer = env.ctx.open(&dn).unwrap();
    computer.remove(false).unwrap();
    assert!(!env.allocator.is_confirmed(ResourceKind::UidNumber, &number));
    assert!(!env.allocator.is_confirmed(ResourceKind::Sid, &sid));
}

#[test]
fn test_modify_can_be_retried_after_a_dependent_write_fails() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");
    let zone = env.forward_zone();
    udmcore::dns::add_alias(&*env.directory, "other", &zone, &zone, "www").unwrap();
    let new_mac = "aa:bb:cc:dd:ee:01";

    // 1. The entry is written, then the alias collides
    computer.set("mac", Value::list([new_mac])).unwrap();
    computer
        .set(ALIAS, Value::tuples([[zone.clone(), zone.clone(), "www".to_string()]]))
        .unwrap();
    let err = computer.modify(false).unwrap_err();
    assert!(matches!(err, UdmError::DnsAliasAlreadyUsed(_)));

    // 2. Without the alias the same change goes through
    computer.set(ALIAS, Value::None).unwrap();
    computer.modify(false).unwrap();

    let reopened = env.ctx.open(computer.dn().unwrap()).unwrap();
    assert_eq!(reopened.info("mac"), Value::list([new_mac]));
    assert_eq!(
        reopened.info(DHCP).as_tuples(),
        vec![vec![env.dhcp_service(), IP.to_string(), new_mac.to_string()]]
    );
    assert!(env.allocator.is_confirmed(ResourceKind::MacAddress, new_mac));
    assert!(!env.allocator.is_confirmed(ResourceKind::MacAddress, MAC));
    assert_eq!(env.allocator.pending(), 0);
}

#[test]
fn test_toggling_option_back_is_no_change() {
    let env = setup();
    let mut computer = env.create_computer("pc1");

    computer.set_option("posix", false).unwrap();
    assert!(computer.option_toggled("posix"));
    computer.set_option("posix", true).unwrap();

    assert!(!computer.option_toggled("posix"));
    assert!(computer.diff().is_empty());
}

#[test]
fn test_remove_releases_identifiers_and_memberships() {
    let env = setup();
    let mut computer = networked_computer(&env, "pc1");
    let dn = computer.dn().unwrap().to_string();

    computer.remove(false).unwrap();
    computer.cleanup();

    assert!(!env.directory.exists(&dn));
    assert!(!env.allocator.is_confirmed(ResourceKind::MacAddress, MAC));
    assert!(!env.allocator.is_confirmed(ResourceKind::IpAddress, IP));
    assert!(!env.allocator.is_confirmed(ResourceKind::Uid, "pc1$"));
    let group = env.directory.get_required(&env.windows_hosts()).unwrap();
    assert!(!group.contains("uniqueMember"));
    assert!(!group.contains("memberUid"));
    assert!(!env.directory.exists(&host_record(&env, "pc1")));
    assert!(!env.directory.exists(&pointer_record(&env, "5")));
    assert!(dhcp_hosts(&env).is_empty());
}
