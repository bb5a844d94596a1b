use udmcore::directory::{DirectoryClient, DirectoryError, Operation};
use udmcore::test_utils::TestEnv;
use udmcore::{UdmError, Value};

fn setup() -> TestEnv {
    TestEnv::new()
}

#[test]
fn test_move_computer_updates_group_membership() {
    let env = setup();
    let target_ou = env.seed_ou("Laptops", &env.base);
    let mut computer = env.create_computer("pc1");
    let old_dn = computer.dn().unwrap().to_string();
    let new_dn = format!("cn=pc1,{}", target_ou);

    let moved = computer.move_to(&new_dn).unwrap();

    assert_eq!(moved, new_dn);
    assert_eq!(computer.dn(), Some(new_dn.as_str()));
    assert_eq!(computer.position(), target_ou);
    assert!(!env.directory.exists(&old_dn));
    let group = env.directory.get_required(&env.windows_hosts()).unwrap();
    assert_eq!(group.values("uniqueMember"), vec![new_dn]);
}

#[test]
fn test_move_to_missing_parent_fails() {
    let env = setup();
    let mut computer = env.create_computer("pc1");
    let old_dn = computer.dn().unwrap().to_string();

    let err = computer
        .move_to(&format!("cn=pc1,ou=Nowhere,{}", env.base))
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(computer.dn(), Some(old_dn.as_str()));
}

#[test]
fn test_fixed_types_cannot_move() {
    let env = setup();
    let record = format!("relativeDomainName=www,{}", env.forward_zone());
    env.directory.seed(
        &record,
        vec![
            ("objectClass", vec!["top".to_string(), "dNSZone".to_string(), "univentionObject".to_string()]),
            ("univentionObjectType", vec!["dns/host_record".to_string()]),
            ("zoneName", vec!["example.com".to_string()]),
            ("relativeDomainName", vec!["www".to_string()]),
            ("aRecord", vec!["10.200.2.80".to_string()]),
        ]
        .into_iter()
        .collect(),
    );
    let mut object = env.ctx.open(&record).unwrap();

    let err = object
        .move_to(&format!("relativeDomainName=www,{}", env.reverse_zone()))
        .unwrap_err();

    assert!(matches!(err, UdmError::UnsupportedOperation(_)));
    assert_eq!(object.dn(), Some(record.as_str()));
    assert!(env.directory.exists(&record));
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let env = setup();
    let branch = env.seed_ou("Branch", &env.base);
    let mut ou = env.ctx.open(&branch).unwrap();

    let err = ou.move_to(&format!("ou=Inner,{}", branch)).unwrap_err();

    assert!(matches!(err, UdmError::InvalidOperation(_)));
    assert!(env.directory.exists(&branch));
}

#[test]
fn test_subtree_move_carries_children() {
    let env = setup();
    // 1. Branch with two children and a grandchild
    let branch = env.seed_ou("Branch", &env.base);
    let first = env.seed_ou("A", &branch);
    env.seed_ou("B", &branch);
    env.seed_ou("Row1", &first);
    let target = format!("ou=Moved,{}", env.base);

    // 2. Move
    let mut ou = env.ctx.open(&branch).unwrap();
    ou.move_to(&target).unwrap();

    // 3. Everything lives below the new DN
    assert_eq!(ou.dn(), Some(target.as_str()));
    assert_eq!(ou.info("name"), Value::text("Moved"));
    assert!(ou.diff().is_empty());
    for dn in [
        target.clone(),
        format!("ou=A,{}", target),
        format!("ou=B,{}", target),
        format!("ou=Row1,ou=A,{}", target),
    ] {
        assert!(env.directory.exists(&dn), "{} missing", dn);
    }
    assert!(!env.directory.exists(&branch));
    assert!(!env.directory.exists(&first));
}

#[test]
fn test_failed_subtree_move_restores_tree() {
    let env = setup();
    let branch = env.seed_ou("Branch", &env.base);
    let first = env.seed_ou("A", &branch);
    let second = env.seed_ou("B", &branch);
    let target = format!("ou=Moved,{}", env.base);
    env.directory.fail_next(Operation::Rename, &second);

    let mut ou = env.ctx.open(&branch).unwrap();
    let err = ou.move_to(&target).unwrap_err();

    assert!(matches!(err, UdmError::Directory(DirectoryError::Unavailable(_))));
    assert_eq!(ou.dn(), Some(branch.as_str()));
    for dn in [&branch, &first, &second] {
        assert!(env.directory.exists(dn), "{} was not restored", dn);
    }
    assert!(!env.directory.exists(&target));
    assert!(!env.directory.exists(&format!("ou=A,{}", target)));
}

#[test]
fn test_case_only_move_goes_through_temporary_container() {
    let env = setup();
    let lower = env.seed_ou("clients", &env.base);
    let upper = format!("ou=Clients,{}", env.base);
    let entries_before = env.directory.len();

    let mut ou = env.ctx.open(&lower).unwrap();
    ou.move_to(&upper).unwrap();

    assert_eq!(ou.dn(), Some(upper.as_str()));
    assert!(env.directory.dns().contains(&upper));
    assert!(!env.directory.dns().contains(&lower));
    // The temporary container is gone again
    assert_eq!(env.directory.len(), entries_before);
}

#[test]
fn test_moving_to_same_dn_is_rejected() {
    let env = setup();
    let branch = env.seed_ou("Branch", &env.base);
    let mut ou = env.ctx.open(&branch).unwrap();

    assert!(matches!(
        ou.move_to(&branch),
        Err(UdmError::InvalidOperation(_))
    ));
}

#[test]
fn test_rename_of_container_with_children_needs_cascade() {
    let env = setup();
    let branch = env.seed_ou("Branch", &env.base);
    env.seed_ou("A", &branch);
    let mut ou = env.ctx.open(&branch).unwrap();

    ou.set("name", "Renamed").unwrap();
    let err = ou.modify(false).unwrap_err();
    assert!(matches!(err, UdmError::InvalidOperation(_)));
    assert!(env.directory.exists(&branch));

    let renamed = ou.modify(true).unwrap();
    assert_eq!(renamed, format!("ou=Renamed,{}", env.base));
    assert!(env.directory.exists(&format!("ou=A,{}", renamed)));
    assert!(!env.directory.exists(&branch));
}
