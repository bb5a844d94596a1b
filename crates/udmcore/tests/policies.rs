use udmcore::directory::{Attributes, DirectoryClient, Modification};
use udmcore::test_utils::TestEnv;
use udmcore::{EngineConfig, UdmError, Value};

const PWHISTORY: &str = "policies/pwhistory";

fn setup() -> TestEnv {
    TestEnv::new()
}

/// A password history policy in `cn=policies` with the given length.
fn seed_policy(env: &TestEnv, name: &str, length: &str, fixed: bool) -> String {
    let dn = format!("cn={},cn=policies,{}", name, env.base);
    let mut attrs: Attributes = vec![
        (
            "objectClass",
            vec![
                "top".to_string(),
                "univentionPolicy".to_string(),
                "univentionPolicyPWHistory".to_string(),
                "univentionObject".to_string(),
            ],
        ),
        ("univentionObjectType", vec![PWHISTORY.to_string()]),
        ("cn", vec![name.to_string()]),
        ("univentionPWHistoryLen", vec![length.to_string()]),
    ]
    .into_iter()
    .collect();
    if fixed {
        attrs.set("univentionFixedAttributes", vec!["univentionPWHistoryLen".to_string()]);
    }
    env.directory.seed(&dn, attrs);
    dn
}

fn reference_policy(env: &TestEnv, target: &str, policy_dn: &str) {
    env.directory
        .modify(
            target,
            &[
                Modification::add("objectClass", vec!["univentionPolicyReference".to_string()]),
                Modification::add("univentionPolicyReference", vec![policy_dn.to_string()]),
            ],
        )
        .unwrap();
}

fn policy_dn(env: &TestEnv, name: &str) -> String {
    format!("cn={},cn=policies,{}", name, env.base)
}

#[test]
fn test_overlay_shows_inherited_value() {
    let env = setup();
    let policy = seed_policy(&env, "default", "5", false);
    reference_policy(&env, &env.base, &policy);
    let clients = env.seed_ou("Clients", &env.base);

    let mut ou = env.ctx.open(&clients).unwrap();
    let overlay = ou.load_policy_object(PWHISTORY).unwrap();

    assert_eq!(overlay.get("length").unwrap(), Value::text("5"));
    assert_eq!(overlay.get("name").unwrap(), Value::text("Clients"));
    assert!(!overlay.exists());
    assert_eq!(
        overlay.fixed_attributes().unwrap().get("length"),
        Some(&false)
    );
}

#[test]
fn test_fixed_value_cannot_be_overridden() {
    let env = setup();
    let policy = seed_policy(&env, "locked", "5", true);
    reference_policy(&env, &env.base, &policy);
    let clients = env.seed_ou("Clients", &env.base);

    let mut ou = env.ctx.open(&clients).unwrap();
    let overlay = ou.load_policy_object(PWHISTORY).unwrap();

    match overlay.set("length", "7") {
        Err(UdmError::PolicyFixedAttribute(property)) => assert_eq!(property, "length"),
        other => panic!("expected fixed attribute error, got {:?}", other),
    }
    assert!(overlay.info("length").is_empty());
    assert_eq!(overlay.get("length").unwrap(), Value::text("5"));
    assert_eq!(
        overlay.fixed_attributes().unwrap().get("length"),
        Some(&true)
    );
}

#[test]
fn test_setting_the_inherited_value_changes_nothing() {
    let env = setup();
    let policy = seed_policy(&env, "default", "5", false);
    reference_policy(&env, &env.base, &policy);
    let clients = env.seed_ou("Clients", &env.base);
    let entries_before = env.directory.len();

    let mut ou = env.ctx.open(&clients).unwrap();
    ou.load_policy_object(PWHISTORY)
        .unwrap()
        .set("length", "5")
        .unwrap();
    ou.modify(false).unwrap();

    assert_eq!(env.directory.len(), entries_before);
    assert!(ou.policies().is_empty());
}

#[test]
fn test_changed_overlay_is_written_and_referenced() {
    let env = setup();
    let clients = env.seed_ou("Clients", &env.base);

    // 1. Change a value through the overlay
    let mut ou = env.ctx.open(&clients).unwrap();
    ou.load_policy_object(PWHISTORY)
        .unwrap()
        .set("length", "3")
        .unwrap();

    // 2. Saving the object writes the policy
    ou.modify(false).unwrap();

    // 3. The new policy exists and is referenced
    let created = policy_dn(&env, "Clients");
    let policy = env.directory.get_required(&created).unwrap();
    assert_eq!(policy.values("univentionPWHistoryLen"), vec!["3".to_string()]);
    assert!(policy.has_value("objectClass", "univentionPolicyPWHistory"));
    assert!(!policy.contains("univentionPWQualityCheck"));
    assert_eq!(ou.policies(), &[created.clone()]);
    let entry = env.directory.get_required(&clients).unwrap();
    assert_eq!(entry.values("univentionPolicyReference"), vec![created]);
    assert!(entry.has_value("objectClass", "univentionPolicyReference"));
    assert!(ou.take_messages().is_empty());
}

#[test]
fn test_referenced_policy_is_copied_not_changed() {
    let env = setup();
    let clients = env.seed_ou("Clients", &env.base);
    let strict = seed_policy(&env, "strict", "10", false);
    reference_policy(&env, &clients, &strict);

    let mut ou = env.ctx.open(&clients).unwrap();
    let overlay = ou.load_policy_object(PWHISTORY).unwrap();
    assert_eq!(overlay.get("length").unwrap(), Value::text("10"));
    overlay.set("length", "12").unwrap();
    ou.modify(false).unwrap();

    let copy = policy_dn(&env, "Clients");
    assert_eq!(ou.policies(), &[copy.clone()]);
    let original = env.directory.get_required(&strict).unwrap();
    assert_eq!(original.values("univentionPWHistoryLen"), vec!["10".to_string()]);
    let written = env.directory.get_required(&copy).unwrap();
    assert_eq!(written.values("univentionPWHistoryLen"), vec!["12".to_string()]);
}

#[test]
fn test_taken_policy_names_get_a_suffix() {
    let env = setup();
    let clients = env.seed_ou("Clients", &env.base);
    seed_policy(&env, "Clients", "1", false);
    seed_policy(&env, "Clients_uv1", "1", false);

    let mut ou = env.ctx.open(&clients).unwrap();
    ou.load_policy_object(PWHISTORY)
        .unwrap()
        .set("length", "3")
        .unwrap();
    ou.modify(false).unwrap();

    let created = policy_dn(&env, "Clients_uv2");
    assert!(env.directory.exists(&created));
    assert_eq!(ou.policies(), &[created]);
}

#[test]
fn test_policy_name_retries_are_bounded() {
    let env = TestEnv::with_config(EngineConfig {
        policy_create_max_retries: 2,
        ..Default::default()
    });
    let clients = env.seed_ou("Clients", &env.base);
    seed_policy(&env, "Clients", "1", false);
    seed_policy(&env, "Clients_uv1", "1", false);

    let mut ou = env.ctx.open(&clients).unwrap();
    ou.load_policy_object(PWHISTORY)
        .unwrap()
        .set("length", "3")
        .unwrap();
    let err = ou.modify(false).unwrap_err();

    match err {
        UdmError::PolicyRetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected exhausted retries, got {:?}", other),
    }
    assert!(!env.directory.exists(&policy_dn(&env, "Clients_uv2")));
    let entry = env.directory.get_required(&clients).unwrap();
    assert!(!entry.contains("univentionPolicyReference"));
}

#[test]
fn test_non_policy_type_is_rejected() {
    let env = setup();
    let clients = env.seed_ou("Clients", &env.base);
    let mut ou = env.ctx.open(&clients).unwrap();

    assert!(matches!(
        ou.load_policy_object("container/ou"),
        Err(UdmError::InvalidOperation(_))
    ));
}
