use ferrous_locator::{DiError, Key, LocatorBuilder, ResolutionPolicy, Resolver};
use std::collections::HashMap;
use std::sync::Arc;

#[test]
fn test_unique_named_answers_unnamed_request() {
    let mut builder = LocatorBuilder::new();
    builder
        .instance_named("primary".to_string(), "db")
        .auto_alias_unique_named(false);
    let locator = builder.build().unwrap();

    assert_eq!(locator.get::<String>().unwrap().as_str(), "primary");
    assert!(locator.has::<String>());
}

#[test]
fn test_disabling_unnamed_fallback_live() {
    let mut builder = LocatorBuilder::new();
    builder
        .auto_alias_unique_named(false)
        .instance_named("primary".to_string(), "db");
    let locator = builder.build().unwrap();
    assert_eq!(locator.get::<String>().unwrap().as_str(), "primary");

    locator.set_unnamed_fallback(false);
    assert!(matches!(locator.get::<String>(), Err(DiError::NotRegistered { .. })));
    assert_eq!(locator.get_named::<String>("db").unwrap().as_str(), "primary");

    locator.set_unnamed_fallback(true);
    assert!(locator.get::<String>().is_ok());
}

#[test]
fn test_two_named_bindings_are_not_guessed() {
    let mut builder = LocatorBuilder::new();
    builder
        .instance_named("a".to_string(), "first")
        .instance_named("b".to_string(), "second");
    let locator = builder.build().unwrap();

    match locator.get::<String>() {
        Err(DiError::NotRegistered { key }) => assert_eq!(key, "alloc::string::String"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!locator.has::<String>());
}

#[test]
fn test_ambiguity_reported_on_request() {
    let mut builder = LocatorBuilder::new();
    builder
        .instance_named(1u32, "b")
        .instance_named(2u32, "a")
        .report_ambiguity(true);
    let locator = builder.build().unwrap();

    match locator.get::<u32>() {
        Err(DiError::AmbiguousBinding { candidates, .. }) => {
            assert_eq!(candidates, vec!["u32[name=a]".to_string(), "u32[name=b]".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
    // Availability checks never report ambiguity.
    assert!(!locator.has::<u32>());

    locator.set_report_ambiguity(false);
    assert!(matches!(locator.get::<u32>(), Err(DiError::NotRegistered { .. })));
}

#[test]
fn test_named_request_falls_back_to_unnamed() {
    let mut builder = LocatorBuilder::new();
    builder.instance(5u8);
    let locator = builder.build().unwrap();

    let a = locator.get_named::<u8>("anything").unwrap();
    let b = locator.get::<u8>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    locator.set_named_fallback(false);
    assert!(matches!(
        locator.get_named::<u8>("anything"),
        Err(DiError::NotRegistered { key }) if key == "u8[name=anything]"
    ));
}

#[test]
fn test_exact_match_wins_over_fallback() {
    let mut builder = LocatorBuilder::new();
    builder.instance(1u8).instance_named(2u8, "two");
    let locator = builder.build().unwrap();

    assert_eq!(*locator.get::<u8>().unwrap(), 1);
    assert_eq!(*locator.get_named::<u8>("two").unwrap(), 2);
}

#[test]
fn test_blank_qualifier_is_unnamed() {
    let mut builder = LocatorBuilder::new();
    builder.instance_named(7u64, "   ");
    let locator = builder.build().unwrap();

    assert_eq!(locator.keys(), vec![Key::of::<u64>()]);
    assert_eq!(*locator.get::<u64>().unwrap(), 7);
}

#[test]
fn test_strict_policy_disables_both_fallbacks() {
    let mut builder = LocatorBuilder::new();
    builder
        .instance(1u8)
        .instance_named(2u16, "only")
        .auto_alias_unique_named(false)
        .policy(ResolutionPolicy::strict());
    let locator = builder.build().unwrap();

    assert!(locator.get_named::<u8>("x").is_err());
    assert!(locator.get::<u16>().is_err());
    assert!(!locator.has::<u16>());

    locator.set_unnamed_fallback(true);
    assert_eq!(*locator.get::<u16>().unwrap(), 2);
    assert!(locator.policy().unnamed_fallback);
    assert!(!locator.policy().named_fallback);
}

#[test]
fn test_builder_toggles_feed_policy() {
    let mut builder = LocatorBuilder::new();
    builder.unnamed_fallback(false).named_fallback(false);
    let locator = builder.build().unwrap();
    assert_eq!(locator.policy(), ResolutionPolicy::strict());
}

#[test]
fn test_auto_alias_registers_unnamed_key() {
    let mut builder = LocatorBuilder::new();
    builder.instance_named(3i64, "three");
    let locator = builder.build().unwrap();

    assert!(locator.same_binding(&Key::of::<i64>(), &Key::named::<i64>("three")));
    locator.set_unnamed_fallback(false);
    assert_eq!(*locator.get::<i64>().unwrap(), 3);
}

#[test]
fn test_policy_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("FERROUS_LOCATOR_UNNAMED_FALLBACK", "off"),
        ("FERROUS_LOCATOR_REPORT_AMBIGUITY", "1"),
    ]
    .into_iter()
    .collect();
    let policy = ResolutionPolicy::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
    assert!(!policy.unnamed_fallback);
    assert!(policy.named_fallback);
    assert!(policy.report_ambiguity);

    let bad = ResolutionPolicy::from_lookup(|name| {
        (name == "FERROUS_LOCATOR_NAMED_FALLBACK").then(|| "maybe".to_string())
    });
    assert!(matches!(bad, Err(DiError::InvalidConfiguration(_))));
}
