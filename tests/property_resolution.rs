use ferrous_locator::{normalize_qualifier, Key, LocatorBuilder, Resolver};
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #[test]
    fn test_qualifier_normalization_trims(name in "[a-z]{1,12}", left in " {0,3}", right in " {0,3}") {
        let padded = format!("{left}{name}{right}");
        let normalized = normalize_qualifier(Some(padded.as_str()));
        prop_assert_eq!(normalized.as_deref(), Some(name.as_str()));
        prop_assert_eq!(Key::named::<u8>(&padded), Key::named::<u8>(&name));
    }

    #[test]
    fn test_blank_qualifiers_are_unnamed(blank in "[ \t]{0,6}") {
        prop_assert_eq!(normalize_qualifier(Some(blank.as_str())), None);
        prop_assert_eq!(Key::named::<u8>(&blank), Key::of::<u8>());
    }

    #[test]
    fn test_keys_differ_by_type_or_qualifier(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        prop_assert_eq!(Key::named::<u8>(&a) == Key::named::<u8>(&b), a == b);
        prop_assert_ne!(Key::named::<u8>(&a), Key::named::<u16>(&a));
    }

    #[test]
    fn test_named_lookups_are_exact(names in prop::collection::btree_set("[a-z]{1,6}", 1..6)) {
        let mut builder = LocatorBuilder::new();
        for (i, name) in names.iter().enumerate() {
            builder.instance_named(i, name.as_str());
        }
        let locator = builder.build().unwrap();

        for (i, name) in names.iter().enumerate() {
            prop_assert_eq!(*locator.get_named::<usize>(name).unwrap(), i);
        }
        prop_assert_eq!(locator.get_all::<usize>().unwrap().len(), names.len());
    }

    #[test]
    fn test_unnamed_fallback_requires_uniqueness(names in prop::collection::btree_set("[a-z]{1,6}", 1..5)) {
        let mut builder = LocatorBuilder::new();
        builder.auto_alias_unique_named(false);
        for name in &names {
            builder.instance_named(name.clone(), name.as_str());
        }
        let locator = builder.build().unwrap();

        let unnamed = locator.get::<String>();
        if names.len() == 1 {
            let only: &String = names.iter().next().unwrap();
            let resolved = unnamed.unwrap();
            prop_assert_eq!(resolved.as_str(), only.as_str());
        } else {
            prop_assert!(unnamed.is_err());
            prop_assert!(!locator.has::<String>());
        }
    }

    #[test]
    fn test_map_keys_are_qualifiers(names in prop::collection::btree_set("[a-z]{1,6}", 0..6)) {
        let mut builder = LocatorBuilder::new();
        for name in &names {
            builder.instance_named(name.len(), name.as_str());
        }
        let locator = builder.build().unwrap();

        let keys: BTreeSet<String> = locator.get_named_map::<usize>().unwrap().keys().cloned().collect();
        prop_assert_eq!(keys, names);
    }
}
