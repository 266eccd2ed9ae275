use ferrous_locator::{
    Args, ConstructResult, Dependency, DiError, IndexMap, Injectable, InstanceSet, Key,
    LocatorBuilder, Param, Resolver, ResolverCore,
};
use std::sync::Arc;

trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
}

struct Named(&'static str);
impl Plugin for Named {
    fn id(&self) -> &'static str {
        self.0
    }
}

fn ids(plugins: &[Arc<dyn Plugin>]) -> Vec<&'static str> {
    plugins.iter().map(|p| p.id()).collect()
}

#[test]
fn test_implicit_aggregation_order() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("zeta", |_| Ok(Arc::new(Named("zeta"))))
        .provide_named_trait::<dyn Plugin, _>("alpha", |_| Ok(Arc::new(Named("alpha"))))
        .provide_trait::<dyn Plugin, _>(|_| Ok(Arc::new(Named("default"))));
    let locator = builder.build().unwrap();

    let all = locator.get_all::<dyn Plugin>().unwrap();
    assert_eq!(ids(&all), vec!["default", "alpha", "zeta"]);
}

#[test]
fn test_aliases_are_collected_once() {
    let mut builder = LocatorBuilder::new();
    builder.provide_named_trait::<dyn Plugin, _>("only", |_| Ok(Arc::new(Named("only"))));
    let locator = builder.build().unwrap();

    // The auto-created unnamed alias shares the recipe of "only".
    assert!(locator.same_binding(&Key::of::<dyn Plugin>(), &Key::named::<dyn Plugin>("only")));
    assert_eq!(locator.get_all::<dyn Plugin>().unwrap().len(), 1);
}

#[test]
fn test_empty_collections() {
    let locator = LocatorBuilder::new().build().unwrap();
    assert!(locator.get_all::<dyn Plugin>().unwrap().is_empty());
    assert!(locator.get_all_set::<dyn Plugin>().unwrap().is_empty());
    assert!(locator.get_named_map::<dyn Plugin>().unwrap().is_empty());
}

#[test]
fn test_set_deduplicates_by_identity() {
    let shared: Arc<dyn Plugin> = Arc::new(Named("shared"));
    let a = shared.clone();
    let b = shared.clone();

    let mut builder = LocatorBuilder::new();
    builder
        .into_set::<dyn Plugin, _>(move |_| Ok(a.clone()))
        .into_set::<dyn Plugin, _>(move |_| Ok(b.clone()))
        .into_set::<dyn Plugin, _>(|_| Ok(Arc::new(Named("other"))));
    let locator = builder.build().unwrap();

    assert_eq!(locator.get_all::<dyn Plugin>().unwrap().len(), 3);
    let set: InstanceSet<dyn Plugin> = locator.get_all_set().unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&shared));
}

#[test]
fn test_contributions_replace_implicit_aggregation() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("bound", |_| Ok(Arc::new(Named("bound"))))
        .into_set::<dyn Plugin, _>(|_| Ok(Arc::new(Named("c1"))))
        .into_set_singleton::<dyn Plugin, _>(|_| Ok(Arc::new(Named("c2"))));
    let locator = builder.build().unwrap();

    let all = locator.get_all::<dyn Plugin>().unwrap();
    assert_eq!(ids(&all), vec!["c1", "c2"]);
    assert_eq!(locator.contribution_count::<dyn Plugin>(), 2);

    let again = locator.get_all::<dyn Plugin>().unwrap();
    assert!(!Arc::ptr_eq(&all[0], &again[0]));
    assert!(Arc::ptr_eq(&all[1], &again[1]));
}

#[test]
fn test_map_from_qualifiers() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("b", |_| Ok(Arc::new(Named("b"))))
        .provide_named_trait::<dyn Plugin, _>("a", |_| Ok(Arc::new(Named("a"))))
        .provide_trait::<dyn Plugin, _>(|_| Ok(Arc::new(Named("unnamed"))));
    let locator = builder.build().unwrap();

    let map = locator.get_named_map::<dyn Plugin>().unwrap();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(map["a"].id(), "a");
}

#[test]
fn test_map_contributions_keep_order() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("ignored", |_| Ok(Arc::new(Named("ignored"))));
    builder
        .into_map::<dyn Plugin, _>("second", |_| Ok(Arc::new(Named("2"))))
        .unwrap()
        .into_map_singleton::<dyn Plugin, _>("first", |_| Ok(Arc::new(Named("1"))))
        .unwrap();
    let locator = builder.build().unwrap();

    let map: IndexMap<String, Arc<dyn Plugin>> = locator.get_named_map().unwrap();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["second", "first"]);
    assert_eq!(locator.contribution_count::<dyn Plugin>(), 2);
}

#[test]
fn test_map_key_validation() {
    let mut builder = LocatorBuilder::new();
    builder.into_map::<u8, _>("k", |_| Ok(Arc::new(1))).unwrap();

    match builder.into_map::<u8, _>("k", |_| Ok(Arc::new(2))) {
        Err(DiError::InvalidBinding(msg)) => assert!(msg.contains("Duplicate")),
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("duplicate key accepted"),
    }
    assert!(matches!(
        builder.into_map::<u8, _>("", |_| Ok(Arc::new(3))),
        Err(DiError::InvalidBinding(_))
    ));
    // The same key is fine for another value type.
    assert!(builder.into_map::<u16, _>("k", |_| Ok(Arc::new(4))).is_ok());
}

#[test]
fn test_qualified_collection_dependency_is_single_element() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("x", |_| Ok(Arc::new(Named("x"))))
        .provide_named_trait::<dyn Plugin, _>("y", |_| Ok(Arc::new(Named("y"))));
    let locator = builder.build().unwrap();

    let list = locator
        .resolve_dependency(&Dependency::list::<dyn Plugin>().qualified("y"))
        .unwrap()
        .into_list::<dyn Plugin>()
        .unwrap();
    assert_eq!(ids(&list), vec!["y"]);

    let map = locator
        .resolve_dependency(&Dependency::map::<dyn Plugin>().qualified("x"))
        .unwrap()
        .into_map::<dyn Plugin>()
        .unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["x"].id(), "x");
}

#[test]
fn test_constructor_collections() {
    struct Registry {
        list: Vec<Arc<dyn Plugin>>,
        set: InstanceSet<dyn Plugin>,
        map: IndexMap<String, Arc<dyn Plugin>>,
    }

    impl Injectable for Registry {
        fn parameters() -> Vec<Param> {
            vec![
                Param::list::<dyn Plugin>(),
                Param::set::<dyn Plugin>(),
                Param::map::<dyn Plugin>(),
            ]
        }

        fn construct(args: &mut Args) -> ConstructResult<Self> {
            Ok(Registry {
                list: args.list()?,
                set: args.set()?,
                map: args.map()?,
            })
        }
    }

    let mut builder = LocatorBuilder::new();
    builder
        .provide_named_trait::<dyn Plugin, _>("one", |_| Ok(Arc::new(Named("one"))))
        .provide_named_trait::<dyn Plugin, _>("two", |_| Ok(Arc::new(Named("two"))))
        .component::<Registry>();
    let locator = builder.build().unwrap();

    let registry = locator.get::<Registry>().unwrap();
    assert_eq!(ids(&registry.list), vec!["one", "two"]);
    assert_eq!(registry.set.len(), 2);
    assert_eq!(registry.map.len(), 2);
}

#[test]
fn test_get_dependency_requires_single_shape() {
    let mut builder = LocatorBuilder::new();
    builder.instance_named(1u8, "one");
    let locator = builder.build().unwrap();

    let one = locator
        .get_dependency::<u8>(&Dependency::single::<u8>().qualified("one"))
        .unwrap();
    assert_eq!(*one, 1);
    assert!(matches!(
        locator.get_dependency::<u8>(&Dependency::list::<u8>()),
        Err(DiError::InvalidDescriptor(_))
    ));
}

#[test]
fn test_non_string_map_keys_are_rejected() {
    #[allow(dead_code)]
    struct ByPort(IndexMap<String, Arc<u8>>);

    impl Injectable for ByPort {
        fn parameters() -> Vec<Param> {
            vec![Param::Inject(Dependency::map_keyed::<u16, u8>())]
        }
        fn construct(args: &mut Args) -> ConstructResult<Self> {
            Ok(ByPort(args.map()?))
        }
    }

    let mut builder = LocatorBuilder::new();
    builder.instance_named(1u8, "a").component::<ByPort>();
    let locator = builder.build().unwrap();

    assert!(matches!(locator.get::<ByPort>(), Err(DiError::InvalidDescriptor(_))));
}
