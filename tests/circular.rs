use ferrous_locator::{
    factory_interface, recipe_fn, Args, ConstructResult, DiError, Injectable, Key, LocatorBuilder,
    Param, Resolver,
};
use std::sync::Arc;

#[allow(dead_code)]
struct ServiceA(Arc<ServiceB>);
#[allow(dead_code)]
struct ServiceB(Arc<ServiceA>);

#[test]
fn test_two_step_cycle_reports_path() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide::<ServiceA, _>(|ctx| Ok(ServiceA(ctx.get::<ServiceB>()?)))
        .provide::<ServiceB, _>(|ctx| Ok(ServiceB(ctx.get::<ServiceA>()?)));
    let locator = builder.build().unwrap();

    match locator.get::<ServiceA>() {
        Err(DiError::Circular { path }) => {
            assert_eq!(path.len(), 3);
            assert!(path[0].ends_with("ServiceA"));
            assert!(path[1].ends_with("ServiceB"));
            assert!(path[2].ends_with("ServiceA"));
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("cycle not detected"),
    }
}

#[test]
fn test_chain_is_clean_after_failure() {
    let mut builder = LocatorBuilder::new();
    builder
        .provide::<ServiceA, _>(|ctx| Ok(ServiceA(ctx.get::<ServiceB>()?)))
        .provide::<ServiceB, _>(|ctx| Ok(ServiceB(ctx.get::<ServiceA>()?)))
        .instance(1u8);
    let locator = builder.build().unwrap();

    for _ in 0..3 {
        assert!(matches!(locator.get::<ServiceB>(), Err(DiError::Circular { .. })));
    }
    // Unrelated resolutions are unaffected.
    assert_eq!(*locator.get::<u8>().unwrap(), 1);
}

#[test]
fn test_self_dependency_through_constructor() {
    #[allow(dead_code)]
    struct Node(Arc<Node>);

    impl Injectable for Node {
        fn parameters() -> Vec<Param> {
            vec![Param::inject::<Node>()]
        }
        fn construct(args: &mut Args) -> ConstructResult<Self> {
            Ok(Node(args.inject()?))
        }
    }

    let mut builder = LocatorBuilder::new();
    builder.component::<Node>();
    let locator = builder.build().unwrap();

    match locator.get::<Node>() {
        Err(DiError::Circular { path }) => assert_eq!(path.len(), 2),
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("cycle not detected"),
    }
}

#[test]
fn test_cycle_through_qualified_key() {
    #[allow(dead_code)]
    struct Left(Arc<Right>);
    #[allow(dead_code)]
    struct Right(Arc<Left>);

    let mut builder = LocatorBuilder::new();
    builder
        .provide_named::<Left, _>("l", |ctx| Ok(Left(ctx.get_named::<Right>("r")?)))
        .provide_named::<Right, _>("r", |ctx| Ok(Right(ctx.get_named::<Left>("l")?)));
    let locator = builder.build().unwrap();

    match locator.get_named::<Left>("l") {
        Err(DiError::Circular { path }) => {
            assert!(path[0].contains("[name=l]"));
            assert!(path[1].contains("[name=r]"));
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("cycle not detected"),
    }
}

#[test]
fn test_repeated_dependency_is_not_a_cycle() {
    struct Shared;
    struct Pair(Arc<Shared>, Arc<Shared>);

    let mut builder = LocatorBuilder::new();
    builder
        .provide_singleton::<Shared, _>(|_| Ok(Shared))
        .provide::<Pair, _>(|ctx| Ok(Pair(ctx.get()?, ctx.get()?)));
    let locator = builder.build().unwrap();

    let pair = locator.get::<Pair>().unwrap();
    assert!(Arc::ptr_eq(&pair.0, &pair.1));
}

#[test]
fn test_nesting_depth_is_visible_in_context() {
    struct Outer(usize);
    struct Inner(usize);

    let mut builder = LocatorBuilder::new();
    builder
        .provide::<Inner, _>(|ctx| Ok(Inner(ctx.depth())))
        .provide::<Outer, _>(|ctx| {
            let inner = ctx.get::<Inner>()?;
            Ok(Outer(inner.0 - ctx.depth()))
        });
    let locator = builder.build().unwrap();

    assert_eq!(locator.get::<Outer>().unwrap().0, 1);
}

struct Owner;

#[allow(dead_code)]
struct Part {
    owner: Arc<Owner>,
    size: u32,
}

impl Injectable for Part {
    fn parameters() -> Vec<Param> {
        vec![Param::inject::<Owner>(), Param::assisted::<u32>()]
    }
    fn construct(args: &mut Args) -> ConstructResult<Self> {
        Ok(Part { owner: args.inject()?, size: args.assisted()? })
    }
}

factory_interface! {
    trait PartFactory {
        fn make(&self, size: u32) -> Part;
    }
}

#[test]
fn test_cycle_through_factory_call() {
    let mut builder = LocatorBuilder::new();
    builder
        .bind_factory::<dyn PartFactory>()
        .provide::<Owner, _>(|ctx| {
            ctx.get::<dyn PartFactory>()?.make(1)?;
            Ok(Owner)
        });
    let locator = builder.build().unwrap();

    match locator.get::<Owner>() {
        Err(DiError::Circular { path }) => {
            assert!(path[0].ends_with("Owner"));
            assert!(path[path.len() - 1].ends_with("Owner"));
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("cycle not detected"),
    }

    // Outside a recipe the factory starts from an empty chain.
    locator.register(Key::of::<Owner>(), recipe_fn(|_| Ok(Owner)));
    let part = locator.get::<dyn PartFactory>().unwrap().make(7).unwrap();
    assert_eq!(part.size, 7);
}

#[test]
fn test_cycle_through_captured_locator() {
    struct Looping;

    let locator = LocatorBuilder::new().build().unwrap();
    let inner = locator.clone();
    locator.register(
        Key::of::<Looping>(),
        recipe_fn(move |_| {
            inner.get::<Looping>()?;
            Ok(Looping)
        }),
    );

    assert!(matches!(locator.get::<Looping>(), Err(DiError::Circular { .. })));
    locator.clear();
}

trait Plugin: Send + Sync {}
struct Basic;
impl Plugin for Basic {}

#[test]
fn test_contribution_asking_for_its_own_collection() {
    let mut builder = LocatorBuilder::new();
    builder
        .into_set::<dyn Plugin, _>(|_| Ok(Arc::new(Basic)))
        .into_set::<dyn Plugin, _>(|ctx| {
            ctx.get_all::<dyn Plugin>()?;
            Ok(Arc::new(Basic))
        });
    let locator = builder.build().unwrap();

    match locator.get_all::<dyn Plugin>() {
        Err(DiError::Circular { path }) => {
            assert_eq!(path.len(), 2);
            assert!(path[0].ends_with("set contributions"));
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("cycle not detected"),
    }
}

#[test]
fn test_map_contribution_asking_for_its_own_map() {
    let mut builder = LocatorBuilder::new();
    builder
        .into_map::<dyn Plugin, _>("basic", |ctx| {
            ctx.get_named_map::<dyn Plugin>()?;
            Ok(Arc::new(Basic))
        })
        .unwrap();
    let locator = builder.build().unwrap();

    assert!(matches!(
        locator.get_named_map::<dyn Plugin>(),
        Err(DiError::Circular { .. })
    ));
}

#[test]
fn test_contribution_may_read_other_collections() {
    let mut builder = LocatorBuilder::new();
    builder
        .instance_named(1u8, "one")
        .instance_named(2u8, "two")
        .into_set::<dyn Plugin, _>(|ctx| {
            assert_eq!(ctx.get_all::<u8>()?.len(), 2);
            Ok(Arc::new(Basic))
        });
    let locator = builder.build().unwrap();

    assert_eq!(locator.get_all::<dyn Plugin>().unwrap().len(), 1);
}
