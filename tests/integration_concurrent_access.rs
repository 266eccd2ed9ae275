/// Concurrent access integration tests
///
/// These tests verify that shared bindings are produced exactly once under
/// contention and that cycle tracking stays local to each thread.

use ferrous_locator::{DiError, Key, LocatorBuilder, Resolver};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct ExpensiveService {
    id: u32,
}

#[test]
fn test_singleton_created_once_under_contention() {
    const THREADS: usize = 16;
    let created = Arc::new(AtomicU32::new(0));
    let c = created.clone();

    let mut builder = LocatorBuilder::new();
    builder.provide_singleton::<ExpensiveService, _>(move |_| {
        let id = c.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(ExpensiveService { id })
    });
    let locator = builder.build().unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let locator = locator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                locator.get::<ExpensiveService>().unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<ExpensiveService>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(results[0].id, 0);
}

#[test]
fn test_transient_resolutions_are_independent() {
    const THREADS: usize = 8;
    const PER_THREAD: u32 = 50;
    let created = Arc::new(AtomicU32::new(0));
    let c = created.clone();

    let mut builder = LocatorBuilder::new();
    builder.provide::<ExpensiveService, _>(move |_| {
        Ok(ExpensiveService { id: c.fetch_add(1, Ordering::SeqCst) })
    });
    let locator = builder.build().unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let locator = locator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    locator.get::<ExpensiveService>().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(created.load(Ordering::SeqCst), THREADS as u32 * PER_THREAD);
}

#[test]
fn test_singleton_depending_on_singleton_across_threads() {
    struct Config;
    struct Service {
        config: Arc<Config>,
    }

    let mut builder = LocatorBuilder::new();
    builder
        .provide_singleton::<Config, _>(|_| {
            thread::sleep(Duration::from_millis(5));
            Ok(Config)
        })
        .provide_singleton::<Service, _>(|ctx| Ok(Service { config: ctx.get()? }));
    let locator = builder.build().unwrap();

    let barrier = Arc::new(Barrier::new(6));
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let locator = locator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    locator.get::<Service>().unwrap().config.clone()
                } else {
                    locator.get::<Config>().unwrap()
                }
            })
        })
        .collect();

    let configs: Vec<Arc<Config>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(configs.iter().all(|c| Arc::ptr_eq(c, &configs[0])));
}

#[test]
fn test_cycles_detected_on_every_thread() {
    #[allow(dead_code)]
    struct Ping(Arc<Pong>);
    #[allow(dead_code)]
    struct Pong(Arc<Ping>);

    let mut builder = LocatorBuilder::new();
    builder
        .provide::<Ping, _>(|ctx| Ok(Ping(ctx.get()?)))
        .provide::<Pong, _>(|ctx| Ok(Pong(ctx.get()?)))
        .instance(1u8);
    let locator = builder.build().unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let locator = locator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let cyclic = matches!(locator.get::<Ping>(), Err(DiError::Circular { .. }));
                let plain = *locator.get::<u8>().unwrap() == 1;
                cyclic && plain
            })
        })
        .collect();

    assert!(handles.into_iter().all(|h| h.join().unwrap()));
}

#[test]
fn test_registration_while_resolving() {
    let locator = LocatorBuilder::new().build().unwrap();
    locator.register(Key::of::<u32>(), ferrous_locator::recipe_fn(|_| Ok(0u32)));

    let barrier = Arc::new(Barrier::new(2));
    let writer = {
        let locator = locator.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            for i in 0..100u64 {
                locator.register(Key::named::<u64>(format!("n{i}")), ferrous_locator::recipe_fn(move |_| Ok(i)));
            }
        })
    };
    let reader = {
        let locator = locator.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            (0..100).all(|_| locator.get::<u32>().is_ok())
        })
    };

    writer.join().unwrap();
    assert!(reader.join().unwrap());
    assert_eq!(locator.get_named_map::<u64>().unwrap().len(), 100);
}
