//! Integration tests for ExpiringStore.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use lapse_session::{Clock, ExpiringStore, SessionData, StoreConfig, Values};

/// Manually advanced clock shared between the test and the store.
#[derive(Clone)]
struct FakeClock(Arc<AtomicI64>);

impl FakeClock {
    fn new() -> Self {
        Self(Arc::new(AtomicI64::new(1_234_567_890)))
    }

    fn wait(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lapse_session=trace")
        .with_test_writer()
        .try_init();
}

/// Store with the background task disabled, driven by `clock`.
fn manual_store<V>(clock: &FakeClock) -> ExpiringStore<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    let config = StoreConfig::new().with_max_age(900).with_purge_task(false);
    ExpiringStore::with_clock(config, clock.clone()).expect("valid config")
}

fn bag(pairs: &[(&str, i64)]) -> Values<String, i64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_concurrent_save_and_get() {
    init_tracing();
    let clock = FakeClock::new();
    let store = manual_store::<i64>(&clock);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let id = format!("session-{}-{}", t, i % 10);
                    let mut values = store.get(&id).unwrap_or_default();
                    *values.entry("count".to_string()).or_insert(0) += 1;
                    store.save(id.clone(), &values);
                    // Our copy is ours alone
                    values.insert("scratch".to_string(), -1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 80);
    for t in 0..8 {
        for i in 0..10 {
            let values = store.poll(&format!("session-{}-{}", t, i)).unwrap();
            assert_eq!(values, bag(&[("count", 20)]));
        }
    }
}

#[test]
fn test_concurrent_purge_and_reads() {
    let clock = FakeClock::new();
    let store = manual_store::<i64>(&clock);
    for i in 0..100 {
        store.save(format!("old-{}", i), &bag(&[("n", i)]));
    }
    clock.wait(901);
    for i in 0..100 {
        store.save(format!("new-{}", i), &bag(&[("n", i)]));
    }

    let purger = {
        let store = store.clone();
        thread::spawn(move || (0..50).map(|_| store.purge()).sum::<usize>())
    };
    let reader = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..100 {
                assert!(store.get(&format!("old-{}", i)).is_none());
                assert_eq!(store.get(&format!("new-{}", i)), Some(bag(&[("n", i)])));
            }
        })
    };

    assert_eq!(purger.join().unwrap(), 100);
    reader.join().unwrap();
    assert_eq!(store.len(), 100);
}

#[test]
fn test_shared_values_are_shallow_copies() {
    let clock = FakeClock::new();
    let store = manual_store::<Arc<Vec<u8>>>(&clock);
    let payload = Arc::new(vec![1, 2, 3]);
    store.save("s1", &HashMap::from([("blob".to_string(), Arc::clone(&payload))]));

    let first = store.get("s1").unwrap();
    let second = store.poll("s1").unwrap();

    // The maps are distinct, the frozen values are shared
    assert!(Arc::ptr_eq(&first["blob"], &payload));
    assert!(Arc::ptr_eq(&second["blob"], &payload));
}

#[test]
fn test_timeline_scenario() {
    let clock = FakeClock::new();
    let store = manual_store::<i64>(&clock);

    let mut values = bag(&[("5", 8)]);
    store.save("key", &values);
    values.insert("5".to_string(), 10);
    store.save("key2", &values);

    clock.wait(899);
    assert_eq!(store.get("key"), Some(bag(&[("5", 8)])));
    clock.wait(1);
    assert_eq!(store.get("key2"), Some(bag(&[("5", 10)])));
    clock.wait(900);
    assert_eq!(store.get("key"), None);
    assert_eq!(store.get("key2"), Some(bag(&[("5", 10)])));
    clock.wait(901);
    assert_eq!(store.get("key"), None);
    assert_eq!(store.get("key2"), None);
}

#[test]
fn test_save_purge_interleaving() {
    let clock = FakeClock::new();
    let store = manual_store::<i64>(&clock);
    store.save("key1", &Values::new());
    store.save("key2", &Values::new());
    clock.wait(1);
    store.save("key3", &Values::new());

    store.purge();
    assert_eq!(store.len(), 3);

    clock.wait(900);
    store.purge();
    assert_eq!(store.len(), 1);
    assert!(store.poll("key3").is_some());
}

#[test]
fn test_poller_observes_without_extending() {
    let clock = FakeClock::new();
    let store = manual_store::<i64>(&clock);
    let poller = store.as_poller();
    store.save("s1", &bag(&[("count", 1)]));

    for _ in 0..9 {
        clock.wait(100);
        assert_eq!(poller.get_data("s1").unwrap(), Some(bag(&[("count", 1)])));
    }
    clock.wait(1);
    assert_eq!(poller.get_data("s1").unwrap(), None);
}

#[tokio::test]
async fn test_background_purge_and_shutdown() {
    init_tracing();
    let clock = FakeClock::new();
    let config = StoreConfig::new()
        .with_max_age(900)
        .with_purge_interval(Duration::from_millis(10));
    let store: ExpiringStore<String, i64> =
        ExpiringStore::with_clock(config, clock.clone()).expect("valid config");

    store.save("s1", &bag(&[("count", 1)]));
    clock.wait(901);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.is_empty());

    store.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!store.is_purge_task_running());

    store.save("s2", &bag(&[("count", 2)]));
    clock.wait(901);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_config_from_toml() {
    let config = StoreConfig::from_toml_str(
        r#"
        max_age_secs = 60
        enable_purge_task = false
        "#,
    )
    .expect("valid toml");
    let store: ExpiringStore<String, i64> = ExpiringStore::with_config(config).unwrap();

    assert_eq!(store.max_age(), Duration::from_secs(60));
    assert!(!store.is_purge_task_running());
}
