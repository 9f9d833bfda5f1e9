use std::{sync::Arc, thread, time::Duration};

use cache::{Options, Store, TaggedStore};
use dashcache::DashStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

#[test]
fn primitives() {
    let store = DashStore::new();
    let opts = Options::default();

    assert_eq!(store.get("k", &opts).unwrap(), None);
    store.set("k", b"v".to_vec(), &opts).unwrap();

    assert_eq!(store.get("k", &opts).unwrap(), Some(b"v".to_vec()));
    assert!(store.exists("k").unwrap());
    assert_eq!(store.len(), 1);

    let found = store.get_multi(&["k", "missing"]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get("k"), Some(&b"v".to_vec()));

    assert!(store.delete("k", &opts).unwrap());
    assert!(!store.delete("k", &opts).unwrap());
    assert!(!store.exists("k").unwrap());
    assert!(store.is_empty());
}

#[test]
fn expired_slots_read_as_absent() {
    let store = DashStore::new();
    store
        .set(
            "short",
            b"v".to_vec(),
            &Options::new().expires_in(Duration::from_millis(20)),
        )
        .unwrap();
    store.set("long", b"v".to_vec(), &Options::default()).unwrap();

    thread::sleep(Duration::from_millis(60));

    assert_eq!(store.get("short", &Options::default()).unwrap(), None);
    assert!(!store.exists("short").unwrap());
    assert_eq!(store.keys(), ["long"]);
}

#[test]
fn increment_creates_then_bumps() {
    let store = DashStore::new();

    assert_eq!(store.increment("n").unwrap(), 1);
    assert_eq!(store.increment("n").unwrap(), 2);
    assert_eq!(
        store.get("n", &Options::default()).unwrap(),
        Some(b"2".to_vec())
    );

    store.set("junk", b"abc".to_vec(), &Options::default()).unwrap();
    assert_eq!(store.increment("junk").unwrap(), 1);
}

#[test]
fn increment_is_atomic_across_threads() {
    let store = Arc::new(DashStore::new());

    let handles = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    store.increment("counter").unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.increment("counter").unwrap(), 4001);
}

#[test]
fn tagged_store_over_dash_store() {
    let store = TaggedStore::new(DashStore::new());
    let alice = User {
        id: 1,
        name: "alice".to_owned(),
    };

    store
        .set("user:1", &alice, &Options::new().tag("users").tag("user:1"))
        .unwrap();
    store
        .set("count", &1usize, &Options::new().tag("users"))
        .unwrap();

    assert_eq!(
        store.get::<User>("user:1", &Options::default()).unwrap(),
        Some(alice.clone())
    );

    store.delete_tag(["user:1"]).unwrap();

    assert_eq!(store.get::<User>("user:1", &Options::default()).unwrap(), None);
    assert!(!store.inner().exists("user:1").unwrap());
    assert_eq!(
        store.get::<usize>("count", &Options::default()).unwrap(),
        Some(1)
    );

    let fetched = store
        .fetch("user:1", &Options::new().tag("user:1"), || alice.clone())
        .unwrap();
    assert_eq!(fetched, alice);
    assert!(store.exists("user:1").unwrap());
}

#[test]
fn ttl_passes_through_tagged_writes() {
    let store = TaggedStore::new(DashStore::new());

    store
        .set(
            "k",
            &"v".to_owned(),
            &Options::new()
                .tag("a")
                .expires_in(Duration::from_millis(20)),
        )
        .unwrap();
    thread::sleep(Duration::from_millis(60));

    assert_eq!(store.get::<String>("k", &Options::default()).unwrap(), None);
    // tag counters never carry the entry's ttl
    assert_eq!(store.tag_versions(["a"]).unwrap(), [("a".to_owned(), Some(1))]);
}

#[test]
fn invalidation_is_visible_to_every_thread() {
    let store = Arc::new(TaggedStore::new(DashStore::new()));

    let writers = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("k:{}:{}", t, i);
                    store
                        .set(&key, &i, &Options::new().tag("shared").tag(format!("t{}", t)))
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for writer in writers {
        writer.join().unwrap();
    }

    let keys = (0..4)
        .flat_map(|t| (0..50).map(move |i| format!("k:{}:{}", t, i)))
        .collect::<Vec<_>>();
    assert_eq!(store.get_multi::<i32, _>(&keys).unwrap().len(), 200);

    store.delete_tag(["shared"]).unwrap();

    let readers = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..50).all(|i| {
                    store
                        .get::<i32>(&format!("k:{}:{}", t, i), &Options::default())
                        .unwrap()
                        .is_none()
                })
            })
        })
        .collect::<Vec<_>>();
    for reader in readers {
        assert!(reader.join().unwrap());
    }

    assert!(store.get_multi::<i32, _>(&keys).unwrap().is_empty());
    assert!(store.inner().keys().iter().all(|key| key.starts_with("tag:")));
}
