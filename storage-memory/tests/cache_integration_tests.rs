use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared::config::Config;
use shared::{Error, TtlSecs};
use std::sync::{Arc, Mutex};
use storage_memory::{MemoryStore, MemoryStoreFactory};
use stratus::cache::{BucketedCache, Clock};
use stratus::envelope::HEADER_SIZE;
use stratus::lifecycle;
use stratus::ports::ObjectStore;
use stratus::serializer::{JsonSerializer, TypedCache};

struct ManualClock(Mutex<f64>);

impl ManualClock {
    fn at(now: f64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn advance(&self, secs: f64) {
        *self.0.lock().unwrap() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

fn harness() -> (BucketedCache, Arc<MemoryStore>, Arc<ManualClock>) {
    // header-sized chunks so early-exit reads are byte-exact in the stats
    let store = Arc::new(MemoryStore::with_chunk_size(HEADER_SIZE));
    let factory = Arc::new(MemoryStoreFactory::new(Arc::clone(&store)));
    let clock = ManualClock::at(1_000_000.0);
    let config = Config::new("integration-bucket", 1, vec![1, 7, 30]);
    let cache = BucketedCache::with_clock(config, factory, clock.clone()).unwrap();
    (cache, store, clock)
}

#[tokio::test]
async fn session_entry_full_lifecycle() {
    let (cache, store, clock) = harness();
    let payload = Bytes::from(vec![0xEE; 32 * 1024]);

    // write lands under the 7-days prefix
    cache
        .set("session:42", payload.clone(), Some(TtlSecs::from_days(7)))
        .await
        .unwrap();
    assert!(store.exists("7-days/session:42").await.unwrap());

    // liveness within the ttl, header bytes only
    assert!(cache.has_key("session:42").await.unwrap());
    assert_eq!(store.stats().stream_reads, 0);
    assert_eq!(store.stats().bytes_streamed, 0);

    // a hit returns the exact payload
    assert_eq!(cache.get("session:42").await.unwrap(), Some(payload));

    // past the expiration the header alone rules the entry out
    clock.advance(8.0 * 86_400.0);
    let streamed_before = store.stats().bytes_streamed;
    assert!(!cache.has_key("session:42").await.unwrap());
    assert_eq!(store.stats().bytes_streamed, streamed_before);

    assert_eq!(cache.get("session:42").await.unwrap(), None);
    assert_eq!(
        store.stats().bytes_streamed,
        streamed_before + HEADER_SIZE as u64
    );

    // the physical object lingers for the lifecycle rule to reap
    assert!(store.exists("7-days/session:42").await.unwrap());

    cache.delete("session:42").await.unwrap();
    assert!(store.is_empty());
    assert_eq!(cache.get("session:42").await.unwrap(), None);
}

#[tokio::test]
async fn persistent_entries_outlive_any_clock() {
    let (cache, store, clock) = harness();

    cache
        .set("settings", Bytes::from_static(b"{}"), None)
        .await
        .unwrap();
    assert!(store.exists("persistent/settings").await.unwrap());

    clock.advance(365.0 * 86_400.0);
    assert!(cache.has_key("settings").await.unwrap());
    assert_eq!(
        cache.get("settings").await.unwrap(),
        Some(Bytes::from_static(b"{}"))
    );
}

#[tokio::test]
async fn rewriting_with_a_longer_ttl_moves_buckets() {
    let (cache, store, _) = harness();

    cache
        .set("k", Bytes::from_static(b"short"), Some(TtlSecs::from_hours(6)))
        .await
        .unwrap();
    cache
        .set("k", Bytes::from_static(b"long"), Some(TtlSecs::from_days(20)))
        .await
        .unwrap();

    // the rewrite evicted the tighter-bucket copy; the new value wins now,
    // not after the old copy's ttl runs out
    assert!(!store.exists("1-day/k").await.unwrap());
    assert!(store.exists("30-days/k").await.unwrap());
    assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from_static(b"long")));

    assert!(cache.delete("k").await.unwrap());
    assert!(store.is_empty());
}

#[tokio::test]
async fn oversized_ttl_surfaces_a_configuration_error() {
    let (cache, _, _) = harness();
    let err = cache
        .set("k", Bytes::new(), Some(TtlSecs::from_days(31)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TtlExceedsAllBuckets { .. }));
}

#[tokio::test]
async fn factory_connects_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let factory = Arc::new(MemoryStoreFactory::new(Arc::clone(&store)));
    let config = Config::new("integration-bucket", 1, vec![1]);
    let cache = BucketedCache::new(config, factory.clone()).unwrap();

    assert_eq!(factory.connect_count(), 0);
    for _ in 0..5 {
        cache.has_key("k").await.unwrap();
    }
    assert_eq!(factory.connect_count(), 1);
}

#[tokio::test]
async fn concurrent_first_uses_share_one_connect() {
    let store = Arc::new(MemoryStore::new());
    let factory = Arc::new(MemoryStoreFactory::new(Arc::clone(&store)));
    let config = Config::new("integration-bucket", 1, vec![1]);
    let cache = BucketedCache::new(config, factory.clone()).unwrap();

    let (a, b, c, d) = tokio::join!(
        cache.has_key("k"),
        cache.get("k"),
        cache.has_key("k"),
        cache.delete("k"),
    );
    assert!(!a.unwrap());
    assert!(b.unwrap().is_none());
    assert!(!c.unwrap());
    assert!(!d.unwrap());

    assert_eq!(factory.connect_count(), 1);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user_id: u64,
    roles: Vec<String>,
}

#[tokio::test]
async fn typed_cache_round_trips_through_the_serializer() {
    let (cache, _, _) = harness();
    let typed = TypedCache::new(cache, JsonSerializer);
    let session = Session {
        user_id: 42,
        roles: vec!["admin".to_string()],
    };

    typed
        .set("session:42", &session, Some(TtlSecs::from_days(1)))
        .await
        .unwrap();

    assert!(typed.has_key("session:42").await.unwrap());
    assert_eq!(typed.get("session:42").await.unwrap(), Some(session));

    typed.delete("session:42").await.unwrap();
    assert_eq!(typed.get("session:42").await.unwrap(), None);
}

#[test]
fn lifecycle_rules_line_up_with_the_write_prefixes() {
    let config = Config::new("integration-bucket", 1, vec![1, 7, 30]);
    let layout = stratus::buckets::BucketLayout::new(config.bucket_days).unwrap();
    let prefixes: Vec<String> = lifecycle::rules_for(&layout)
        .into_iter()
        .map(|rule| rule.prefix)
        .collect();
    assert_eq!(prefixes, vec!["1-day/", "7-days/", "30-days/"]);
}
