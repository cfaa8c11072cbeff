//! Tests for CacheStore: TTL expiry, LRU eviction and bookkeeping

use std::sync::Arc;
use std::time::Duration;

use farmstats_shared::CacheConfig;
use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{advance, sleep};

use super::common::{ms, small_cache_config};
use crate::services::cache_store::CacheStore;

fn store() -> CacheStore<String, i32> {
    CacheStore::new(small_cache_config()).unwrap()
}

fn key(i: usize) -> String {
    format!("k{i}")
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let cache = store();
    cache.set_with_ttl("k".to_string(), 42, ms(100)).await;

    assert_eq!(cache.get("k").await, Some(42));

    advance(ms(150)).await;
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_entry_still_live_at_exact_expiry() {
    let cache = store();
    cache.set_with_ttl("k".to_string(), 7, ms(100)).await;

    advance(ms(100)).await;
    assert_eq!(cache.get("k").await, Some(7));
    assert_eq!(cache.statistics().await.expired_entries, 0);

    advance(ms(1)).await;
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_default_ttl_comes_from_config() {
    let cache: CacheStore<String, i32> = CacheStore::new(CacheConfig {
        default_ttl_secs: 2,
        ..small_cache_config()
    })
    .unwrap();
    cache.set("k".to_string(), 1).await;

    advance(Duration::from_millis(1999)).await;
    assert!(cache.contains("k").await);
    advance(ms(2)).await;
    assert!(!cache.contains("k").await);
}

#[tokio::test(start_paused = true)]
async fn test_expired_lookup_removes_entry_lazily() {
    let cache = store();
    cache.set_with_ttl("k".to_string(), 1, ms(10)).await;
    advance(ms(20)).await;

    assert_eq!(cache.get("k").await, None);
    assert_eq!(cache.len().await, 0);

    let stats = cache.statistics().await;
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_resets_expiry() {
    let cache = store();
    cache.set_with_ttl("k".to_string(), 1, ms(100)).await;
    advance(ms(80)).await;
    assert_eq!(cache.entry_age("k").await, Some(ms(80)));
    cache.set_with_ttl("k".to_string(), 2, ms(100)).await;
    assert_eq!(cache.entry_age("k").await, Some(Duration::ZERO));
    advance(ms(80)).await;

    assert_eq!(cache.get("k").await, Some(2));
    assert_eq!(cache.entry_age("missing").await, None);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_keeps_access_history() {
    let cache = store();
    cache.set("busy".to_string(), 1).await;
    cache.set("idle".to_string(), 2).await;
    for _ in 0..3 {
        cache.get("busy").await;
    }

    // Both written at the same instant: only the access count separates them
    cache.set("busy".to_string(), 10).await;
    cache.set("idle".to_string(), 20).await;

    let evicted = cache.evict_least_recent(1).await;
    assert_eq!(evicted, vec!["idle".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_evicts_least_recently_accessed() {
    let cache = store();
    for i in 0..6 {
        cache.set(key(i), i as i32).await;
        advance(ms(1)).await;
    }
    // Refresh the two oldest so they become the most recent
    cache.get("k0").await;
    advance(ms(1)).await;
    cache.get("k1").await;

    let mut evicted = cache.evict_least_recent(3).await;
    evicted.sort();
    assert_eq!(evicted, vec![key(2), key(3), key(4)]);
    assert!(cache.contains("k0").await);
    assert!(cache.contains("k1").await);
    assert!(cache.contains("k5").await);
}

#[tokio::test(start_paused = true)]
async fn test_emergency_eviction_on_new_key() {
    let cache = store();
    for i in 0..8 {
        cache.set(key(i), i as i32).await;
        advance(ms(1)).await;
    }
    cache.get("k0").await;
    advance(ms(1)).await;

    // 8 of 10 is the cleanup threshold: shrink to 7, then insert
    cache.set(key(8), 8).await;

    assert_eq!(cache.len().await, 8);
    assert!(!cache.contains("k1").await);
    assert!(cache.contains("k0").await);
    assert!(cache.contains("k8").await);
    assert_eq!(cache.statistics().await.evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_at_threshold_does_not_evict() {
    let cache = store();
    for i in 0..8 {
        cache.set(key(i), i as i32).await;
    }
    cache.set(key(3), 33).await;

    assert_eq!(cache.len().await, 8);
    assert_eq!(cache.statistics().await.evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_size_never_exceeds_max() {
    let cache = store();
    for i in 0..100 {
        cache.set(key(i), i as i32).await;
        assert!(cache.len().await <= 10);
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweep_removes_only_expired() {
    let cache = store();
    for i in 0..3 {
        cache.set_with_ttl(key(i), i as i32, ms(100)).await;
    }
    cache.set(key(9), 9).await;
    advance(ms(200)).await;

    assert_eq!(cache.statistics().await.expired_entries, 3);
    assert_eq!(cache.sweep_expired().await, 3);
    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.statistics().await.evictions, 3);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper() {
    let cache: Arc<CacheStore<String, i32>> = Arc::new(
        CacheStore::new(CacheConfig {
            sweep_interval_secs: 1,
            ..small_cache_config()
        })
        .unwrap(),
    );
    cache.set_with_ttl("short".to_string(), 1, ms(100)).await;
    cache.set("long".to_string(), 2).await;

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = CacheStore::spawn_sweeper(Arc::clone(&cache), shutdown_rx);

    sleep(ms(1500)).await;
    assert_eq!(cache.len().await, 1);
    assert!(cache.contains("long").await);

    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_invalidation() {
    let cache = store();
    cache.set("trend:earnings".to_string(), 1).await;
    cache.set("trend:crop_production".to_string(), 2).await;
    cache.set("comparison:overall".to_string(), 3).await;

    assert!(cache.invalidate("comparison:overall").await);
    assert!(!cache.invalidate("comparison:overall").await);

    assert_eq!(cache.invalidate_where(|k| k.starts_with("trend:")).await, 2);
    assert!(cache.is_empty().await);

    cache.set("dashboard".to_string(), 4).await;
    assert_eq!(cache.clear().await, 1);
    assert_eq!(cache.get("dashboard").await, None);
}

#[tokio::test]
async fn test_statistics_hit_rate() {
    let cache = store();
    cache.set("a".to_string(), 1).await;

    cache.get("a").await;
    cache.get("a").await;
    cache.get("a").await;
    cache.get("missing").await;

    let stats = cache.statistics().await;
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate, 0.75);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.max_size, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers() {
    let cache = Arc::new(store());
    cache.set("shared".to_string(), 7).await;

    let readers: Vec<_> = (0..32)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("shared").await })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.await.unwrap(), Some(7));
    }
    assert_eq!(cache.statistics().await.hits, 32);
}

#[test]
fn test_invalid_config_rejected() {
    let result: Result<CacheStore<String, i32>, _> = CacheStore::new(CacheConfig {
        max_size: 0,
        ..CacheConfig::default()
    });
    assert!(result.is_err());
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ttl_boundary(ttl_ms in 2u64..60_000, eps_fraction in 0.01f64..0.99) {
        let eps = ((ttl_ms as f64 * eps_fraction) as u64).max(1).min(ttl_ms - 1);
        let (before, after) = paused_runtime().block_on(async {
            let cache = store();
            cache.set_with_ttl("k".to_string(), 1, ms(ttl_ms)).await;
            advance(ms(ttl_ms - eps)).await;
            let before = cache.get("k").await;
            advance(ms(2 * eps)).await;
            let after = cache.get("k").await;
            (before, after)
        });
        prop_assert_eq!(before, Some(1));
        prop_assert_eq!(after, None);
    }

    #[test]
    fn prop_eviction_removes_least_recent(
        order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle(),
        k in 0usize..=8,
    ) {
        let (mut evicted, mut expected) = paused_runtime().block_on(async {
            let cache = store();
            for i in 0..8 {
                cache.set(key(i), i as i32).await;
            }
            advance(ms(1)).await;
            for i in &order {
                cache.get(key(*i).as_str()).await;
                advance(ms(1)).await;
            }
            let evicted = cache.evict_least_recent(k).await;
            let expected: Vec<String> = order.iter().take(k).map(|i| key(*i)).collect();
            (evicted, expected)
        });
        evicted.sort();
        expected.sort();
        prop_assert_eq!(evicted, expected);
    }
}
