//! Integration Tests for the Cache Engine
//!
//! Exercises `MediaCache` through its public API: hit/miss accounting,
//! expiry, pinning, memory ceiling, persistence and events.

use std::fs;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use media_cache::cache::{
    media_codecs, CacheEvent, EvictionReason, InvalidationStrategy, ManualClock, MediaCache,
    NoopWarmupSource, Payload, SEARCH_CATEGORY,
};
use media_cache::models::MediaItem;
use media_cache::{CacheError, Config};
use serde_json::json;

// == Helper Functions ==

fn config() -> Config {
    Config {
        persistence_path: None,
        ..Config::default()
    }
}

fn cache_with(config: Config) -> (MediaCache, ManualClock) {
    let clock = ManualClock::starting_now();
    let cache = MediaCache::with_clock(&config, media_codecs(), Arc::new(clock.clone()));
    (cache, clock)
}

fn text(value: &str) -> Payload {
    Arc::new(value.to_string())
}

fn song(id: i64) -> MediaItem {
    MediaItem {
        genre1: "Jazz".to_string(),
        played_times: id as u32,
        ..MediaItem::new(id, format!("Artist {id}"), format!("Song {id}"))
    }
}

// == Hit / Miss ==

#[test]
fn test_unknown_key_always_misses() {
    let (cache, _) = cache_with(config());

    for i in 0..5 {
        assert!(cache.get(&format!("music:music:{i}"), "music").is_none());
    }
    assert_eq!(cache.statistics().total_misses, 5);
    assert_eq!(cache.statistics().total_hits, 0);
}

#[test]
fn test_put_get_remove_scenario() {
    let (cache, _) = cache_with(config());
    let song_a = song(1);

    cache.put("music:music:1", Arc::new(song_a.clone()), "music", None);
    assert_eq!(cache.get_as::<MediaItem>("music:music:1", "music"), Some(song_a));
    assert_eq!(cache.statistics().total_hits, 1);

    assert!(cache.remove("music:music:1", "music"));
    assert!(cache.get("music:music:1", "music").is_none());

    let stats = cache.statistics();
    assert_eq!(stats.total_hits, 1);
    assert_eq!(stats.total_misses, 1);
}

#[test]
fn test_hit_ratio_three_hits_one_miss() {
    let (cache, _) = cache_with(config());
    cache.put("k", text("v"), "music", None);

    cache.get("k", "music");
    cache.get("k", "music");
    cache.get("k", "music");
    cache.get("missing", "music");

    assert_eq!(cache.statistics().hit_ratio, 0.75);
}

#[test]
fn test_hit_ratio_zero_without_accesses() {
    let (cache, _) = cache_with(config());
    assert_eq!(cache.statistics().hit_ratio, 0.0);
}

// == Expiry ==

#[test]
fn test_time_based_expiry_with_real_clock() {
    let cache = MediaCache::new(
        &Config {
            invalidation_strategy: InvalidationStrategy::TimeBased,
            ..config()
        },
        media_codecs(),
    );

    cache.put("k", text("v"), "music", Some(Duration::from_secs(1)));
    assert!(cache.contains("k", "music"));

    sleep(Duration::from_secs(2));
    assert!(!cache.contains("k", "music"));
}

#[test]
fn test_access_based_expiry_follows_idle_time() {
    let (cache, clock) = cache_with(Config {
        invalidation_strategy: InvalidationStrategy::AccessBased,
        default_expiration_seconds: 60,
        ..config()
    });
    cache.put("k", text("v"), "music", Some(Duration::from_secs(3600)));

    clock.advance(Duration::from_secs(50));
    assert!(cache.get("k", "music").is_some());

    clock.advance(Duration::from_secs(50));
    assert!(cache.contains("k", "music"));

    clock.advance(Duration::from_secs(20));
    assert!(!cache.contains("k", "music"));
}

#[test]
fn test_smart_expiry_idle_safety_net() {
    let (cache, clock) = cache_with(Config {
        default_expiration_seconds: 60,
        ..config()
    });
    // TTL far in the future, but idle longer than twice the default
    cache.put("k", text("v"), "music", Some(Duration::from_secs(3600)));

    clock.advance(Duration::from_secs(121));
    assert!(!cache.contains("k", "music"));
}

#[test]
fn test_manual_strategy_never_expires() {
    let (cache, clock) = cache_with(Config {
        invalidation_strategy: InvalidationStrategy::Manual,
        ..config()
    });
    cache.put("k", text("v"), "music", Some(Duration::from_secs(1)));

    clock.advance(Duration::from_secs(86_400));
    assert!(cache.contains("k", "music"));
    assert_eq!(cache.invalidate_expired().entries_removed, 0);
}

#[test]
fn test_version_bump_invalidates_category() {
    let (cache, _) = cache_with(Config {
        invalidation_strategy: InvalidationStrategy::VersionBased,
        ..config()
    });
    cache.put("music:music:1", text("old"), "music", None);
    cache.put("search:abc", text("kept"), SEARCH_CATEGORY, None);

    cache.bump_version("music");

    assert!(!cache.contains("music:music:1", "music"));
    assert!(cache.contains("search:abc", SEARCH_CATEGORY));

    cache.put("music:music:1", text("new"), "music", None);
    assert!(cache.contains("music:music:1", "music"));
}

#[test]
fn test_zero_default_expiration_means_no_ttl() {
    let (cache, clock) = cache_with(Config {
        default_expiration_seconds: 0,
        ..config()
    });
    cache.put("k", text("v"), "music", None);

    assert!(cache.entry_info("k").unwrap().expires_at.is_none());
    clock.advance(Duration::from_secs(10 * 86_400));
    assert!(cache.contains("k", "music"));
}

// == Memory Ceiling and Pinning ==

#[test]
fn test_small_ceiling_holds_after_many_puts() {
    let (cache, _) = cache_with(Config {
        max_memory_bytes: 1024,
        ..config()
    });

    for i in 0..50 {
        cache.put(&format!("music:music:{i}"), Arc::new(song(i)), "music", None);
        assert!(cache.current_memory_usage() <= 1024);
    }

    assert!(cache.current_memory_usage() <= 1024);
    assert!(cache.verify_accounting());
    assert!(cache.statistics().total_evictions > 0);
}

#[test]
fn test_oversized_put_evicts_and_reports_threshold() {
    let (cache, clock) = cache_with(Config {
        max_memory_bytes: 1024,
        ..config()
    });
    for i in 0..10 {
        clock.advance(Duration::from_secs(1));
        cache.put(&format!("k{i}"), text(&"x".repeat(50)), "music", None);
    }
    assert_eq!(cache.current_memory_usage(), 520);
    let mut rx = cache.subscribe();

    cache.put("big", text(&"y".repeat(2000)), "music", None);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.current_memory_usage(), 2003);
    let events: Vec<CacheEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(events.contains(&CacheEvent::MemoryThresholdExceeded {
        current: 2003,
        max: 1024
    }));
    assert_eq!(cache.statistics().total_evictions, 10);
}

#[test]
fn test_put_under_target_makes_room_for_large_entry() {
    let (cache, clock) = cache_with(Config {
        max_memory_bytes: 1024,
        ..config()
    });
    for i in 0..10 {
        clock.advance(Duration::from_secs(1));
        cache.put(&format!("k{i}"), text(&"x".repeat(68)), "music", None);
    }
    // 700 of 1024 used, below the 716 cleanup target
    assert_eq!(cache.current_memory_usage(), 700);

    cache.put("big", text(&"y".repeat(397)), "music", None);

    assert!(cache.contains("big", "music"));
    assert!(cache.current_memory_usage() <= 1024);
    assert!(!cache.contains("k0", "music"));
    assert!(cache.verify_accounting());
}

#[test]
fn test_pinned_entry_survives_eviction() {
    let (cache, clock) = cache_with(config());
    cache.put_item(0, song(0), "music", None);
    cache.pin("music:music:0", "music");

    for i in 1..=10 {
        clock.advance(Duration::from_secs(1));
        cache.put_item(i, song(i), "music", None);
    }

    // Ceiling below total data volume
    let total = cache.current_memory_usage();
    cache.set_max_memory_bytes(total / 2);
    for i in 11..=15 {
        clock.advance(Duration::from_secs(1));
        cache.put_item(i, song(i), "music", None);
    }

    assert!(cache.contains_item(0, "music"));
    assert!(!cache.contains_item(1, "music"));
    assert!(cache.current_memory_usage() <= total / 2);
}

#[test]
fn test_all_pinned_cleanup_reports_threshold() {
    let (cache, _) = cache_with(config());
    for i in 0..4 {
        let key = format!("k{i}");
        cache.put(&key, text("0123456789"), "music", None);
        cache.pin(&key, "music");
    }
    let mut rx = cache.subscribe();
    let before = cache.current_memory_usage();

    let summary = cache.cleanup(Some(0)).unwrap();

    assert_eq!(summary.entries_removed, 0);
    assert_eq!(cache.current_memory_usage(), before);

    let events: Vec<CacheEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, CacheEvent::MemoryThresholdExceeded { current, .. } if *current == before)));
}

#[test]
fn test_expiry_still_applies_to_pinned_entries() {
    let (cache, clock) = cache_with(config());
    cache.put("k", text("v"), "music", Some(Duration::from_secs(5)));
    cache.pin("k", "music");

    clock.advance(Duration::from_secs(6));

    assert_eq!(cache.invalidate_expired().entries_removed, 1);
    assert!(cache.is_empty());
}

// == Persistence ==

#[test]
fn test_persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let (cache, _) = cache_with(Config {
        default_expiration_seconds: 0,
        ..config()
    });

    cache.put_item(1, song(1), "music", None);
    cache.put_item(2, song(2), "favourites", None);
    cache.put_search_results("genre:jazz", vec![song(3), song(4)], None);
    cache.put_metadata("cover:1", json!({"url": "c.png"}), "metadata", None);
    cache.put("raw", text("plain text"), "notes", None);
    cache.pin("raw", "notes");

    assert_eq!(cache.save_to_file(&path).unwrap(), 5);
    cache.clear();
    assert!(cache.is_empty());

    assert_eq!(cache.load_from_file(&path).unwrap(), 5);

    assert_eq!(cache.get_item(1, "music"), Some(song(1)));
    assert_eq!(cache.get_item(2, "favourites"), Some(song(2)));
    assert_eq!(
        cache.get_search_results("genre:jazz"),
        Some(vec![song(3), song(4)])
    );
    assert_eq!(
        cache.get_metadata("cover:1", "metadata"),
        Some(json!({"url": "c.png"}))
    );
    assert_eq!(cache.get_as::<String>("raw", "notes").as_deref(), Some("plain text"));

    let raw = cache.entry_info("raw").unwrap();
    assert_eq!(raw.category, "notes");
    assert!(raw.is_pinned);
    assert!(cache.verify_accounting());
}

#[test]
fn test_load_skips_entries_stale_under_current_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let (cache, clock) = cache_with(config());
    cache.put("short", text("v"), "music", Some(Duration::from_secs(10)));
    cache.put("long", text("v"), "music", Some(Duration::from_secs(1000)));
    cache.save_to_file(&path).unwrap();
    cache.clear();

    clock.advance(Duration::from_secs(20));

    assert_eq!(cache.load_from_file(&path).unwrap(), 1);
    assert_eq!(cache.keys(None), vec!["long".to_string()]);
}

#[test]
fn test_malformed_snapshot_leaves_cache_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{"version": "1.0", "entries": [{"createdAt": "#).unwrap();

    let (cache, _) = cache_with(config());
    cache.put("k", text("v"), "music", None);
    let usage = cache.current_memory_usage();

    let result = cache.load_from_file(&path);

    assert!(matches!(result, Err(CacheError::MalformedSnapshot(_))));
    assert_eq!(cache.keys(None), vec!["k".to_string()]);
    assert_eq!(cache.current_memory_usage(), usage);
}

#[test]
fn test_snapshot_entry_without_key_rejects_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nokey.json");
    let document = json!({
        "version": "1.0",
        "entries": [
            {"category": "music", "payload": {"type": "text", "data": "a"}},
        ]
    });
    fs::write(&path, document.to_string()).unwrap();

    let (cache, _) = cache_with(config());

    assert!(cache.load_from_file(&path).is_err());
    assert!(cache.is_empty());
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = cache_with(config());

    let result = cache.load_from_file(&dir.path().join("absent.json"));

    assert!(matches!(result, Err(CacheError::Io(_))));
}

#[test]
fn test_save_to_unwritable_path_fails_softly() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();
    let (cache, _) = cache_with(config());
    cache.put("k", text("v"), "music", None);

    let result = cache.save_to_file(&blocker.join("cache.json"));

    assert!(result.is_err());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_initialize_and_shutdown_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("cache.json");
    let persistent = Config {
        auto_persistence: true,
        persistence_path: Some(path.clone()),
        ..Config::default()
    };

    let (first, _) = cache_with(persistent.clone());
    assert_eq!(first.initialize().unwrap(), 0);
    first.put_item(9, song(9), "music", None);
    first.shutdown().unwrap();
    assert!(first.is_empty());
    assert!(path.exists());

    let (second, _) = cache_with(persistent);
    assert_eq!(second.initialize().unwrap(), 1);
    assert_eq!(second.get_item(9, "music"), Some(song(9)));
}

// == Events ==

#[test]
fn test_event_stream_for_expired_read() {
    let (cache, clock) = cache_with(config());
    let mut rx = cache.subscribe();
    cache.put("k", text("v"), "music", Some(Duration::from_secs(1)));
    cache.get("k", "music");

    clock.advance(Duration::from_secs(2));
    cache.get("k", "music");

    let events: Vec<CacheEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        events,
        vec![
            CacheEvent::Hit {
                key: "k".to_string(),
                category: "music".to_string(),
            },
            CacheEvent::Evicted {
                key: "k".to_string(),
                category: "music".to_string(),
                reason: EvictionReason::Expired,
            },
            CacheEvent::Miss {
                key: "k".to_string(),
                category: "music".to_string(),
            },
        ]
    );
}

#[test]
fn test_warmup_with_noop_source() {
    let (cache, _) = cache_with(config());
    let mut rx = cache.subscribe();

    assert_eq!(cache.warmup(&NoopWarmupSource), 0);

    assert!(matches!(
        rx.try_recv().unwrap(),
        CacheEvent::WarmupCompleted { entries_warmed: 0 }
    ));
    assert!(cache.statistics().last_warmup.is_some());
}

#[test]
fn test_concurrent_access_keeps_accounting() {
    let cache = Arc::new(cache_with(Config {
        max_memory_bytes: 4096,
        ..config()
    })
    .0);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("music:music:{}", (t * 31 + i) % 64);
                    cache.put(&key, Arc::new(song(i)), "music", None);
                    cache.get(&key, "music");
                    if i % 7 == 0 {
                        cache.remove(&key, "music");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.verify_accounting());
    assert!(cache.current_memory_usage() <= 4096);
}
