/// integration tests for a full cold start through the engine facade
///
use async_std::task;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cache_bootstrap::bootstrap::SegmentStatus;
use cache_bootstrap::cache::Tier;
use cache_bootstrap::config::{EngineConfig, Timings};
use cache_bootstrap::membership::StaticProvider;
use cache_bootstrap::segments::{self, DEFAULT_ORDER};
use cache_bootstrap::store::{GuildRow, MemoryStore};
use cache_bootstrap::CacheEngine;

const TABLES: &str = r#"{
    "idol_photo_counts": [[1, 12]],
    "group_photo_counts": [[400, 30]],
    "notifications": [
        { "guild_id": 1, "user_id": 10, "phrase": "release" },
        { "guild_id": 2, "user_id": 11, "phrase": "patch notes" }
    ],
    "mod_mail": [[10, 5000]],
    "bot_bans": [12],
    "logged_servers": [{ "id": 1, "guild_id": 1, "channel_id": 60, "send_all": true }],
    "logged_channels": [[1, 61], [1, 62]],
    "server_prefixes": [[1, "!"], [2, "?"]],
    "welcome_messages": [
        { "channel_id": 70, "guild_id": 1, "message": "welcome {user}", "enabled": true }
    ],
    "temp_channels": [[80, 5]],
    "word_counts": [[10, 2]],
    "command_counts": [["help", 40]],
    "idols": [
        { "id": 1, "full_name": "Kim Jisoo", "stage_name": "Jisoo", "gender": "female", "difficulty": "easy" },
        { "id": 2, "full_name": "Park Chaeyoung", "stage_name": "Rose" }
    ],
    "groups": [{ "id": 400, "name": "Blackpink" }],
    "group_members": [[400, 1], [400, 2], [400, 1]],
    "restricted_channels": [[95, 1, true]],
    "dead_links": [
        { "link": "https://img/1.png", "user_id": 11, "message_id": 900, "idol_id": 1, "guessing_game": false }
    ],
    "custom_commands": [
        { "guild_id": 1, "name": "rules", "message": "be nice" }
    ],
    "bot_statuses": ["watching", "listening"],
    "feed_channels": [{ "channel_id": 71, "community": "TXT", "role_id": null, "comments_disabled": true }],
    "assignable_roles": [{ "role_id": 3, "name": "blink", "guild_id": 1 }],
    "assignable_role_channels": [[72, 1]],
    "stream_follows": [["alpha", 1], ["alpha", 2]],
    "reminders": [{ "id": 1, "user_id": 10, "reason": "vote", "due": 1700000000 }],
    "timezones": [[10, "Europe/Oslo"]],
    "game_scores": [{ "user_id": 11, "easy": 3, "medium": 2, "hard": 1 }],
    "balances": [[10, 250]],
    "levels": [{ "user_id": 10, "rob": 2, "daily": 3, "beg": 0, "profile": 4 }],
    "languages": [[11, "de_de"]],
    "playing_cards": [
        { "custom_card_id": 5, "file_name": "5.png", "card_id": 1, "card_name": "Ace", "value": 11, "background_idol": 1 }
    ],
    "feed_communities": [{ "id": 7, "name": "txt" }],
    "welcome_roles": [[1, 3]],
    "disabled_game_channels": [90],
    "game_filters": [11],
    "filtered_groups": [[11, 400]],
    "members": { "10": "elevated" }
}"#;

fn config() -> EngineConfig {
    EngineConfig {
        database_url: Some("memory://".to_string()),
        languages: vec![],
        ..EngineConfig::default()
    }
}

#[test]
fn cold_start_fills_every_segment() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        let engine = CacheEngine::builder(config(), store, Arc::new(StaticProvider::new()))
            .build()
            .expect("engine");

        let report = engine.run_all(true).await.expect("cold start");
        assert_eq!(report.names(), DEFAULT_ORDER.to_vec());
        assert_eq!(report.failed(), 0);
        assert!(matches!(
            report.outcome(segments::MEMBERSHIP).map(|o| &o.status),
            Some(SegmentStatus::Skipped { .. })
        ));
        assert!(matches!(
            report.outcome(segments::GUILD_DIRECTORY).map(|o| &o.status),
            Some(SegmentStatus::Skipped { .. })
        ));
        assert!(matches!(
            report.outcome(segments::FEED).map(|o| &o.status),
            Some(SegmentStatus::Deferred)
        ));

        assert!(engine.ensure_available().await.is_ok());
        assert!(engine.state().is_loaded());

        let user = engine.user(10).await;
        {
            let user = user.read().await;
            assert_eq!(user.balance, 250);
            assert_eq!(user.rob_level, 2);
            assert_eq!(user.beg_level, 1);
            assert_eq!(user.timezone.as_deref(), Some("Europe/Oslo"));
            assert_eq!(user.mod_mail_channel, Some(5000));
            assert_eq!(user.reminders.len(), 1);
            assert_eq!(user.n_word, 2);
            assert_eq!(user.tier(), Tier::None);
        }

        let other = engine.user(11).await;
        assert_eq!(other.read().await.language, "de_de");
        assert!(other.read().await.game_filter);
        assert!(engine.user(12).await.read().await.bot_banned);

        let segs = engine.segments();
        assert_eq!(segs.server_prefixes.get(&2).await.as_deref(), Some("?"));
        assert_eq!(segs.temp_channels.get(&80).await, Some(60));
        assert!(segs.disabled_game_channels.contains(&90).await);
        assert_eq!(segs.command_counter.get("help").await, Some(40));
        assert_eq!(segs.logged_channels.all().await, vec![61, 62]);
        assert_eq!(segs.welcome_roles.get(&1).await, Some(3));
        assert_eq!(segs.assignable_roles.get(&1).await.and_then(|r| r.channel_id), Some(72));

        // the object segments pick up counts loaded earlier in the pass
        let jisoo = segs.idols.get(&1).await.expect("idol");
        assert_eq!(jisoo.photo_count, 12);
        assert_eq!(jisoo.groups, vec![400]);
        let group = segs.groups.get(&400).await.expect("group");
        assert_eq!(group.members, vec![1, 2]);
        assert_eq!(group.photo_count, 30);

        let stats = engine.stats().await;
        assert_eq!(stats.user_notifications, 2);
        assert_eq!(stats.guilds_following_streams, 2);
        assert_eq!(stats.bot_statuses, 2);
        assert_eq!(stats.bootstrap_runs, 1);
        assert_eq!(stats.dead_links, 1);
        assert_eq!(stats.feed_channels_following, 1);
        assert_eq!(stats.playing_cards, 1);
        assert!(!stats.maintenance_mode);
    });
}

#[test]
fn feed_loads_in_the_background_once_connected() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        let config = EngineConfig {
            readiness_poll_secs: 1,
            ..config()
        };
        let engine = CacheEngine::builder(config, store, Arc::new(StaticProvider::new()))
            .build()
            .expect("engine");

        engine.run_all(true).await.expect("cold start");
        assert!(engine.segments().feed_communities.is_empty().await);
        assert!(!engine.feed_ready());

        engine.mark_feed_ready();
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.state().last_duration(segments::FEED).await.is_none()
            && Instant::now() < deadline
        {
            task::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            engine.segments().feed_communities.get(&7).await.as_deref(),
            Some("txt")
        );
        while engine.bootstrapper().is_running() {
            task::sleep(Duration::from_millis(5)).await;
        }

        // once connected, later passes load it inline
        let report = engine.run_all(false).await.expect("warm");
        assert!(matches!(
            report.outcome(segments::FEED).map(|o| &o.status),
            Some(SegmentStatus::Loaded { rows: 1, .. })
        ));
    });
}

#[test]
fn guild_directory_is_published_once_the_authority_is_ready() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        let provider = Arc::new(StaticProvider::ready());
        provider.set_members(Tier::Normal, [11]).await;
        provider
            .set_guilds(vec![GuildRow {
                id: 1,
                name: "home".to_string(),
                member_count: 2,
                owner_id: 10,
            }])
            .await;

        let engine = CacheEngine::builder(config(), store.clone(), provider)
            .build()
            .expect("engine");
        let scheduler = engine.start_scheduler_with(Timings {
            full_refresh: Duration::from_secs(3600),
            readiness_poll: Duration::from_millis(10),
            reconcile: Duration::from_secs(3600),
            repeat: true,
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while !engine.external_ready() && Instant::now() < deadline {
            task::sleep(Duration::from_millis(10)).await;
        }
        assert!(engine.external_ready());
        scheduler.shutdown().await.expect("shutdown");
        while engine.bootstrapper().is_running() {
            task::sleep(Duration::from_millis(5)).await;
        }

        let report = engine.run_all(false).await.expect("warm");
        assert!(matches!(
            report.outcome(segments::GUILD_DIRECTORY).map(|o| &o.status),
            Some(SegmentStatus::Loaded { rows: 1, .. })
        ));
        assert_eq!(store.guilds().await.len(), 1);
    });
}

#[test]
fn cold_start_rebuilds_from_scratch() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        let engine = CacheEngine::builder(config(), store.clone(), Arc::new(StaticProvider::new()))
            .build()
            .expect("engine");

        engine.run_all(true).await.expect("first");
        let before = engine.user(10).await;

        store.update(|t| t.balances = vec![(10, 9)]).await;
        engine.run_all(false).await.expect("warm");
        assert_eq!(before.read().await.balance, 9);
        assert!(Arc::ptr_eq(&before, &engine.user(10).await));

        engine.run_all(true).await.expect("cold again");
        let after = engine.user(10).await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.read().await.balance, 9);
    });
}

#[test]
fn one_broken_table_does_not_stop_the_rest() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        store.fail_table("server_prefixes").await;

        let engine = CacheEngine::builder(config(), store, Arc::new(StaticProvider::new()))
            .build()
            .expect("engine");

        let report = engine.run_all(true).await.expect("cold start");
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcome(segments::SERVER_PREFIXES).map(|o| &o.status),
            Some(SegmentStatus::Failed { .. })
        ));
        assert!(engine.segments().server_prefixes.is_empty().await);
        assert_eq!(engine.segments().welcome_messages.len().await, 1);
        assert!(engine.ensure_available().await.is_ok());
    });
}

#[test]
fn persisted_members_reach_live_records_after_reconcile() {
    task::block_on(async move {
        let store = Arc::new(MemoryStore::from_json(TABLES).expect("tables"));
        let provider = Arc::new(StaticProvider::ready());
        provider.set_members(Tier::Elevated, [10, 11]).await;

        let engine = CacheEngine::builder(config(), store.clone(), provider)
            .build()
            .expect("engine");
        engine.run_all(true).await.expect("cold start");

        let report = engine.reconcile().await.expect("reconcile");
        assert_eq!(report.writes, 1);
        assert_eq!(engine.user(11).await.read().await.tier(), Tier::Elevated);
        assert_eq!(store.members().await.len(), 2);
    });
}
