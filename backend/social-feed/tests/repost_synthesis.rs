use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use social_feed::domain::NewPost;
use social_feed::services::snippet::tokenize;
use social_feed::services::RepostNaming;
use social_feed::store::StoreLimits;
use social_feed::{
    BoundingBox, DocumentStore, MemoryStore, RepostSynthesizer, ServiceError, SnippetGenerator,
};

async fn seed_post(store: &MemoryStore, content: &str) -> String {
    store
        .insert_post(NewPost {
            author_id: "author".to_string(),
            author_username: Some("alice".to_string()),
            content: content.to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap()
        .id
}

fn synthesizer(store: &MemoryStore) -> RepostSynthesizer<MemoryStore> {
    RepostSynthesizer::new(
        Arc::new(store.clone()),
        SnippetGenerator::new(3, 7).unwrap(),
    )
}

#[tokio::test]
async fn test_synthesize_then_purge_leaves_nothing() {
    let store = MemoryStore::new();
    let post_id = seed_post(&store, "the quick brown fox jumps over the lazy dog").await;
    let synthesizer = synthesizer(&store);

    let report = synthesizer
        .synthesize(&post_id, 3000, &BoundingBox::YONGSAN)
        .await
        .unwrap();
    assert_eq!(report.created, 3000);
    assert_eq!(report.batches, 6);
    assert_eq!(store.query_reposts(&post_id).await.unwrap().len(), 3000);

    let deleted = synthesizer.purge(&post_id).await.unwrap();
    assert_eq!(deleted, 3000);
    assert!(store.query_reposts(&post_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generated_records_follow_the_rules() {
    let store = MemoryStore::with_limits(StoreLimits {
        max_batch_size: 7,
        max_membership_filter: 10,
    });
    let body = "the quick brown fox jumps";
    let post_id = seed_post(&store, body).await;
    let bbox = BoundingBox::new(10.0, 10.5, 20.0, 20.25).unwrap();
    let mut rng = StdRng::seed_from_u64(17);

    let report = synthesizer(&store)
        .synthesize_with_rng(&post_id, 50, &bbox, &mut rng)
        .await
        .unwrap();
    assert_eq!(report.batches, 8);

    let reposts = store.query_reposts(&post_id).await.unwrap();
    assert_eq!(reposts.len(), 50);
    for repost in &reposts {
        assert_eq!(repost.original_post_id, post_id);
        assert!(bbox.contains(&repost.location));
        let words = tokenize(&repost.highlighted_quote).len();
        assert!((3..=5).contains(&words), "{:?}", repost.highlighted_quote);
        assert!(body.contains(&repost.highlighted_quote));

        let ordinal: usize = repost
            .author_username
            .strip_prefix("user")
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!((1..=50).contains(&ordinal));
        assert_eq!(repost.repost_comment, format!("Repost comment #{}", ordinal));
    }
}

#[tokio::test]
async fn test_empty_body_uses_numbered_placeholder() {
    let store = MemoryStore::new();
    let post_id = seed_post(&store, "   ").await;

    synthesizer(&store)
        .synthesize(&post_id, 3, &BoundingBox::YONGSAN)
        .await
        .unwrap();

    let mut quotes: Vec<String> = store
        .query_reposts(&post_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.highlighted_quote)
        .collect();
    quotes.sort();
    assert_eq!(quotes, vec!["Quote 1", "Quote 2", "Quote 3"]);
}

struct FixedNaming;

impl RepostNaming for FixedNaming {
    fn author(&self, ordinal: usize) -> String {
        format!("bot-{}", ordinal)
    }

    fn comment(&self, _ordinal: usize) -> String {
        "fixed".to_string()
    }
}

#[tokio::test]
async fn test_custom_naming() {
    let store = MemoryStore::new();
    let post_id = seed_post(&store, "hello world").await;

    synthesizer(&store)
        .with_naming(FixedNaming)
        .synthesize(&post_id, 2, &BoundingBox::YONGSAN)
        .await
        .unwrap();

    let mut authors: Vec<String> = store
        .query_reposts(&post_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| {
            assert_eq!(r.repost_comment, "fixed");
            r.author_username
        })
        .collect();
    authors.sort();
    assert_eq!(authors, vec!["bot-1", "bot-2"]);
}

#[tokio::test]
async fn test_missing_original_post_is_not_found() {
    let store = MemoryStore::new();
    let err = synthesizer(&store)
        .synthesize("missing", 10, &BoundingBox::YONGSAN)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(store.repost_count(), 0);
}

#[tokio::test]
async fn test_bad_arguments_fail_before_store_access() {
    let store = MemoryStore::new();
    let synthesizer = synthesizer(&store);

    let zero = synthesizer
        .synthesize("missing", 0, &BoundingBox::YONGSAN)
        .await
        .unwrap_err();
    assert!(matches!(zero, ServiceError::Config(_)));

    let inverted = BoundingBox {
        min_lat: 1.0,
        max_lat: 0.0,
        min_lng: 0.0,
        max_lng: 1.0,
    };
    let bad_box = synthesizer
        .synthesize("missing", 10, &inverted)
        .await
        .unwrap_err();
    assert!(matches!(bad_box, ServiceError::Config(_)));

    let unbounded = BoundingBox {
        min_lat: -f64::MAX,
        max_lat: f64::MAX,
        min_lng: 0.0,
        max_lng: 1.0,
    };
    let overflow = synthesizer
        .synthesize("missing", 10, &unbounded)
        .await
        .unwrap_err();
    assert!(matches!(overflow, ServiceError::Config(_)));
}

#[tokio::test]
async fn test_purge_without_reposts_returns_zero() {
    let store = MemoryStore::new();
    assert_eq!(synthesizer(&store).purge("nothing-here").await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_batch_keeps_earlier_batches() {
    let store = MemoryStore::with_limits(StoreLimits {
        max_batch_size: 500,
        max_membership_filter: 10,
    });
    let post_id = seed_post(&store, "some words for the quote generator").await;
    store.fail_commits_after(2);

    let err = synthesizer(&store)
        .synthesize(&post_id, 1200, &BoundingBox::YONGSAN)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StoreUnavailable(_)));
    assert_eq!(store.query_reposts(&post_id).await.unwrap().len(), 1000);

    store.clear_faults();
    assert_eq!(synthesizer(&store).purge(&post_id).await.unwrap(), 1000);
}

#[tokio::test]
async fn test_purge_only_touches_its_own_post() {
    let store = MemoryStore::new();
    let first = seed_post(&store, "first post body here").await;
    let second = seed_post(&store, "second post body here").await;
    let synthesizer = synthesizer(&store);

    synthesizer
        .synthesize(&first, 20, &BoundingBox::YONGSAN)
        .await
        .unwrap();
    synthesizer
        .synthesize(&second, 30, &BoundingBox::YONGSAN)
        .await
        .unwrap();

    assert_eq!(synthesizer.purge(&first).await.unwrap(), 20);
    assert_eq!(store.query_reposts(&second).await.unwrap().len(), 30);
}
