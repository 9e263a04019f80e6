use async_trait::async_trait;
use chrono::Utc;
use feed_pagination::{FeedPager, FetchOutcome, PageSource, PagerConfig, DEFAULT_PAGE_SIZE};
use query_cache::{QueryCache, QueryKey};
use remote_ops::{Collection, InMemoryPlatform, PlatformCall, RemoteOps, RemoteResult};
use snapgram_types::{FileId, FileUpload, NewPost, Post, PostId, UserId};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

const LIST_POSTS: PlatformCall = PlatformCall::ListDocuments(Collection::Posts);

async fn seeded(count: usize) -> (Arc<InMemoryPlatform>, RemoteOps, Vec<PostId>) {
    let platform = Arc::new(InMemoryPlatform::new());
    let ops = RemoteOps::new(platform.clone());
    let mut ids = Vec::new();
    for i in 0..count {
        let post = ops
            .create_post(&NewPost {
                creator: UserId::new("u1"),
                caption: format!("post {}", i),
                location: None,
                tags: vec![],
                file: FileUpload::new("p.png", "image/png", vec![1, 2, 3]),
            })
            .await
            .unwrap();
        ids.push(post.id);
    }
    // Newest first, as the feed orders them
    ids.reverse();
    (platform, ops, ids)
}

fn pager(ops: RemoteOps, cache: QueryCache) -> FeedPager {
    FeedPager::new(Arc::new(ops), cache)
}

fn ids_of(posts: &[Post]) -> Vec<PostId> {
    posts.iter().map(|p| p.id.clone()).collect()
}

#[tokio::test]
async fn test_walks_feed_until_empty_page() {
    let (platform, ops, ids) = seeded(7).await;
    let pager = pager(ops, QueryCache::new());
    assert_eq!(pager.config().page_size, DEFAULT_PAGE_SIZE);

    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::Appended(3));
    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::Appended(3));
    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::Appended(1));
    assert!(pager.has_next_page());

    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::EndOfFeed);
    assert!(!pager.has_next_page());
    assert_eq!(platform.call_count(LIST_POSTS), 4);

    // End of feed: no further remote call
    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::EndOfFeed);
    assert_eq!(platform.call_count(LIST_POSTS), 4);

    let pages = pager.pages().await.unwrap();
    assert_eq!(pages.len(), 4);
    assert_eq!(ids_of(&pages.items()), ids);
    assert_eq!(pages.pages[0].next_cursor, Some(ids[2].clone()));
    assert_eq!(pages.pages[3].next_cursor, None);
}

#[tokio::test]
async fn test_empty_feed() {
    let (_platform, ops, _ids) = seeded(0).await;
    let pager = pager(ops, QueryCache::new());

    let page = pager.get_page(None).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.next_cursor, None);

    let pages = pager.pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert!(!pages.has_next_page());
}

#[tokio::test]
async fn test_pages_loads_first_page_once() {
    let (platform, ops, ids) = seeded(5).await;
    let pager = pager(ops, QueryCache::new());

    let first = pager.pages().await.unwrap();
    let again = pager.pages().await.unwrap();

    assert_eq!(first, again);
    assert_eq!(ids_of(&first.items()), ids[..3].to_vec());
    assert_eq!(platform.call_count(LIST_POSTS), 1);
}

#[tokio::test]
async fn test_invalidation_revalidates_loaded_pages() {
    let (platform, ops, ids) = seeded(7).await;
    let cache = QueryCache::new();
    let pager = pager(ops.clone(), cache.clone());
    pager.fetch_next_page().await.unwrap();
    pager.fetch_next_page().await.unwrap();

    // Liking the oldest loaded post moves it to the top of the feed
    ops.set_likes(&ids[5], &[UserId::new("u2")]).await.unwrap();
    cache.invalidate(&[QueryKey::FeedPages]);
    let calls_before = platform.call_count(LIST_POSTS);

    let pages = pager.pages().await.unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(platform.call_count(LIST_POSTS), calls_before + 2);
    let items = pages.items();
    assert_eq!(items[0].id, ids[5]);
    assert_eq!(items[0].likes, vec![UserId::new("u2")]);
    assert_eq!(pages.pages[1].next_cursor, Some(items[5].id.clone()));
    assert_eq!(cache.is_stale(&QueryKey::FeedPages), Some(false));
}

#[tokio::test]
async fn test_refresh_resets_to_first_page() {
    let (_platform, ops, ids) = seeded(7).await;
    let pager = pager(ops, QueryCache::new());
    pager.fetch_next_page().await.unwrap();
    pager.fetch_next_page().await.unwrap();

    let pages = pager.refresh().await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(ids_of(&pages.items()), ids[..3].to_vec());
}

#[tokio::test]
async fn test_custom_page_size() {
    let (_platform, ops, _ids) = seeded(5).await;
    let pager = FeedPager::with_config(
        Arc::new(ops),
        QueryCache::new(),
        PagerConfig { page_size: 2 },
    );

    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::Appended(2));
    assert_eq!(pager.pages().await.unwrap().items().len(), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_loaded_pages() {
    let (platform, ops, _ids) = seeded(7).await;
    let pager = pager(ops, QueryCache::new());
    pager.fetch_next_page().await.unwrap();

    platform.fail_next(LIST_POSTS);
    assert!(pager.fetch_next_page().await.is_err());

    let pages = pager.pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pager.fetch_next_page().await.unwrap(), FetchOutcome::Appended(3));
}

/// Source whose first fetch waits for a release signal
struct GatedSource {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    started: Mutex<Option<oneshot::Sender<()>>>,
}

fn gated_post(id: &str) -> Post {
    Post {
        id: PostId::new(id),
        creator: UserId::new("u1"),
        caption: id.to_string(),
        image_id: FileId::new("f1"),
        image_url: "memory://files/f1/preview".to_string(),
        location: None,
        tags: vec![],
        likes: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl PageSource for GatedSource {
    async fn fetch_page(
        &self,
        _cursor: Option<&PostId>,
        _page_size: usize,
    ) -> RemoteResult<Vec<Post>> {
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            if let Some(started) = self.started.lock().await.take() {
                let _ = started.send(());
            }
            let _ = gate.await;
            return Ok(vec![gated_post("old")]);
        }
        Ok(vec![gated_post("new")])
    }
}

#[tokio::test]
async fn test_fetch_landing_after_reset_is_discarded() {
    let (release_tx, release_rx) = oneshot::channel();
    let (started_tx, started_rx) = oneshot::channel();
    let source = Arc::new(GatedSource {
        gate: Mutex::new(Some(release_rx)),
        started: Mutex::new(Some(started_tx)),
    });
    let cache = QueryCache::new();
    let pager = Arc::new(FeedPager::new(source, cache.clone()));

    let in_flight = {
        let pager = pager.clone();
        tokio::spawn(async move { pager.fetch_next_page().await })
    };
    started_rx.await.unwrap();

    pager.reset();
    release_tx.send(()).unwrap();

    assert_eq!(in_flight.await.unwrap().unwrap(), FetchOutcome::Superseded);
    assert!(pager.cached_pages().is_none());

    let pages = pager.pages().await.unwrap();
    assert_eq!(pages.items()[0].id, PostId::new("new"));
}
