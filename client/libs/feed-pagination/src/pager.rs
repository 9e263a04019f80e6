//! Infinite feed pager
//!
//! Loaded pages live in the query cache under [`QueryKey::FeedPages`]. Page
//! fetches are serialized; every fetch records the pager epoch it started
//! in and is dropped if a reset happened before it completed.

use query_cache::{CacheRead, QueryCache, QueryKey};
use remote_ops::RemoteResult;
use snapgram_types::{Post, PostId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::page::{FeedPage, FeedPages, PagerConfig};
use crate::source::PageSource;

/// Result of a next-page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page with this many posts was appended
    Appended(usize),
    /// No further pages; nothing was appended
    EndOfFeed,
    /// A reset happened while fetching; the result was discarded
    Superseded,
}

pub struct FeedPager {
    source: Arc<dyn PageSource>,
    cache: QueryCache,
    config: PagerConfig,
    epoch: parking_lot::Mutex<u64>,
    fetch_lock: Mutex<()>,
}

impl FeedPager {
    pub fn new(source: Arc<dyn PageSource>, cache: QueryCache) -> Self {
        Self::with_config(source, cache, PagerConfig::default())
    }

    pub fn with_config(source: Arc<dyn PageSource>, cache: QueryCache, config: PagerConfig) -> Self {
        Self {
            source,
            cache,
            config,
            epoch: parking_lot::Mutex::new(0),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Fetch a single page after `cursor` without touching the loaded pages
    pub async fn get_page(&self, cursor: Option<&PostId>) -> RemoteResult<FeedPage> {
        let items = self
            .source
            .fetch_page(cursor, self.config.page_size)
            .await?;
        debug!(
            cursor = cursor.map(PostId::as_str),
            count = items.len(),
            "Fetched feed page"
        );
        Ok(FeedPage::from_items(items))
    }

    /// Loaded pages as currently cached, possibly stale
    pub fn cached_pages(&self) -> Option<CacheRead<FeedPages>> {
        self.cache.read(&QueryKey::FeedPages)
    }

    pub fn has_next_page(&self) -> bool {
        self.cached_pages()
            .map(|read| read.value.has_next_page())
            .unwrap_or(true)
    }

    /// Loaded pages. Loads the first page when nothing is loaded yet and
    /// revalidates every loaded page when the pages were invalidated.
    pub async fn pages(&self) -> RemoteResult<FeedPages> {
        if let Some(read) = self.cached_pages() {
            if !read.is_stale {
                return Ok(read.value);
            }
        }

        let _guard = self.fetch_lock.lock().await;
        match self.cached_pages() {
            Some(read) if !read.is_stale => Ok(read.value),
            Some(read) => match self.revalidate_locked(read.value.len()).await? {
                Some(pages) => Ok(pages),
                None => Ok(self.current()),
            },
            None => {
                self.append_locked().await?;
                Ok(self.current())
            }
        }
    }

    /// All loaded posts in feed order
    pub async fn items(&self) -> RemoteResult<Vec<Post>> {
        Ok(self.pages().await?.items())
    }

    /// Fetch and append the page after the last loaded one. Once an empty
    /// page was seen no further fetch is issued.
    pub async fn fetch_next_page(&self) -> RemoteResult<FetchOutcome> {
        let _guard = self.fetch_lock.lock().await;
        self.append_locked().await
    }

    /// Discard all loaded pages; in-flight fetches will be dropped
    pub fn reset(&self) {
        let mut epoch = self.epoch.lock();
        *epoch += 1;
        self.cache.remove(&QueryKey::FeedPages);
        info!(epoch = *epoch, "Feed pages reset");
    }

    /// Reset and load the first page again
    pub async fn refresh(&self) -> RemoteResult<FeedPages> {
        self.reset();
        self.fetch_next_page().await?;
        Ok(self.current())
    }

    fn current(&self) -> FeedPages {
        self.cached_pages()
            .map(|read| read.value)
            .unwrap_or_default()
    }

    fn current_epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Store `pages` unless a reset happened since `epoch`
    fn commit(&self, epoch: u64, pages: FeedPages, started: u64) -> bool {
        let current = self.epoch.lock();
        if *current != epoch {
            debug!(
                started_epoch = epoch,
                current_epoch = *current,
                "Discarding superseded feed fetch"
            );
            return false;
        }
        self.cache.write_as_of(QueryKey::FeedPages, pages, started);
        true
    }

    async fn append_locked(&self) -> RemoteResult<FetchOutcome> {
        let epoch = self.current_epoch();

        let current = match self.cached_pages() {
            Some(read) if read.is_stale => {
                match self.revalidate_locked(read.value.len()).await? {
                    Some(pages) => pages,
                    None => return Ok(FetchOutcome::Superseded),
                }
            }
            Some(read) => read.value,
            None => FeedPages::default(),
        };

        if !current.has_next_page() {
            debug!(pages = current.len(), "End of feed reached, not fetching");
            return Ok(FetchOutcome::EndOfFeed);
        }

        let started = self.cache.generation(&QueryKey::FeedPages);
        let page = self.get_page(current.next_cursor()).await?;
        let count = page.items.len();

        let mut next = current;
        next.push(page);
        if !self.commit(epoch, next, started) {
            return Ok(FetchOutcome::Superseded);
        }

        Ok(if count == 0 {
            FetchOutcome::EndOfFeed
        } else {
            FetchOutcome::Appended(count)
        })
    }

    /// Refetch the first `page_count` pages in order, recomputing cursors
    async fn revalidate_locked(&self, page_count: usize) -> RemoteResult<Option<FeedPages>> {
        let epoch = self.current_epoch();
        let started = self.cache.generation(&QueryKey::FeedPages);

        let mut refreshed = FeedPages::default();
        for _ in 0..page_count.max(1) {
            let page = self.get_page(refreshed.next_cursor()).await?;
            let end = page.is_empty();
            refreshed.push(page);
            if end {
                break;
            }
        }

        info!(pages = refreshed.len(), "Revalidated feed pages");
        Ok(self
            .commit(epoch, refreshed.clone(), started)
            .then_some(refreshed))
    }
}
