//! Read side: cached queries the presentation layer renders from
//!
//! Reads are stale-while-revalidate: after a mutation invalidated a key the
//! last value is served (flagged stale) while a refetch runs, so screens
//! never flicker to empty.

use query_cache::{CacheRead, QueryCache, QueryKey};
use remote_ops::{RemoteOps, RemoteResult};
use snapgram_types::{Post, PostId, User};
use tracing::debug;

#[derive(Clone)]
pub struct Queries {
    ops: RemoteOps,
    cache: QueryCache,
}

impl Queries {
    pub fn new(ops: RemoteOps, cache: QueryCache) -> Self {
        Self { ops, cache }
    }

    pub async fn recent_posts(&self) -> RemoteResult<CacheRead<Vec<Post>>> {
        let ops = self.ops.clone();
        self.cache
            .fetch_swr(QueryKey::RecentPosts, move || async move {
                ops.list_recent_posts().await
            })
            .await
    }

    /// `None` without fetching when `post_id` is empty
    pub async fn post_by_id(&self, post_id: &PostId) -> RemoteResult<Option<CacheRead<Post>>> {
        if post_id.is_empty() {
            return Ok(None);
        }

        let ops = self.ops.clone();
        let id = post_id.clone();
        self.cache
            .fetch_swr(QueryKey::PostById(post_id.clone()), move || async move {
                ops.get_post_by_id(&id).await
            })
            .await
            .map(Some)
    }

    /// Signed-in user's profile, `None` without a session
    pub async fn current_user(&self) -> RemoteResult<CacheRead<Option<User>>> {
        let ops = self.ops.clone();
        self.cache
            .fetch_swr(QueryKey::CurrentUser, move || async move {
                ops.get_current_user().await
            })
            .await
    }

    /// `None` without fetching for a blank term
    pub async fn search_posts(&self, term: &str) -> RemoteResult<Option<CacheRead<Vec<Post>>>> {
        let term = term.trim();
        if term.is_empty() {
            debug!("Blank search term, not searching");
            return Ok(None);
        }

        let ops = self.ops.clone();
        let query = term.to_string();
        self.cache
            .fetch_swr(QueryKey::Search(query.clone()), move || async move {
                ops.search_posts(&query).await
            })
            .await
            .map(Some)
    }
}
