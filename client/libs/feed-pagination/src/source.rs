use async_trait::async_trait;
use remote_ops::{RemoteOps, RemoteResult};
use snapgram_types::{Post, PostId};

/// Where feed pages come from
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Up to `page_size` posts ordered by update time, newest first,
    /// starting after `cursor`
    async fn fetch_page(&self, cursor: Option<&PostId>, page_size: usize)
        -> RemoteResult<Vec<Post>>;
}

#[async_trait]
impl PageSource for RemoteOps {
    async fn fetch_page(
        &self,
        cursor: Option<&PostId>,
        page_size: usize,
    ) -> RemoteResult<Vec<Post>> {
        self.list_posts_page(cursor, page_size).await
    }
}
