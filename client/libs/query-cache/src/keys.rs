//! Query key schema
//!
//! Every cached query is addressed by a [`QueryKey`]. The rendered key
//! string follows `v{VERSION}:{entity}[:{identifier}]` and is used for logs
//! and metric labels.

use snapgram_types::PostId;
use std::fmt;

/// Key schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Newest posts listing
    /// Format: v1:posts:recent
    RecentPosts,

    /// Single post
    /// Format: v1:post:{post_id}
    PostById(PostId),

    /// Signed-in user's profile
    /// Format: v1:user:current
    CurrentUser,

    /// Caption search results
    /// Format: v1:search:{term}
    Search(String),

    /// Infinite feed pages
    /// Format: v1:feed:pages
    FeedPages,
}

impl QueryKey {
    /// Entity segment of the key string
    pub fn entity(&self) -> &'static str {
        match self {
            QueryKey::RecentPosts => "posts",
            QueryKey::PostById(_) => "post",
            QueryKey::CurrentUser => "user",
            QueryKey::Search(_) => "search",
            QueryKey::FeedPages => "feed",
        }
    }

    pub fn cache_key(&self) -> String {
        match self {
            QueryKey::RecentPosts => format!("v{}:posts:recent", CACHE_VERSION),
            QueryKey::PostById(id) => format!("v{}:post:{}", CACHE_VERSION, id),
            QueryKey::CurrentUser => format!("v{}:user:current", CACHE_VERSION),
            QueryKey::Search(term) => format!("v{}:search:{}", CACHE_VERSION, term),
            QueryKey::FeedPages => format!("v{}:feed:pages", CACHE_VERSION),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(QueryKey::RecentPosts.cache_key(), "v1:posts:recent");
        assert_eq!(
            QueryKey::PostById(PostId::new("p1")).cache_key(),
            "v1:post:p1"
        );
        assert_eq!(QueryKey::CurrentUser.to_string(), "v1:user:current");
        assert_eq!(
            QueryKey::Search("sun set".to_string()).cache_key(),
            "v1:search:sun set"
        );
        assert_eq!(QueryKey::FeedPages.cache_key(), "v1:feed:pages");
    }

    #[test]
    fn test_entity_matches_key_segment() {
        for key in [
            QueryKey::RecentPosts,
            QueryKey::PostById(PostId::new("p1")),
            QueryKey::CurrentUser,
            QueryKey::Search("x".to_string()),
            QueryKey::FeedPages,
        ] {
            let rendered = key.cache_key();
            assert_eq!(rendered.split(':').nth(1), Some(key.entity()));
        }
    }
}
