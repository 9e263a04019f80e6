//! Which cache entries each mutation makes stale

use query_cache::QueryKey;
use snapgram_types::PostId;
use std::fmt;

/// A successful write, described by what it touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ToggleLike(PostId),
    ToggleSave(PostId),
    CreatePost,
    UpdatePost(PostId),
    DeletePost(PostId),
    SignUp,
    SignIn,
    SignOut,
}

impl Mutation {
    /// Keys to mark stale once the write is confirmed
    ///
    /// Auth mutations return nothing; the session gate re-derives the user
    /// instead.
    pub fn invalidated_keys(&self) -> Vec<QueryKey> {
        match self {
            Mutation::ToggleLike(post_id) => vec![
                QueryKey::PostById(post_id.clone()),
                QueryKey::RecentPosts,
                QueryKey::FeedPages,
                QueryKey::CurrentUser,
            ],
            Mutation::ToggleSave(_) => vec![
                QueryKey::RecentPosts,
                QueryKey::FeedPages,
                QueryKey::CurrentUser,
            ],
            Mutation::CreatePost | Mutation::DeletePost(_) => vec![QueryKey::RecentPosts],
            Mutation::UpdatePost(post_id) => vec![QueryKey::PostById(post_id.clone())],
            Mutation::SignUp | Mutation::SignIn | Mutation::SignOut => Vec::new(),
        }
    }

    /// Short name used in logs and stats
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ToggleLike(_) => "toggle_like",
            Mutation::ToggleSave(_) => "toggle_save",
            Mutation::CreatePost => "create_post",
            Mutation::UpdatePost(_) => "update_post",
            Mutation::DeletePost(_) => "delete_post",
            Mutation::SignUp => "sign_up",
            Mutation::SignIn => "sign_in",
            Mutation::SignOut => "sign_out",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::ToggleLike(id)
            | Mutation::ToggleSave(id)
            | Mutation::UpdatePost(id)
            | Mutation::DeletePost(id) => write!(f, "{}:{}", self.name(), id),
            _ => f.write_str(self.name()),
        }
    }
}
