//! Optimistic overlays for like and save toggles
//!
//! An overlay shadows the server value of one post's likes (or one user's
//! saved flag for a post) while a toggle is in flight and after it was
//! confirmed, until a refetched value catches up with it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use snapgram_types::{Post, PostId, SaveId, User, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOverlay {
    pub likes: Vec<UserId>,
    /// Update time of the confirming write; `None` while pending
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl LikeOverlay {
    pub fn is_pending(&self) -> bool {
        self.confirmed_at.is_none()
    }

    /// Whether this overlay is newer than `post`
    fn shadows(&self, post: &Post) -> bool {
        match self.confirmed_at {
            None => true,
            Some(confirmed_at) => post.updated_at < confirmed_at,
        }
    }
}

/// New likes list after `user_id` toggles: removes every occurrence when
/// present, appends otherwise
pub fn toggled_likes(likes: &[UserId], user_id: &UserId) -> Vec<UserId> {
    if likes.contains(user_id) {
        likes.iter().filter(|id| *id != user_id).cloned().collect()
    } else {
        let mut next = likes.to_vec();
        next.push(user_id.clone());
        next
    }
}

#[derive(Debug, Default)]
pub struct LikeOverlays {
    entries: DashMap<PostId, LikeOverlay>,
}

impl LikeOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Likes to display for `post`; drops an overlay the post has caught
    /// up with
    pub fn likes_for(&self, post: &Post) -> Vec<UserId> {
        if let Some(overlay) = self.entries.get(&post.id) {
            if overlay.shadows(post) {
                return overlay.likes.clone();
            }
        }
        self.entries
            .remove_if(&post.id, |_, overlay| !overlay.shadows(post));
        post.likes.clone()
    }

    pub fn get(&self, post_id: &PostId) -> Option<LikeOverlay> {
        self.entries.get(post_id).map(|overlay| overlay.clone())
    }

    /// Publish a pending list, returning what it replaced
    pub fn publish(&self, post_id: &PostId, likes: Vec<UserId>) -> Option<LikeOverlay> {
        self.entries.insert(
            post_id.clone(),
            LikeOverlay {
                likes,
                confirmed_at: None,
            },
        )
    }

    /// Keep the server-confirmed list
    pub fn confirm(&self, post: &Post) {
        self.entries.insert(
            post.id.clone(),
            LikeOverlay {
                likes: post.likes.clone(),
                confirmed_at: Some(post.updated_at),
            },
        );
    }

    pub fn restore(&self, post_id: &PostId, previous: Option<LikeOverlay>) {
        match previous {
            Some(overlay) => {
                self.entries.insert(post_id.clone(), overlay);
            }
            None => {
                self.entries.remove(post_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOverlay {
    pub saved: bool,
    /// Save record created by the confirming write
    pub record: Option<SaveId>,
    pub pending: bool,
}

type SaveKey = (UserId, PostId);

#[derive(Debug, Default)]
pub struct SaveOverlays {
    entries: DashMap<SaveKey, SaveOverlay>,
}

impl SaveOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved flag and save record id to display for `post_id`. A confirmed
    /// overlay is dropped once the user's save records agree with it.
    pub fn state_for(&self, user: &User, post_id: &PostId) -> (bool, Option<SaveId>) {
        let server = user.save_for(post_id).map(|save| save.id.clone());
        let server_saved = server.is_some();
        let key = (user.id.clone(), post_id.clone());

        if let Some(overlay) = self.entries.get(&key) {
            if overlay.pending || overlay.saved != server_saved {
                let record = if overlay.saved {
                    overlay.record.clone().or(server)
                } else {
                    None
                };
                return (overlay.saved, record);
            }
        }
        self.entries
            .remove_if(&key, |_, overlay| !overlay.pending && overlay.saved == server_saved);
        (server_saved, server)
    }

    pub fn is_saved(&self, user: &User, post_id: &PostId) -> bool {
        self.state_for(user, post_id).0
    }

    pub fn get(&self, user_id: &UserId, post_id: &PostId) -> Option<SaveOverlay> {
        self.entries
            .get(&(user_id.clone(), post_id.clone()))
            .map(|overlay| overlay.clone())
    }

    pub fn publish(&self, user_id: &UserId, post_id: &PostId, saved: bool) -> Option<SaveOverlay> {
        self.entries.insert(
            (user_id.clone(), post_id.clone()),
            SaveOverlay {
                saved,
                record: None,
                pending: true,
            },
        )
    }

    pub fn confirm(&self, user_id: &UserId, post_id: &PostId, saved: bool, record: Option<SaveId>) {
        self.entries.insert(
            (user_id.clone(), post_id.clone()),
            SaveOverlay {
                saved,
                record,
                pending: false,
            },
        );
    }

    pub fn restore(&self, user_id: &UserId, post_id: &PostId, previous: Option<SaveOverlay>) {
        let key = (user_id.clone(), post_id.clone());
        match previous {
            Some(overlay) => {
                self.entries.insert(key, overlay);
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
