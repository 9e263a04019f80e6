//! Mutation coordinator
//!
//! Every write from the presentation layer goes through here. A write that
//! succeeds marks its declared cache keys stale; a write that fails leaves
//! the cache alone, emits one error notification and is returned to the
//! caller without retrying.
//!
//! Like and save toggles are applied optimistically. Per (user, post) pair
//! at most one toggle of each kind runs at a time; a second request waits
//! for the first and computes its base from the outcome.

use dashmap::DashMap;
use query_cache::QueryCache;
use remote_ops::{RemoteError, RemoteOps};
use session_gate::{SessionGate, SessionState};
use snapgram_types::{FileId, Post, PostForm, PostId, SignInForm, User, UserId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MutationError, MutationResult};
use crate::invalidation::Mutation;
use crate::notifier::{Notification, Notifier};
use crate::overlay::{toggled_likes, LikeOverlays, SaveOverlays};
use crate::stats::MutationStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ToggleKind {
    Like,
    Save,
}

type ToggleKey = (UserId, PostId, ToggleKind);

pub struct MutationCoordinator {
    ops: RemoteOps,
    cache: QueryCache,
    gate: Arc<SessionGate>,
    notifier: Arc<dyn Notifier>,
    likes: LikeOverlays,
    saves: SaveOverlays,
    toggles: DashMap<ToggleKey, Arc<Mutex<()>>>,
    stats: MutationStats,
}

impl MutationCoordinator {
    pub fn new(
        ops: RemoteOps,
        cache: QueryCache,
        gate: Arc<SessionGate>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ops,
            cache,
            gate,
            notifier,
            likes: LikeOverlays::new(),
            saves: SaveOverlays::new(),
            toggles: DashMap::new(),
            stats: MutationStats::new(),
        }
    }

    pub fn stats(&self) -> &MutationStats {
        &self.stats
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub(crate) fn ops(&self) -> &RemoteOps {
        &self.ops
    }

    /// Likes to render for `post`, including any optimistic toggle
    pub fn likes_for(&self, post: &Post) -> Vec<UserId> {
        self.likes.likes_for(post)
    }

    pub fn is_liked(&self, user_id: &UserId, post: &Post) -> bool {
        self.likes.likes_for(post).contains(user_id)
    }

    /// Saved flag to render, including any optimistic toggle
    pub fn is_saved(&self, user: &User, post_id: &PostId) -> bool {
        self.saves.is_saved(user, post_id)
    }

    // ============= Posts =============

    pub async fn create_post(&self, creator: &UserId, form: PostForm) -> MutationResult<Post> {
        let new_post = form.into_new_post(creator.clone())?;
        let post = self
            .settle(Mutation::CreatePost, self.ops.create_post(&new_post).await)?;
        self.notifier
            .notify(Notification::success("Successfully created!"));
        Ok(post)
    }

    /// Apply `form` to `post`; without a new file the current image stays
    pub async fn update_post(&self, post: &Post, form: PostForm) -> MutationResult<Post> {
        let update = form.into_update(
            post.id.clone(),
            post.image_id.clone(),
            post.image_url.clone(),
        )?;
        self.settle(
            Mutation::UpdatePost(post.id.clone()),
            self.ops.update_post(&update).await,
        )
    }

    pub async fn delete_post(&self, post_id: &PostId, image_id: &FileId) -> MutationResult<()> {
        self.settle(
            Mutation::DeletePost(post_id.clone()),
            self.ops.delete_post(post_id, image_id).await,
        )?;
        self.notifier
            .notify(Notification::success("Successfully deleted!"));
        Ok(())
    }

    // ============= Toggles =============

    /// Like or unlike `post` as `user_id`. Returns the confirmed likes list.
    ///
    /// The whole list is written back, so concurrent toggles from other
    /// clients on the same post are last-writer-wins.
    pub async fn toggle_like(&self, user_id: &UserId, post: &Post) -> MutationResult<Vec<UserId>> {
        let key = (user_id.clone(), post.id.clone(), ToggleKind::Like);
        self.serialized(key, async {
            let mutation = Mutation::ToggleLike(post.id.clone());
            let base = self.likes.likes_for(post);
            let next = toggled_likes(&base, user_id);
            let previous = self.likes.publish(&post.id, next.clone());
            debug!(
                post_id = %post.id,
                user_id = %user_id,
                from = base.len(),
                to = next.len(),
                "Optimistic like toggle"
            );

            match self.ops.set_likes(&post.id, &next).await {
                Ok(updated) => {
                    self.likes.confirm(&updated);
                    self.succeeded(&mutation);
                    Ok(updated.likes)
                }
                Err(e) => {
                    self.likes.restore(&post.id, previous);
                    self.stats.record_rollback();
                    warn!(post_id = %post.id, "Like toggle rolled back");
                    Err(self.failed(&mutation, e.into()))
                }
            }
        })
        .await
    }

    /// Save or unsave `post_id` for `user`. Returns the new saved flag.
    pub async fn toggle_save(&self, user: &User, post_id: &PostId) -> MutationResult<bool> {
        let key = (user.id.clone(), post_id.clone(), ToggleKind::Save);
        self.serialized(key, async {
            let mutation = Mutation::ToggleSave(post_id.clone());
            let (saved, record) = self.saves.state_for(user, post_id);
            let previous = self.saves.publish(&user.id, post_id, !saved);
            debug!(post_id = %post_id, user_id = %user.id, saved = !saved, "Optimistic save toggle");

            let result = if saved {
                match record {
                    Some(save_id) => self.ops.delete_save(&save_id).await.map(|_| None),
                    None => Err(RemoteError::NotFound(format!(
                        "save record for post {}",
                        post_id
                    ))),
                }
            } else {
                self.ops
                    .create_save(&user.id, post_id)
                    .await
                    .map(|save| Some(save.id))
            };

            match result {
                Ok(record) => {
                    self.saves.confirm(&user.id, post_id, !saved, record);
                    self.succeeded(&mutation);
                    Ok(!saved)
                }
                Err(e) => {
                    self.saves.restore(&user.id, post_id, previous);
                    self.stats.record_rollback();
                    warn!(post_id = %post_id, "Save toggle rolled back");
                    Err(self.failed(&mutation, e.into()))
                }
            }
        })
        .await
    }

    // ============= Session =============

    /// Sign in and re-derive the session. Returns the signed-in user.
    pub async fn sign_in(&self, form: &SignInForm) -> MutationResult<User> {
        let credentials = form.check()?;

        if let Err(e) = self.ops.sign_in(&credentials).await {
            return Err(self.failed(&Mutation::SignIn, e.into()));
        }
        let user = self.settle(Mutation::SignIn, self.establish_session().await)?;
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> MutationResult<()> {
        self.settle(Mutation::SignOut, self.ops.sign_out().await)?;
        self.gate.on_signed_out();
        self.likes.clear();
        self.saves.clear();
        info!("Signed out");
        Ok(())
    }

    /// Gate re-check after a session was created
    pub(crate) async fn establish_session(&self) -> MutationResult<User> {
        match self.gate.on_signed_in().await? {
            SessionState::Authenticated => self
                .gate
                .current_user()
                .ok_or(MutationError::SessionNotEstablished),
            _ => Err(MutationError::SessionNotEstablished),
        }
    }

    // ============= Outcomes =============

    fn settle<T, E>(&self, mutation: Mutation, result: Result<T, E>) -> MutationResult<T>
    where
        E: Into<MutationError>,
    {
        match result {
            Ok(value) => {
                self.succeeded(&mutation);
                Ok(value)
            }
            Err(e) => Err(self.failed(&mutation, e.into())),
        }
    }

    pub(crate) fn succeeded(&self, mutation: &Mutation) {
        let keys = mutation.invalidated_keys();
        if !keys.is_empty() {
            self.cache.invalidate(&keys);
        }
        self.stats.record_success(keys.len());
        info!(mutation = %mutation, invalidated = keys.len(), "Mutation succeeded");
    }

    /// Count and surface a failure; the cache is left untouched
    pub(crate) fn failed(&self, mutation: &Mutation, error: MutationError) -> MutationError {
        self.stats.record_failure();
        warn!(mutation = %mutation, error = %error, "Mutation failed");

        let message = error.user_message();
        let notification = match mutation {
            Mutation::SignIn | Mutation::SignUp => Notification::auth_failed(message),
            _ => Notification::mutation_failed(&message),
        };
        self.notifier.notify(notification);
        error
    }

    async fn serialized<T>(&self, key: ToggleKey, work: impl Future<Output = T>) -> T {
        let lock = self.toggles.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.toggles
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}
