//! Mutation coordinator for the Snapgram client
//!
//! Executes writes through the remote operations facade, then marks the
//! cache keys each write affects as stale:
//!
//! | mutation | invalidated keys |
//! |---|---|
//! | like toggle | post by id, recent posts, feed pages, current user |
//! | save toggle | recent posts, feed pages, current user |
//! | create / delete post | recent posts |
//! | update post | post by id |
//! | sign-up / sign-in / sign-out | none |
//!
//! # Example
//!
//! ```no_run
//! use mutation_coordinator::{MutationCoordinator, TracingNotifier};
//! # async fn demo(
//! #     ops: remote_ops::RemoteOps,
//! #     cache: query_cache::QueryCache,
//! #     gate: std::sync::Arc<session_gate::SessionGate>,
//! #     user: snapgram_types::User,
//! #     post: snapgram_types::Post,
//! # ) -> Result<(), mutation_coordinator::MutationError> {
//! let coordinator = MutationCoordinator::new(ops, cache, gate, std::sync::Arc::new(TracingNotifier));
//! let likes = coordinator.toggle_like(&user.id, &post).await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod invalidation;
pub mod notifier;
pub mod overlay;
pub mod stats;

mod signup;

pub use coordinator::MutationCoordinator;
pub use error::{MutationError, MutationResult, SignUpError, SignUpStep};
pub use invalidation::Mutation;
pub use notifier::{Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier};
pub use overlay::{toggled_likes, LikeOverlay, LikeOverlays, SaveOverlay, SaveOverlays};
pub use stats::{MutationStats, MutationStatsSnapshot};
