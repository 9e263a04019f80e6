//! Session gate for the Snapgram client
//!
//! Decides whether the user is signed in, keeps the answer current across
//! sign-in and sign-out, and redirects the presentation layer between the
//! auth screens and the protected screens.

pub mod error;
pub mod flag;
pub mod gate;
pub mod route;

pub use error::{SessionError, SessionResult};
pub use flag::{FileSessionFlagStore, MemorySessionFlagStore, SessionFlag, SessionFlagStore};
pub use gate::{CurrentUserSource, RouteAccess, SessionGate, SessionState};
pub use route::{MemoryNavigator, Navigator, Route};
