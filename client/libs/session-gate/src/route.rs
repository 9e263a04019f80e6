//! Application routes and the navigation seam

use parking_lot::Mutex;
use snapgram_types::{PostId, UserId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Explore,
    Saved,
    AllUsers,
    CreatePost,
    UpdatePost(PostId),
    PostDetails(PostId),
    Profile(UserId),
    UpdateProfile(UserId),
    SignIn,
    SignUp,
}

impl Route {
    /// Requires an authenticated session
    pub fn is_protected(&self) -> bool {
        !self.is_auth_entry()
    }

    /// Sign-in and sign-up screens
    pub fn is_auth_entry(&self) -> bool {
        matches!(self, Route::SignIn | Route::SignUp)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Explore => "/explore".to_string(),
            Route::Saved => "/saved".to_string(),
            Route::AllUsers => "/all-users".to_string(),
            Route::CreatePost => "/create-post".to_string(),
            Route::UpdatePost(id) => format!("/update-post/{}", id),
            Route::PostDetails(id) => format!("/posts/{}", id),
            Route::Profile(id) => format!("/profile/{}", id),
            Route::UpdateProfile(id) => format!("/update-profile/{}", id),
            Route::SignIn => "/sign-in".to_string(),
            Route::SignUp => "/sign-up".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Presentation-layer navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);

    fn current(&self) -> Route;
}

/// Navigator that records every navigation, for headless use and tests
pub struct MemoryNavigator {
    history: Mutex<Vec<Route>>,
}

impl MemoryNavigator {
    pub fn new(start: Route) -> Self {
        Self {
            history: Mutex::new(vec![start]),
        }
    }

    /// Every route visited, starting with the initial one
    pub fn history(&self) -> Vec<Route> {
        self.history.lock().clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Navigate");
        self.history.lock().push(route);
    }

    fn current(&self) -> Route {
        self.history.lock().last().cloned().unwrap_or(Route::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.path(), "/");
        assert_eq!(
            Route::UpdatePost(PostId::new("p1")).to_string(),
            "/update-post/p1"
        );
        assert_eq!(Route::SignIn.path(), "/sign-in");
    }

    #[test]
    fn test_protection() {
        assert!(Route::Saved.is_protected());
        assert!(!Route::SignUp.is_protected());
        assert!(Route::SignIn.is_auth_entry());
    }

    #[test]
    fn test_memory_navigator_history() {
        let navigator = MemoryNavigator::default();
        navigator.navigate(Route::SignIn);
        assert_eq!(navigator.current(), Route::SignIn);
        assert_eq!(navigator.history(), vec![Route::Home, Route::SignIn]);
    }
}
