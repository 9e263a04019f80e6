//! Platform identifiers
//!
//! The platform issues opaque string ids (20 characters when generated
//! client-side). Each entity gets its own newtype so a post id can never be
//! passed where a save id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of ids generated on the client
const UNIQUE_ID_LEN: usize = 20;

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh id the way the platform's `unique()` helper does
            pub fn unique() -> Self {
                let raw = uuid::Uuid::new_v4().simple().to_string();
                Self(raw[..UNIQUE_ID_LEN].to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

platform_id!(
    /// Profile document id of a user
    UserId
);
platform_id!(
    /// Identity-provider account id (distinct from the profile document id)
    AccountId
);
platform_id!(
    /// Post document id
    PostId
);
platform_id!(
    /// Save join-record id
    SaveId
);
platform_id!(
    /// Stored binary id
    FileId
);
platform_id!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_length() {
        let id = PostId::unique();
        assert_eq!(id.as_str().len(), UNIQUE_ID_LEN);
        assert_ne!(id, PostId::unique());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = UserId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");

        let parsed: UserId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_display() {
        assert_eq!(SaveId::from("s-1").to_string(), "s-1");
    }
}
