//! Typed IDs for provider-opaque entity references.
//!
//! Hosted providers hand out their own string identifiers, so IDs wrap a
//! `String` rather than a `Uuid`. Locally generated IDs are UUID v7 in simple
//! (hyphen-free) form: time-ordered and accepted as Appwrite custom IDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a new unique ID (UUID v7, simple form).
            #[must_use]
            pub fn unique() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            /// Wraps an identifier issued by a provider.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user account.");
typed_id!(PostId, "Unique identifier for a blog post.");
typed_id!(FileId, "Unique identifier for a stored file.");
typed_id!(SessionId, "Unique identifier for an authenticated session.");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
