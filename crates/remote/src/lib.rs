//! Hosted providers for Quill.
//!
//! Each binding implements [`quill_core::Backend`] over the provider's REST
//! API and keeps its session secret in a [`quill_core::session::SessionCache`].

pub mod appwrite;
pub mod http;
pub mod supabase;

pub use appwrite::AppwriteBackend;
pub use supabase::SupabaseBackend;
