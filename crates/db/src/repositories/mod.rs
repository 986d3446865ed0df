//! Table-level access for the self-hosted provider.
//!
//! Each repository returns raw `DbErr`; `LocalBackend` maps them through
//! `map_db_err`.

pub mod file;
pub mod post;
pub mod profile;
pub mod session;
pub mod user;

pub use file::{CreateFileInput, FileRepository};
pub use post::PostRepository;
pub use profile::ProfileRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
