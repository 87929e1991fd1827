//! Identity-provider session: sign-in, refresh and keychain persistence.

pub mod client;
pub mod store;
pub mod types;

pub use client::IdentityClient;
pub use store::SessionState;
pub use types::{PersistedSession, Session, SessionUser};
