//! Session and credential management.
//!
//! This module provides:
//! - `Session`: the session store (restore / login / logout, status
//!   subscriptions)
//! - `Credential`, `CredentialSource`, `IdentityResolver`: the contract the
//!   HTTP client and the session store meet at
//! - `TokenStore`: durable storage for the bearer token (file, OS keychain
//!   or memory)

pub mod credential;
pub mod session;
pub mod store;

pub use credential::{Credential, CredentialSource, IdentityResolver};
pub use session::{Session, SessionError, SessionStatus, SessionSubscription};
pub use store::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageBackend, TokenStore,
};
