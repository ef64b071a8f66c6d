//! Core library for blogdeck.
//!
//! - `api`: HTTP client adapter for the blog backend (`/api/v1`)
//! - `auth`: session store, credentials and durable token storage
//! - `config`: persisted client configuration
//! - `models`: users, articles and comments as the backend returns them

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Credential, Session, SessionError, SessionStatus};
pub use config::Config;
