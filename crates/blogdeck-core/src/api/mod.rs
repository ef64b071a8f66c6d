//! REST API client module for the blog backend.
//!
//! This module provides the `ApiClient` for talking to the backend's
//! `/api/v1` surface: the token exchange, the current-user lookup the
//! session store depends on, and the article/comment endpoints.
//!
//! Authentication is a JWT bearer token obtained from `POST /api/v1/token`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
