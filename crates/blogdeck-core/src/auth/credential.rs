use std::fmt;

use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::User;

/// An opaque bearer token.
///
/// `Debug` never prints the token so it can't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Where the HTTP client pulls the current bearer credential from when it
/// builds a request.
pub trait CredentialSource: Send + Sync {
    fn current_credential(&self) -> Option<Credential>;
}

/// Resolves the user a credential belongs to.
///
/// Every failure is reported the same way to the session: expired, revoked
/// and unreachable all end in an anonymous session.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, credential: &Credential) -> Result<User, ApiError>;
}
