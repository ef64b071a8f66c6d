//! API client for communicating with the blog REST API.
//!
//! Requests are built in one place, [`ApiClient::request`], which pulls the
//! bearer credential from the configured [`CredentialSource`] at build time.
//! There is no mutable default header to keep in sync with the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::auth::{Credential, CredentialSource, IdentityResolver};
use crate::config::Config;
use crate::models::{sort_newest_first, Article, ArticleDraft, Comment, CommentDraft, NewUser, User};

use super::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Path prefix of every backend endpoint
const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

/// API client for the blog backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Option<Arc<dyn CredentialSource>>,
}

impl ApiClient {
    /// Create an anonymous client from the configuration.
    pub fn new(config: &Config) -> ApiResult<Self> {
        Self::with_base_url(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// A client sharing this one's connection pool whose requests carry
    /// whatever credential `source` holds when each request is built.
    pub fn with_credentials(&self, source: Arc<dyn CredentialSource>) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            credentials: Some(source),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn current_credential(&self) -> Option<Credential> {
        self.credentials.as_ref().and_then(|source| source.current_credential())
    }

    /// Build a request, attaching `Authorization: Bearer` when a credential
    /// is current at this moment.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.current_credential() {
            Some(credential) => builder.bearer_auth(credential.as_str()),
            None => builder,
        }
    }

    /// Build a request that requires a credential; fails locally when there
    /// is none instead of sending an anonymous mutation.
    fn authorized(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let credential = self.current_credential().ok_or_else(|| {
            debug!(path = path, "No credential for authorized request");
            ApiError::Unauthorized
        })?;
        Ok(self
            .client
            .request(method, self.url(path))
            .bearer_auth(credential.as_str()))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> ApiResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            warn!(url = %url, status = status.as_u16(), error = %err, "Request failed");
            Err(err)
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> ApiResult<T> {
        let response = Self::check_response(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    // ===== Authentication =====

    /// Exchange email and password for a bearer token.
    ///
    /// The backend's OAuth2 password form calls the email field `username`.
    pub async fn exchange_credentials(&self, email: &str, password: &str) -> ApiResult<Credential> {
        let request = self
            .client
            .post(self.url("/token"))
            .form(&[("username", email), ("password", password)]);

        let token: TokenResponse = Self::send_json(request, "token response").await?;
        if let Some(kind) = token.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                warn!(token_type = kind, "Unexpected token type");
            }
        }
        Credential::parse(&token.access_token)
            .ok_or_else(|| ApiError::InvalidResponse("Empty access token".to_string()))
    }

    /// Create an account. The new user still has to log in.
    pub async fn register(&self, new_user: &NewUser) -> ApiResult<User> {
        let request = self.client.post(self.url("/users")).json(new_user);
        Self::send_json(request, "registered user").await
    }

    /// Look up the user `credential` belongs to.
    pub async fn fetch_current_user(&self, credential: &Credential) -> ApiResult<User> {
        let request = self
            .client
            .get(self.url("/users/me"))
            .bearer_auth(credential.as_str());
        Self::send_json(request, "current user").await
    }

    // ===== Articles =====

    /// Fetch all articles, newest first.
    pub async fn list_articles(&self) -> ApiResult<Vec<Article>> {
        let mut articles: Vec<Article> =
            Self::send_json(self.request(Method::GET, "/articles"), "article list").await?;
        sort_newest_first(&mut articles);
        debug!(count = articles.len(), "Fetched articles");
        Ok(articles)
    }

    pub async fn get_article(&self, article_id: i64) -> ApiResult<Article> {
        let path = format!("/articles/{}", article_id);
        Self::send_json(self.request(Method::GET, &path), "article").await
    }

    pub async fn create_article(&self, draft: &ArticleDraft) -> ApiResult<Article> {
        let request = self.authorized(Method::POST, "/articles")?.json(draft);
        Self::send_json(request, "created article").await
    }

    /// Replace an article's title and content. Author only.
    pub async fn update_article(&self, article_id: i64, draft: &ArticleDraft) -> ApiResult<Article> {
        let path = format!("/articles/{}", article_id);
        let request = self.authorized(Method::PUT, &path)?.json(draft);
        Self::send_json(request, "updated article").await
    }

    /// Delete an article. Author only.
    pub async fn delete_article(&self, article_id: i64) -> ApiResult<()> {
        let path = format!("/articles/{}", article_id);
        let request = self.authorized(Method::DELETE, &path)?;
        Self::check_response(request.send().await?).await?;
        Ok(())
    }

    // ===== Comments =====

    pub async fn post_comment(&self, article_id: i64, draft: &CommentDraft) -> ApiResult<Comment> {
        let path = format!("/articles/{}/comments", article_id);
        let request = self.authorized(Method::POST, &path)?.json(draft);
        Self::send_json(request, "created comment").await
    }
}

#[async_trait]
impl IdentityResolver for ApiClient {
    async fn resolve_identity(&self, credential: &Credential) -> Result<User, ApiError> {
        self.fetch_current_user(credential).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// A credential slot tests can flip between tokens.
    #[derive(Default)]
    struct Slot(Mutex<Option<Credential>>);

    impl Slot {
        fn set(&self, token: Option<&str>) {
            *self.0.lock().expect("slot lock") = token.and_then(Credential::parse);
        }
    }

    impl CredentialSource for Slot {
        fn current_credential(&self) -> Option<Credential> {
            self.0.lock().expect("slot lock").clone()
        }
    }

    fn user_json(id: i64, username: &str) -> serde_json::Value {
        json!({"id": id, "username": username, "email": format!("{}@x.com", username)})
    }

    fn article_json(id: i64, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Article {}", id),
            "content": "body",
            "created_at": created_at,
            "updated_at": created_at,
            "author": user_json(1, "alice"),
            "comments": []
        })
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_base_url(&server.uri(), Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::with_base_url("http://localhost:8000/", Duration::from_secs(1)).expect("client");
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("/articles"), "http://localhost:8000/api/v1/articles");
    }

    #[tokio::test]
    async fn test_exchange_credentials_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/token"))
            .and(body_string_contains("username=alice%40x.com"))
            .and(body_string_contains("password=hunter22"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-abc",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let credential = api.exchange_credentials("alice@x.com", "hunter22").await.expect("token");
        assert_eq!(credential.as_str(), "jwt-abc");
    }

    #[tokio::test]
    async fn test_exchange_credentials_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "Incorrect email or password"
            })))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let err = api.exchange_credentials("alice@x.com", "wrong").await.expect_err("rejected");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_resolve_identity_sends_explicit_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, "alice")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let user = api
            .resolve_identity(&Credential::parse("T1").expect("token"))
            .await
            .expect("identity");
        assert_eq!(user.username, "alice");

        let err = api
            .resolve_identity(&Credential::parse("T2").expect("token"))
            .await
            .expect_err("unknown token");
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_header_follows_credential_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(5, "2024-05-01T09:30:00")))
            .mount(&server)
            .await;

        let slot = Arc::new(Slot::default());
        let api = client_for(&server).await.with_credentials(slot.clone());

        api.get_article(5).await.expect("anonymous get");
        slot.set(Some("T1"));
        api.get_article(5).await.expect("get with T1");
        slot.set(Some("T2"));
        api.get_article(5).await.expect("get with T2");
        slot.set(None);
        api.get_article(5).await.expect("get after detach");

        let requests = server.received_requests().await.expect("recording enabled");
        let auth: Vec<Option<String>> = requests
            .iter()
            .map(|r| {
                r.headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .collect();
        assert_eq!(
            auth,
            vec![None, Some("Bearer T1".into()), Some("Bearer T2".into()), None]
        );
    }

    #[tokio::test]
    async fn test_list_articles_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                article_json(1, "2024-01-01T00:00:00"),
                article_json(3, "2024-03-01T00:00:00"),
                article_json(2, "2024-02-01T00:00:00"),
            ])))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let ids: Vec<i64> = api.list_articles().await.expect("list").iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_mutations_require_credential() {
        let server = MockServer::start().await;
        let api = client_for(&server).await.with_credentials(Arc::new(Slot::default()));
        let draft = ArticleDraft { title: "t".into(), content: "c".into() };

        assert!(matches!(api.create_article(&draft).await, Err(ApiError::Unauthorized)));
        assert!(matches!(api.update_article(1, &draft).await, Err(ApiError::Unauthorized)));
        assert!(matches!(api.delete_article(1).await, Err(ApiError::Unauthorized)));
        assert!(matches!(
            api.post_comment(1, &CommentDraft { content: "hi".into() }).await,
            Err(ApiError::Unauthorized)
        ));

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty(), "nothing should reach the server");
    }

    #[tokio::test]
    async fn test_create_article_and_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/articles"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(article_json(9, "2024-06-01T12:00:00")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/articles/9/comments"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 4,
                "content": "hi",
                "created_at": "2024-06-01T12:05:00",
                "author": user_json(1, "alice")
            })))
            .mount(&server)
            .await;

        let slot = Arc::new(Slot::default());
        slot.set(Some("T1"));
        let api = client_for(&server).await.with_credentials(slot);

        let article = api
            .create_article(&ArticleDraft { title: "Article 9".into(), content: "body".into() })
            .await
            .expect("create");
        assert_eq!(article.id, 9);

        let comment = api
            .post_comment(article.id, &CommentDraft { content: "hi".into() })
            .await
            .expect("comment");
        assert_eq!(comment.id, 4);
        assert_eq!(comment.author.username, "alice");
    }

    #[tokio::test]
    async fn test_update_and_delete_by_non_author_are_denied() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/articles/1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not enough permissions"})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/articles/1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not enough permissions"})))
            .mount(&server)
            .await;

        let slot = Arc::new(Slot::default());
        slot.set(Some("T2"));
        let api = client_for(&server).await.with_credentials(slot);
        let draft = ArticleDraft { title: "t".into(), content: "c".into() };

        assert!(matches!(api.update_article(1, &draft).await, Err(ApiError::AccessDenied(_))));
        assert!(matches!(api.delete_article(1).await, Err(ApiError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_delete_article_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/articles/3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let slot = Arc::new(Slot::default());
        slot.set(Some("T1"));
        let api = client_for(&server).await.with_credentials(slot);
        api.delete_article(3).await.expect("delete");
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles/404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Article not found"})))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        match api.get_article(404).await {
            Err(ApiError::NotFound(detail)) => assert_eq!(detail, "Article not found"),
            other => panic!("unexpected result: {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let new_user = NewUser {
            username: "alice".into(),
            email: "a@x.com".into(),
            password: "password1".into(),
        };
        assert!(matches!(api.register(&new_user).await, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        assert!(matches!(api.list_articles().await, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let api = ApiClient::with_base_url("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let err = api.list_articles().await.expect_err("nothing listening");
        assert!(err.is_network());
    }
}
