//! Application state management for blogdeck.
//!
//! This module contains the `App` struct that owns the session handle, the
//! API clients and all UI state. Pages read the session status to decide
//! what to offer; every call that needs a login goes through `blog`, which
//! pulls the bearer token from the session when the request is built.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use blogdeck_core::api::{ApiClient, ApiError};
use blogdeck_core::auth::{Session, SessionError, SessionStatus, SessionSubscription, TokenStore};
use blogdeck_core::models::{Article, ArticleDraft, CommentDraft, NewUser, User};
use blogdeck_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email/username input.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Minimum password length the backend accepts at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length for an article title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Number of lines to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: u16 = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Which page fills the main area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Article,
    Editor,
}

/// Overlay / modal state on top of the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    SigningUp,
    Commenting,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Sign-up form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpFocus {
    Username,
    Email,
    Password,
    Button,
}

/// Article editor focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorFocus {
    Title,
    Content,
    Button,
}

/// Whether the editor creates a new article or replaces an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    New,
    Edit(i64),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    /// Whether `config` is written back (off for `--ephemeral`)
    pub persist_config: bool,
    pub session: Session,
    session_events: SessionSubscription,
    /// Anonymous client: token exchange and sign-up
    auth_api: ApiClient,
    /// Client whose requests carry the session's credential
    blog: ApiClient,

    // UI State
    pub state: AppState,
    pub page: Page,
    pub status_message: Option<String>,

    // Home
    pub articles: Vec<Article>,
    pub articles_error: Option<String>,
    pub article_selection: usize,

    // Article detail
    pub current_article: Option<Article>,
    pub article_scroll: u16,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Sign-up form state
    pub signup_username: String,
    pub signup_email: String,
    pub signup_password: String,
    pub signup_focus: SignUpFocus,
    pub signup_error: Option<String>,

    // Editor state
    pub editor_mode: EditorMode,
    pub editor_title: String,
    pub editor_content: String,
    pub editor_focus: EditorFocus,
    pub editor_error: Option<String>,

    // Comment composer
    pub comment_input: String,
    pub comment_error: Option<String>,
}

impl App {
    /// Create the application around a fresh, still-`Loading` session.
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let auth_api = ApiClient::new(&config)?;
        let session = Session::new(Arc::new(auth_api.clone()), store);
        let blog = auth_api.with_credentials(Arc::new(session.clone()));
        let session_events = session.subscribe();

        let login_email = config.last_email.clone().unwrap_or_default();

        Ok(Self {
            config,
            persist_config: true,
            session,
            session_events,
            auth_api,
            blog,

            state: AppState::Normal,
            page: Page::Home,
            status_message: None,

            articles: Vec::new(),
            articles_error: None,
            article_selection: 0,

            current_article: None,
            article_scroll: 0,

            login_email,
            login_password: String::new(),
            login_focus: LoginFocus::Email,
            login_error: None,

            signup_username: String::new(),
            signup_email: String::new(),
            signup_password: String::new(),
            signup_focus: SignUpFocus::Username,
            signup_error: None,

            editor_mode: EditorMode::New,
            editor_title: String::new(),
            editor_content: String::new(),
            editor_focus: EditorFocus::Title,
            editor_error: None,

            comment_input: String::new(),
            comment_error: None,
        })
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Kick off the boot-time restore in the background; the UI shows the
    /// `Loading` state until it finishes.
    pub fn start_restore(&self) {
        let session = self.session.clone();
        tokio::spawn(async move {
            let status = session.restore().await;
            debug!(?status, "Restore finished");
        });
    }

    /// Re-check the current credential against the backend without
    /// blocking the UI. A rejected token ends the session.
    pub fn revalidate_in_background(&self) {
        if !self.session.is_authenticated() {
            return;
        }
        let session = self.session.clone();
        tokio::spawn(async move {
            session.revalidate().await;
        });
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn identity(&self) -> Option<User> {
        self.session.identity()
    }

    /// React to session transitions made outside the input handlers
    /// (restore finishing, forced logout). Returns true if anything changed.
    pub fn check_session(&mut self) -> bool {
        if !self.session_events.has_changed() {
            return false;
        }
        let status = self.session_events.seen();
        debug!(?status, "Session status changed");

        if status == SessionStatus::Anonymous {
            self.leave_authenticated_views();
        }
        true
    }

    /// Close the editor and comment composer once nobody is logged in.
    fn leave_authenticated_views(&mut self) {
        if self.page == Page::Editor {
            self.page = if self.current_article.is_some() { Page::Article } else { Page::Home };
            self.reset_editor();
        }
        if self.state == AppState::Commenting {
            self.state = AppState::Normal;
        }
    }

    /// Open the login overlay. Ignored until the session is decided.
    pub fn start_login(&mut self) {
        if !self.session_status().is_decided() {
            self.status_message = Some("Still checking your session...".to_string());
            return;
        }
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    pub fn start_signup(&mut self) {
        if !self.session_status().is_decided() {
            self.status_message = Some("Still checking your session...".to_string());
            return;
        }
        self.state = AppState::SigningUp;
        self.signup_focus = SignUpFocus::Username;
        self.signup_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.trim().to_string();
        let password = std::mem::take(&mut self.login_password);

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        let credential = match self.auth_api.exchange_credentials(&email, &password).await {
            Ok(credential) => credential,
            Err(e) => {
                error!(error = %e, "Token exchange failed");
                self.login_error = Some(if e.is_network() {
                    CONNECTION_ERROR.to_string()
                } else {
                    INVALID_LOGIN.to_string()
                });
                return Err(e.into());
            }
        };

        match self.session.login(credential).await {
            Ok(user) => {
                if self.persist_config {
                    if let Err(e) = self.config.save_last_email(&email) {
                        warn!(error = %e, "Failed to save config");
                    }
                } else {
                    self.config.last_email = Some(email);
                }

                self.session_events.seen();
                self.state = AppState::Normal;
                self.status_message = Some(format!("Welcome, {}", user.username));
                info!(user_id = user.id, "Login successful");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(login_error_message(&e));
                Err(e.into())
            }
        }
    }

    /// Register a new account; on success switch to the login form with the
    /// email filled in.
    pub async fn attempt_signup(&mut self) -> Result<()> {
        if let Err(msg) = validate_signup(&self.signup_username, &self.signup_email, &self.signup_password) {
            self.signup_error = Some(msg.to_string());
            return Err(anyhow::anyhow!(msg));
        }

        let new_user = NewUser {
            username: self.signup_username.trim().to_string(),
            email: self.signup_email.trim().to_string(),
            password: std::mem::take(&mut self.signup_password),
        };

        match self.auth_api.register(&new_user).await {
            Ok(user) => {
                info!(user_id = user.id, "Account created");
                self.login_email = user.email;
                self.login_password.clear();
                self.signup_username.clear();
                self.signup_email.clear();
                self.signup_error = None;
                self.status_message = Some("Account created. Please log in.".to_string());
                self.start_login();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Sign-up failed");
                self.signup_error = Some(match &e {
                    ApiError::BadRequest(_) => "That email is already registered.".to_string(),
                    other => api_error_message(other),
                });
                Err(e.into())
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.session_events.seen();
        self.leave_authenticated_views();
        self.status_message = Some("Logged out".to_string());
    }

    /// Common handling for failed CRUD calls. A rejected credential ends
    /// the session.
    fn report_api_error(&mut self, action: &str, err: &ApiError) -> String {
        error!(error = %err, action = action, "Request failed");
        if matches!(err, ApiError::Unauthorized) {
            self.session.expire();
            self.session_events.seen();
            self.leave_authenticated_views();
            let msg = "Session expired. Please log in again.".to_string();
            self.status_message = Some(msg.clone());
            return msg;
        }
        let msg = format!("{}: {}", action, api_error_message(err));
        self.status_message = Some(msg.clone());
        msg
    }

    // =========================================================================
    // Home
    // =========================================================================

    pub async fn load_articles(&mut self) {
        match self.blog.list_articles().await {
            Ok(articles) => {
                self.articles = articles;
                self.articles_error = None;
                self.article_selection = self
                    .article_selection
                    .min(self.articles.len().saturating_sub(1));
            }
            Err(e) => {
                error!(error = %e, "Failed to load articles");
                self.articles_error = Some(format!("Failed to load articles: {}", api_error_message(&e)));
            }
        }
    }

    pub fn selected_article_id(&self) -> Option<i64> {
        self.articles.get(self.article_selection).map(|a| a.id)
    }

    pub fn select_next(&mut self) {
        if self.article_selection + 1 < self.articles.len() {
            self.article_selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.article_selection = self.article_selection.saturating_sub(1);
    }

    // =========================================================================
    // Article detail
    // =========================================================================

    pub async fn open_article(&mut self, article_id: i64) {
        match self.blog.get_article(article_id).await {
            Ok(article) => {
                self.current_article = Some(article);
                self.article_scroll = 0;
                self.page = Page::Article;
                self.status_message = None;
            }
            Err(e) => {
                let msg = match e {
                    ApiError::NotFound(_) => "Article not found.".to_string(),
                    ref other => self.report_api_error("Failed to load article", other),
                };
                self.status_message = Some(msg);
            }
        }
    }

    pub fn close_article(&mut self) {
        self.page = Page::Home;
        self.current_article = None;
        self.article_scroll = 0;
    }

    /// Edit/delete are offered only to the article's author.
    pub fn can_modify_current_article(&self) -> bool {
        match (&self.current_article, self.identity()) {
            (Some(article), Some(user)) => article.is_authored_by(&user),
            _ => false,
        }
    }

    pub fn start_comment(&mut self) {
        if !self.session.is_authenticated() {
            self.status_message = Some("Log in to comment.".to_string());
            return;
        }
        self.comment_error = None;
        self.state = AppState::Commenting;
    }

    pub async fn submit_comment(&mut self) {
        let content = self.comment_input.trim().to_string();
        if content.is_empty() {
            return;
        }
        let Some(article_id) = self.current_article.as_ref().map(|a| a.id) else {
            return;
        };

        match self.blog.post_comment(article_id, &CommentDraft { content }).await {
            Ok(comment) => {
                if let Some(article) = self.current_article.as_mut() {
                    article.comments.push(comment);
                }
                self.comment_input.clear();
                self.comment_error = None;
                self.state = AppState::Normal;
                self.status_message = Some("Comment posted".to_string());
            }
            Err(e) => {
                let msg = self.report_api_error("Failed to post comment", &e);
                if self.session.is_authenticated() {
                    self.comment_error = Some(msg);
                } else {
                    self.state = AppState::Normal;
                }
            }
        }
    }

    pub fn confirm_delete(&mut self) {
        if self.can_modify_current_article() {
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub async fn delete_current_article(&mut self) {
        self.state = AppState::Normal;
        let Some(article_id) = self.current_article.as_ref().map(|a| a.id) else {
            return;
        };

        match self.blog.delete_article(article_id).await {
            Ok(()) => {
                info!(article_id, "Article deleted");
                self.close_article();
                self.status_message = Some("Article deleted".to_string());
                self.load_articles().await;
            }
            Err(e) => {
                let msg = match e {
                    ApiError::AccessDenied(_) => "You do not have permission to delete this article.".to_string(),
                    ref other => self.report_api_error("Failed to delete article", other),
                };
                self.status_message = Some(msg);
            }
        }
    }

    // =========================================================================
    // Editor
    // =========================================================================

    pub fn start_new_article(&mut self) {
        if !self.session.is_authenticated() {
            self.status_message = Some("Log in to write a post.".to_string());
            return;
        }
        self.reset_editor();
        self.editor_mode = EditorMode::New;
        self.page = Page::Editor;
    }

    /// Open the editor pre-filled with the server's current copy.
    pub async fn start_edit_article(&mut self) {
        if !self.can_modify_current_article() {
            return;
        }
        let Some(article_id) = self.current_article.as_ref().map(|a| a.id) else {
            return;
        };

        match self.blog.get_article(article_id).await {
            Ok(article) => {
                let draft = ArticleDraft::from(&article);
                self.reset_editor();
                self.editor_mode = EditorMode::Edit(article.id);
                self.editor_title = draft.title;
                self.editor_content = draft.content;
                self.page = Page::Editor;
            }
            Err(e) => {
                self.report_api_error("Failed to load article", &e);
            }
        }
    }

    pub fn cancel_editor(&mut self) {
        self.page = match self.editor_mode {
            EditorMode::Edit(_) if self.current_article.is_some() => Page::Article,
            _ => Page::Home,
        };
        self.reset_editor();
    }

    pub async fn save_article(&mut self) {
        let draft = ArticleDraft {
            title: self.editor_title.trim().to_string(),
            content: self.editor_content.clone(),
        };
        if let Err(msg) = validate_article(&draft) {
            self.editor_error = Some(msg.to_string());
            return;
        }

        let result = match self.editor_mode {
            EditorMode::New => self.blog.create_article(&draft).await,
            EditorMode::Edit(id) => self.blog.update_article(id, &draft).await,
        };

        match result {
            Ok(article) => {
                info!(article_id = article.id, "Article saved");
                self.reset_editor();
                self.current_article = Some(article);
                self.article_scroll = 0;
                self.page = Page::Article;
                self.status_message = Some("Article saved".to_string());
                self.load_articles().await;
            }
            Err(ApiError::AccessDenied(_)) => {
                self.editor_error = Some("You do not have permission to edit this article.".to_string());
            }
            Err(e) => {
                let msg = self.report_api_error("Failed to save article", &e);
                if self.page == Page::Editor {
                    self.editor_error = Some(msg);
                }
            }
        }
    }

    fn reset_editor(&mut self) {
        self.editor_title.clear();
        self.editor_content.clear();
        self.editor_focus = EditorFocus::Title;
        self.editor_error = None;
    }
}

// ============================================================================
// Messages and validation
// ============================================================================

const INVALID_LOGIN: &str = "Invalid email or password.";
const CONNECTION_ERROR: &str = "Unable to connect to server. Check your connection.";

/// User-facing text for a failed login.
pub fn login_error_message(err: &SessionError) -> String {
    match err {
        SessionError::Storage(e) => format!("Could not save your session: {:#}", e),
        e if e.is_network() => CONNECTION_ERROR.to_string(),
        _ => INVALID_LOGIN.to_string(),
    }
}

/// User-facing text for a failed API call.
pub fn api_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "Please log in again.".to_string(),
        ApiError::AccessDenied(_) => "You do not have permission to do that.".to_string(),
        ApiError::NotFound(detail) => detail.clone(),
        ApiError::BadRequest(detail) | ApiError::Validation(detail) => detail.clone(),
        ApiError::NetworkError(e) if e.is_timeout() => "Connection timed out. Please try again.".to_string(),
        ApiError::NetworkError(_) => CONNECTION_ERROR.to_string(),
        other => other.to_string(),
    }
}

pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), &'static str> {
    if username.trim().is_empty() {
        return Err("Username is required");
    }
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required");
    }
    if !email.contains('@') {
        return Err("Enter a valid email address");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

pub fn validate_article(draft: &ArticleDraft) -> Result<(), &'static str> {
    if draft.title.trim().is_empty() {
        return Err("Title is required");
    }
    if draft.content.trim().is_empty() {
        return Err("Content is required");
    }
    Ok(())
}

/// Check if a character is valid for text input
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character should be accepted into a single-line field
pub fn can_add_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use blogdeck_core::auth::MemoryTokenStore;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json(id: i64, username: &str) -> serde_json::Value {
        json!({"id": id, "username": username, "email": format!("{}@x.com", username)})
    }

    fn article_json(id: i64, author_id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Article {}", id),
            "content": "body",
            "created_at": "2024-05-01T09:30:00",
            "updated_at": "2024-05-01T09:30:00",
            "author": user_json(author_id, if author_id == 1 { "alice" } else { "bob" }),
            "comments": []
        })
    }

    async fn app_for(server: &MockServer, store: MemoryTokenStore) -> App {
        let config = Config {
            api_base_url: server.uri(),
            request_timeout_secs: 5,
            ..Config::default()
        };
        let mut app = App::new(config, Arc::new(store)).expect("app");
        app.persist_config = false;
        app
    }

    async fn mount_identity(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, "alice")))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_signup() {
        assert!(validate_signup("alice", "a@x.com", "password1").is_ok());
        assert_eq!(validate_signup(" ", "a@x.com", "password1"), Err("Username is required"));
        assert_eq!(validate_signup("alice", "", "password1"), Err("Email is required"));
        assert_eq!(validate_signup("alice", "ax.com", "password1"), Err("Enter a valid email address"));
        assert_eq!(
            validate_signup("alice", "a@x.com", "short"),
            Err("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_validate_article() {
        let ok = ArticleDraft { title: "t".into(), content: "c".into() };
        assert!(validate_article(&ok).is_ok());
        let no_title = ArticleDraft { title: "  ".into(), content: "c".into() };
        assert_eq!(validate_article(&no_title), Err("Title is required"));
        let no_body = ArticleDraft { title: "t".into(), content: "\n".into() };
        assert_eq!(validate_article(&no_body), Err("Content is required"));
    }

    #[test]
    fn test_can_add_char() {
        assert!(can_add_char(0, 10, 'a'));
        assert!(can_add_char(9, 10, 'z'));
        assert!(!can_add_char(10, 10, 'a'));
        assert!(!can_add_char(0, 10, '\n'));
        assert!(!can_add_char(0, 10, '\x00'));
    }

    #[test]
    fn test_login_error_messages() {
        assert_eq!(
            login_error_message(&SessionError::Identity(ApiError::Unauthorized)),
            "Invalid email or password."
        );
        assert_eq!(
            login_error_message(&SessionError::Identity(ApiError::NotFound("gone".into()))),
            "Invalid email or password."
        );
        assert!(login_error_message(&SessionError::Storage(anyhow::anyhow!("disk full")))
            .contains("disk full"));
    }

    // -------------------------------------------------------------------------
    // Flows against a mock backend
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_flow_authenticates_and_persists() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T1", "token_type": "bearer"})))
            .mount(&server)
            .await;

        let store = MemoryTokenStore::default();
        let mut app = app_for(&server, store.clone()).await;
        app.session.restore().await;

        app.start_login();
        assert_eq!(app.state, AppState::LoggingIn);
        app.login_email = "alice@x.com".into();
        app.login_password = "hunter22".into();
        app.attempt_login().await.expect("login");

        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.session_status(), SessionStatus::Authenticated);
        assert!(app.login_password.is_empty());
        assert_eq!(store.peek().map(|c| c.as_str().to_string()), Some("T1".to_string()));
    }

    #[tokio::test]
    async fn test_login_with_bad_password_shows_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect email or password"})))
            .mount(&server)
            .await;

        let mut app = app_for(&server, MemoryTokenStore::default()).await;
        app.session.restore().await;
        app.start_login();
        app.login_email = "alice@x.com".into();
        app.login_password = "wrong".into();

        assert!(app.attempt_login().await.is_err());
        assert_eq!(app.state, AppState::LoggingIn);
        assert_eq!(app.login_error.as_deref(), Some("Invalid email or password."));
        assert_eq!(app.session_status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_login_blocked_while_loading() {
        let server = MockServer::start().await;
        let mut app = app_for(&server, MemoryTokenStore::default()).await;

        app.start_login();
        assert_eq!(app.state, AppState::Normal);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_expired_token_on_create_forces_logout() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/articles"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = MemoryTokenStore::with_token("T1");
        let mut app = app_for(&server, store.clone()).await;
        app.session.restore().await;
        assert!(app.session.is_authenticated());

        app.start_new_article();
        assert_eq!(app.page, Page::Editor);
        app.editor_title = "Hello".into();
        app.editor_content = "World".into();
        app.save_article().await;

        assert_eq!(app.session_status(), SessionStatus::Anonymous);
        assert!(store.peek().is_none());
        assert_eq!(app.status_message.as_deref(), Some("Session expired. Please log in again."));
        assert_eq!(app.page, Page::Home);
    }

    #[tokio::test]
    async fn test_only_author_can_modify() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(1, 1)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(2, 2)))
            .mount(&server)
            .await;

        let mut app = app_for(&server, MemoryTokenStore::with_token("T1")).await;
        app.session.restore().await;

        app.open_article(1).await;
        assert_eq!(app.page, Page::Article);
        assert!(app.can_modify_current_article());

        app.open_article(2).await;
        assert!(!app.can_modify_current_article());
        app.confirm_delete();
        assert_eq!(app.state, AppState::Normal);

        app.logout();
        app.open_article(1).await;
        assert!(!app.can_modify_current_article());
    }

    #[tokio::test]
    async fn test_comment_requires_login() {
        let server = MockServer::start().await;
        let mut app = app_for(&server, MemoryTokenStore::default()).await;
        app.session.restore().await;

        app.start_comment();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.status_message.as_deref(), Some("Log in to comment."));
    }

    #[tokio::test]
    async fn test_posted_comment_is_appended() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v1/articles/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(2, 2)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/articles/2/comments"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 10,
                "content": "Nice post",
                "created_at": "2024-05-02T08:00:00",
                "author": user_json(1, "alice")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, MemoryTokenStore::with_token("T1")).await;
        app.session.restore().await;
        app.open_article(2).await;

        app.start_comment();
        assert_eq!(app.state, AppState::Commenting);
        app.comment_input = "   ".into();
        app.submit_comment().await;
        assert_eq!(app.state, AppState::Commenting, "blank comment is not sent");

        app.comment_input = "Nice post".into();
        app.submit_comment().await;
        assert_eq!(app.state, AppState::Normal);
        let article = app.current_article.as_ref().expect("article");
        assert_eq!(article.comment_count(), 1);
        assert!(app.comment_input.is_empty());
    }

    #[tokio::test]
    async fn test_restore_change_is_observed() {
        let server = MockServer::start().await;
        mount_identity(&server).await;

        let mut app = app_for(&server, MemoryTokenStore::with_token("T1")).await;
        assert_eq!(app.session_status(), SessionStatus::Loading);
        assert!(!app.check_session());

        app.session.restore().await;
        assert!(app.check_session());
        assert_eq!(app.identity().map(|u| u.username), Some("alice".to_string()));
        assert!(!app.check_session());
    }
}
