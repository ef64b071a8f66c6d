use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    pub author: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    pub author: User,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Article {
    /// Whether `user` wrote this article (edit/delete are author-only).
    pub fn is_authored_by(&self, user: &User) -> bool {
        self.author.id == user.id
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

/// Body for creating or replacing an article.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
}

impl From<&Article> for ArticleDraft {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentDraft {
    pub content: String,
}

/// Order articles for the home page: most recently created first.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
