use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub date: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub retweeted_post: Option<PostRef>,
    #[serde(default)]
    pub quoted_post: Option<PostRef>,
    pub user: Author,
}

/// Reference to another post (reshare or quote).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRef {
    pub id: u64,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub username: String, // handle, without the leading "@"
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
}
