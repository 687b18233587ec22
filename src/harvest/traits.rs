//! Output rows and error types for the harvest loops.
//!
//! This module defines:
//! - The [`CsvRecord`] trait tying a flat row type to its fixed header
//! - The two row shapes written to disk: [`PostRow`] and [`UserRow`]
//! - Error types for configuration, persistence and the whole harvest

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Author, Post};
use crate::traits::SourceError;

// ============================================================================
// Record Trait
// ============================================================================

/// A flat row that can be appended to a CSV output file.
///
/// The serialized field order must match [`CsvRecord::HEADER`]; the sink
/// writes the header itself so that a run producing zero rows still leaves a
/// valid table behind.
pub trait CsvRecord: Serialize {
    /// Column names, in serialization order.
    const HEADER: &'static [&'static str];
}

// ============================================================================
// Row Structures
// ============================================================================

/// One harvested post with a snapshot of its author's profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRow {
    pub tweet_id: u64,
    pub date: DateTime<Utc>,
    pub tweet: String,
    pub retweets: u64,
    pub likes: u64,
    pub quote_tweets: u64,
    pub replies: u64,
    pub retweeted_tweet: Option<u64>,
    pub quoted_tweet: Option<u64>,
    pub user_name: String,
    pub user_display_name: Option<String>,
    pub user_description: Option<String>,
    pub user_verified: bool,
    pub user_location: Option<String>,
    pub user_created: Option<DateTime<Utc>>,
    pub user_followers: u64,
    pub user_following: u64,
    pub user_tweets_count: u64,
}

impl CsvRecord for PostRow {
    const HEADER: &'static [&'static str] = &[
        "tweet_id",
        "date",
        "tweet",
        "retweets",
        "likes",
        "quote_tweets",
        "replies",
        "retweeted_tweet",
        "quoted_tweet",
        "user_name",
        "user_display_name",
        "user_description",
        "user_verified",
        "user_location",
        "user_created",
        "user_followers",
        "user_following",
        "user_tweets_count",
    ];
}

impl From<Post> for PostRow {
    fn from(post: Post) -> Self {
        let user = post.user;
        Self {
            tweet_id: post.id,
            date: post.date,
            tweet: post.content,
            retweets: post.retweet_count,
            likes: post.like_count,
            quote_tweets: post.quote_count,
            replies: post.reply_count,
            retweeted_tweet: post.retweeted_post.map(|r| r.id),
            quoted_tweet: post.quoted_post.map(|r| r.id),
            user_name: user.username,
            user_display_name: user.displayname,
            user_description: user.description,
            user_verified: user.verified,
            user_location: user.location,
            user_created: user.created,
            user_followers: user.followers_count,
            user_following: user.friends_count,
            user_tweets_count: user.statuses_count,
        }
    }
}

/// Profile snapshot of one account, taken from its first discoverable post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub user_id: u64,
    pub user_name: String,
    pub user_display_name: Option<String>,
    pub user_description: Option<String>,
    pub user_verified: bool,
    pub user_created: Option<DateTime<Utc>>,
    pub user_followers: u64,
    pub user_following: u64,
    pub user_tweets_count: u64,
    pub user_location: Option<String>,
}

impl CsvRecord for UserRow {
    const HEADER: &'static [&'static str] = &[
        "user_id",
        "user_name",
        "user_display_name",
        "user_description",
        "user_verified",
        "user_created",
        "user_followers",
        "user_following",
        "user_tweets_count",
        "user_location",
    ];
}

impl From<Author> for UserRow {
    fn from(author: Author) -> Self {
        Self {
            user_id: author.id,
            user_name: author.username,
            user_display_name: author.displayname,
            user_description: author.description,
            user_verified: author.verified,
            user_created: author.created,
            user_followers: author.followers_count,
            user_following: author.friends_count,
            user_tweets_count: author.statuses_count,
            user_location: author.location,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Invalid harvest parameters, detected before any I/O.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither a free-text query nor an author handle was given
    #[error("Must specify either query or user")]
    MissingTarget,

    /// A users harvest was given no handles and no label to name its output
    #[error("Must specify at least one handle or an output label")]
    MissingLabel,

    /// Source settings are unusable
    #[error("Invalid source setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Failure to create or append to an output file.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File could not be created, written or flushed
    #[error("I/O error on output file: {0}")]
    Io(#[from] std::io::Error),

    /// Row could not be encoded
    #[error("CSV error on output file: {0}")]
    Csv(#[from] csv::Error),
}

/// Any failure that aborts a harvest.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The source failed while producing the next record
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] SourceError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostRef;
    use chrono::TimeZone;

    fn author() -> Author {
        Author {
            id: 42,
            username: "ferris".to_string(),
            displayname: Some("Ferris".to_string()),
            description: None,
            verified: true,
            location: Some("Berlin".to_string()),
            created: Some(Utc.with_ymd_and_hms(2015, 5, 15, 0, 0, 0).unwrap()),
            followers_count: 10,
            friends_count: 3,
            statuses_count: 99,
        }
    }

    #[test]
    fn test_post_row_maps_every_field() {
        let post = Post {
            id: 7,
            date: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            content: "hello".to_string(),
            retweet_count: 1,
            like_count: 2,
            quote_count: 3,
            reply_count: 4,
            retweeted_post: None,
            quoted_post: Some(PostRef { id: 5, url: None }),
            user: author(),
        };

        let row = PostRow::from(post);
        assert_eq!(row.tweet_id, 7);
        assert_eq!(row.tweet, "hello");
        assert_eq!(
            (row.retweets, row.likes, row.quote_tweets, row.replies),
            (1, 2, 3, 4)
        );
        assert_eq!(row.retweeted_tweet, None);
        assert_eq!(row.quoted_tweet, Some(5));
        assert_eq!(row.user_name, "ferris");
        assert_eq!(row.user_following, 3);
        assert_eq!(row.user_tweets_count, 99);
    }

    #[test]
    fn test_user_row_takes_profile_fields() {
        let row = UserRow::from(author());
        assert_eq!(row.user_id, 42);
        assert_eq!(row.user_display_name.as_deref(), Some("Ferris"));
        assert!(row.user_verified);
        assert_eq!(row.user_location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_headers_match_field_count() {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        writer.serialize(UserRow::from(author())).unwrap();
        let bytes = writer.into_inner().unwrap();
        let line = String::from_utf8(bytes).unwrap();
        let fields = line.trim_end().split(',').count();
        assert_eq!(fields, UserRow::HEADER.len());
    }
}
