//! Cursor-paged JSON search service.
//!
//! `GET {api_url}/search?q=<expression>&count=<n>[&cursor=<c>]` answers with
//! `{ "posts": [...], "next_cursor": "..." }`. Pages are requested only once
//! the previous page has been consumed; an empty page or a missing cursor
//! ends the stream.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::SourceConfig;
use crate::harvest::traits::ConfigurationError;
use crate::model::Post;
use crate::traits::{PostSource, PostStream, SourceError};

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Paging state carried between pulls.
struct Cursor {
    expression: String,
    buffer: VecDeque<Post>,
    next: Option<String>,
    exhausted: bool,
}

pub struct HttpPostSource {
    client: Client,
    search_url: Url,
    token: Option<String>,
    page_size: String,
}

impl HttpPostSource {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigurationError> {
        Self::with_client(config, Client::builder())
    }

    /// Builds the source from a caller-supplied client builder.
    pub fn with_client(
        config: &SourceConfig,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, ConfigurationError> {
        let search_url = config.search_url()?;
        let client = builder
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigurationError::InvalidSetting {
                field: "client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            search_url,
            token: config.token.clone(),
            page_size: config.page_size.to_string(),
        })
    }

    async fn fetch_page(
        &self,
        expression: &str,
        cursor: Option<&str>,
    ) -> Result<SearchPage, SourceError> {
        let mut request = self
            .client
            .get(self.search_url.clone())
            .query(&[("q", expression), ("count", self.page_size.as_str())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let page: SearchPage = serde_json::from_str(&body)?;
        debug!(
            posts = page.posts.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched search page"
        );
        Ok(page)
    }

    /// Yields the next buffered post, fetching a page when the buffer is empty.
    async fn advance(&self, mut cursor: Cursor) -> Result<Option<(Post, Cursor)>, SourceError> {
        loop {
            if let Some(post) = cursor.buffer.pop_front() {
                return Ok(Some((post, cursor)));
            }
            if cursor.exhausted {
                return Ok(None);
            }

            let page = self
                .fetch_page(&cursor.expression, cursor.next.as_deref())
                .await?;
            cursor.exhausted = page.posts.is_empty() || page.next_cursor.is_none();
            cursor.next = page.next_cursor;
            cursor.buffer.extend(page.posts);
        }
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    fn source_id(&self) -> &str {
        "http"
    }

    fn search<'a>(&'a self, expression: &str) -> PostStream<'a> {
        let cursor = Cursor {
            expression: expression.to_string(),
            buffer: VecDeque::new(),
            next: None,
            exhausted: false,
        };

        futures::stream::try_unfold(cursor, move |cursor| self.advance(cursor)).boxed()
    }
}
