use crate::model::Post;
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Lazy, ordered sequence of posts produced by a [`PostSource`].
pub type PostStream<'a> = BoxStream<'a, Result<Post, SourceError>>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Source returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Returns a short identifier for this source (e.g., "http").
    fn source_id(&self) -> &str;

    /// Starts a search for the given expression.
    ///
    /// Nothing is fetched until the returned stream is polled, and the
    /// stream may be unbounded.
    fn search<'a>(&'a self, expression: &str) -> PostStream<'a>;

    /// Returns the first post matching `expression`, if any.
    ///
    /// Stops consuming the stream after one item.
    async fn first(&self, expression: &str) -> Result<Option<Post>, SourceError> {
        use futures::StreamExt;

        let mut stream = self.search(expression);
        stream.next().await.transpose()
    }
}

#[async_trait]
impl<S> PostSource for std::sync::Arc<S>
where
    S: PostSource + ?Sized,
{
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn search<'a>(&'a self, expression: &str) -> PostStream<'a> {
        (**self).search(expression)
    }

    async fn first(&self, expression: &str) -> Result<Option<Post>, SourceError> {
        (**self).first(expression).await
    }
}
