//! Settings for the HTTP post source.

use reqwest::Url;

use crate::harvest::traits::ConfigurationError;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Base URL of the search service; `/search` is appended
    pub api_url: String,

    /// Sent as a bearer token when present
    pub token: Option<String>,

    /// Posts requested per page
    pub page_size: u32,

    pub user_agent: String,
}

impl SourceConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: format!("post-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Checks the settings and returns the full search endpoint.
    pub fn search_url(&self) -> Result<Url, ConfigurationError> {
        if self.page_size == 0 {
            return Err(ConfigurationError::InvalidSetting {
                field: "page_size",
                reason: "must be greater than zero".to_string(),
            });
        }

        let base = Url::parse(self.api_url.trim_end_matches('/')).map_err(|e| {
            ConfigurationError::InvalidSetting {
                field: "api_url",
                reason: e.to_string(),
            }
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidSetting {
                field: "api_url",
                reason: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        Url::parse(&format!("{}/search", base.as_str().trim_end_matches('/'))).map_err(|e| {
            ConfigurationError::InvalidSetting {
                field: "api_url",
                reason: e.to_string(),
            }
        })
    }
}
