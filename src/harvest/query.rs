//! Search expression construction.
//!
//! A [`SearchCriteria`] is turned into the single string the source's
//! search parser understands: `<query> from:<author> since:<date> until:<date> `
//! with absent clauses left out.

use chrono::{Duration, Local, NaiveDate};

use crate::harvest::traits::ConfigurationError;

/// One end of the search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// Offset in days from the date the expression is built
    Relative(i64),

    /// Fixed calendar date
    On(NaiveDate),

    /// No bound; the clause is omitted
    Open,
}

impl DateBound {
    fn resolve(
        self,
        today: NaiveDate,
        field: &'static str,
    ) -> Result<Option<NaiveDate>, ConfigurationError> {
        match self {
            DateBound::Relative(days) => Duration::try_days(days)
                .and_then(|offset| today.checked_add_signed(offset))
                .map(Some)
                .ok_or_else(|| ConfigurationError::InvalidSetting {
                    field,
                    reason: format!("{days} days from {today} is out of range"),
                }),
            DateBound::On(date) => Ok(Some(date)),
            DateBound::Open => Ok(None),
        }
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::On(date)
    }
}

impl From<Option<NaiveDate>> for DateBound {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(DateBound::Open, DateBound::On)
    }
}

/// What to search for. `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub author: Option<String>,
    pub since: DateBound,
    pub until: DateBound,
}

impl Default for SearchCriteria {
    /// Yesterday (inclusive) to tomorrow (exclusive), resolved per build.
    fn default() -> Self {
        Self {
            query: None,
            author: None,
            since: DateBound::Relative(-1),
            until: DateBound::Relative(1),
        }
    }
}

impl SearchCriteria {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn author(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_since(mut self, since: impl Into<DateBound>) -> Self {
        self.since = since.into();
        self
    }

    pub fn with_until(mut self, until: impl Into<DateBound>) -> Self {
        self.until = until.into();
        self
    }

    /// Fails if neither a query nor an author is present.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if present(&self.query).is_none() && present(&self.author).is_none() {
            return Err(ConfigurationError::MissingTarget);
        }
        Ok(())
    }

    /// Name component of the output file: the query, else the author.
    pub fn target_name(&self) -> Result<&str, ConfigurationError> {
        present(&self.query)
            .or_else(|| present(&self.author))
            .ok_or(ConfigurationError::MissingTarget)
    }
}

/// Builds the search expression, resolving relative bounds against today.
pub fn build_expression(criteria: &SearchCriteria) -> Result<String, ConfigurationError> {
    build_expression_on(criteria, Local::now().date_naive())
}

/// Builds the search expression, resolving relative bounds against `today`.
pub fn build_expression_on(
    criteria: &SearchCriteria,
    today: NaiveDate,
) -> Result<String, ConfigurationError> {
    criteria.validate()?;

    let mut expression = String::new();
    if let Some(query) = present(&criteria.query) {
        expression.push_str(&format!("{query} "));
    }
    if let Some(author) = present(&criteria.author) {
        expression.push_str(&format!("from:{author} "));
    }
    if let Some(since) = criteria.since.resolve(today, "since")? {
        expression.push_str(&format!("since:{} ", since.format("%Y-%m-%d")));
    }
    if let Some(until) = criteria.until.resolve(today, "until")? {
        expression.push_str(&format!("until:{} ", until.format("%Y-%m-%d")));
    }
    Ok(expression)
}

/// Treats empty strings like absent values.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_query_and_author_is_rejected() {
        let criteria = SearchCriteria::default();
        assert_eq!(
            build_expression(&criteria),
            Err(ConfigurationError::MissingTarget)
        );

        let empty = SearchCriteria::query("");
        assert_eq!(empty.validate(), Err(ConfigurationError::MissingTarget));
    }

    #[test]
    fn test_query_with_fixed_window() {
        let criteria = SearchCriteria::query("rust")
            .with_since(date(2024, 1, 1))
            .with_until(date(2024, 1, 2));

        let expression = build_expression(&criteria).unwrap();
        assert_eq!(expression, "rust since:2024-01-01 until:2024-01-02 ");
    }

    #[test]
    fn test_clause_order_with_all_parts() {
        let criteria = SearchCriteria::query("async runtime")
            .with_author("tokio_rs")
            .with_since(date(2023, 12, 31))
            .with_until(date(2024, 2, 1));

        let expression = build_expression(&criteria).unwrap();
        assert_eq!(
            expression,
            "async runtime from:tokio_rs since:2023-12-31 until:2024-02-01 "
        );
    }

    #[test]
    fn test_open_bounds_are_omitted() {
        let criteria = SearchCriteria::author("ferris")
            .with_since(DateBound::Open)
            .with_until(DateBound::Open);

        assert_eq!(build_expression(&criteria).unwrap(), "from:ferris ");
    }

    #[test]
    fn test_absent_author_leaves_no_prefix() {
        let criteria = SearchCriteria::query("rust").with_until(DateBound::Open);
        let expression = build_expression_on(&criteria, date(2024, 6, 10)).unwrap();
        assert!(!expression.contains("from:"));
        assert_eq!(expression, "rust since:2024-06-09 ");
    }

    #[test]
    fn test_default_window_is_relative_to_build_date() {
        let criteria = SearchCriteria::author("ferris");

        let first = build_expression_on(&criteria, date(2024, 3, 1)).unwrap();
        assert_eq!(first, "from:ferris since:2024-02-29 until:2024-03-02 ");

        let later = build_expression_on(&criteria, date(2025, 1, 1)).unwrap();
        assert_eq!(later, "from:ferris since:2024-12-31 until:2025-01-02 ");
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let criteria = SearchCriteria::query("rust").with_since(DateBound::Relative(i64::MAX));
        let err = build_expression_on(&criteria, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSetting { field: "since", .. }));

        let criteria = SearchCriteria::query("rust").with_until(DateBound::Relative(1_000_000_000));
        let err = build_expression_on(&criteria, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSetting { field: "until", .. }));
    }

    #[test]
    fn test_target_name_prefers_query() {
        let criteria = SearchCriteria::query("rust").with_author("ferris");
        assert_eq!(criteria.target_name().unwrap(), "rust");
        assert_eq!(SearchCriteria::author("ferris").target_name().unwrap(), "ferris");
    }
}
