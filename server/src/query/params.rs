//! Resolution of raw list parameters into a [`ListQuery`].

use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

use super::{ListQuery, QueryError};

/// Raw list parameters as they arrive in the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

/// Handling of numeric parameters that are present but not usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamPolicy {
    /// Treat the parameter as absent and fall back to the next mode
    #[default]
    Lenient,
    /// Reject the request with [`QueryError::InvalidParameter`]
    Strict,
}

impl FromStr for ParamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ParamPolicy::Lenient),
            "strict" => Ok(ParamPolicy::Strict),
            other => Err(format!("unknown parameter policy: {}", other)),
        }
    }
}

impl ListParams {
    /// Pick the list mode.
    ///
    /// `page` and `pageSize` must both be integers >= 1 to paginate, and take
    /// precedence over `limit`, which must be an integer >= 0.
    pub fn resolve(&self, policy: ParamPolicy) -> Result<ListQuery, QueryError> {
        let mut query = ListQuery::all();
        if let Some(q) = &self.q {
            query = query.with_search(q.as_str());
        }

        let page = parse_count(policy, "page", self.page.as_deref(), 1)?;
        let page_size = parse_count(policy, "pageSize", self.page_size.as_deref(), 1)?;
        if let (Some(page), Some(page_size)) = (page, page_size) {
            return Ok(query.with_page(page, page_size));
        }

        if let Some(limit) = parse_count(policy, "limit", self.limit.as_deref(), 0)? {
            return Ok(query.with_limit(limit));
        }

        Ok(query)
    }
}

/// Parse a non-negative count no smaller than `min`.
///
/// An empty value is always absent.
fn parse_count(
    policy: ParamPolicy,
    name: &'static str,
    raw: Option<&str>,
    min: usize,
) -> Result<Option<usize>, QueryError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value >= min => Ok(Some(value)),
        _ => match policy {
            ParamPolicy::Lenient => {
                debug!("Ignoring unusable query parameter {}={:?}", name, raw);
                Ok(None)
            }
            ParamPolicy::Strict => Err(QueryError::InvalidParameter {
                name,
                value: raw.to_string(),
            }),
        },
    }
}

#[cfg(test)]
impl ListParams {
    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    pub fn paged(page: impl Into<String>, page_size: impl Into<String>) -> Self {
        Self {
            page: Some(page.into()),
            page_size: Some(page_size.into()),
            ..Default::default()
        }
    }

    pub fn limited(limit: impl Into<String>) -> Self {
        Self {
            limit: Some(limit.into()),
            ..Default::default()
        }
    }
}
