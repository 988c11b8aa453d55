use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use super::AggregateError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page must be a positive integer")]
    InvalidPage,

    #[error("limit must be a positive integer")]
    InvalidLimit,
}

#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_limit: 10, max_limit: 100 }
    }
}

/// A validated, 1-indexed pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Raw query input is parsed here, once: absent parameters fall back to
    /// the configured defaults, malformed or non-positive values are
    /// rejected, oversized limits are clamped to the cap.
    pub fn from_raw(
        page: Option<&str>,
        limit: Option<&str>,
        limits: &PageLimits,
    ) -> Result<Self, PageError> {
        let page = match page {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or(PageError::InvalidPage)?,
        };
        let limit = match limit {
            None => limits.default_limit,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|l| *l >= 1)
                .ok_or(PageError::InvalidLimit)?,
        };
        Ok(Self { page, limit: limit.min(limits.max_limit) })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of results plus the totals a client needs to iterate further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn from_parts(items: Vec<T>, total_items: u64, request: &PageRequest) -> Self {
        let limit = u64::from(request.limit);
        let total_pages = ((total_items + limit - 1) / limit) as u32;
        Self {
            items,
            total_items,
            page: request.page,
            limit: request.limit,
            total_pages,
        }
    }
}

impl Page<serde_json::Value> {
    /// Decode the raw documents a store backend produced into a typed view.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Page<T>, AggregateError> {
        let items = self
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| AggregateError::Decode(e.to_string()))?;
        Ok(Page {
            items,
            total_items: self.total_items,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        })
    }
}
