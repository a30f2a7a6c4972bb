use serde::{Deserialize, Serialize};

use crate::pagination::{coerce_int, PageRequest};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const DEFAULT_MAX_PER_PAGE: i64 = 100;

/// Turns raw `page`/`per_page` query values into a [`PageRequest`].
///
/// Absent values take the defaults, present values are coerced leniently and
/// clamped to >= 1, and `per_page` is then clamped to `max_per_page`
/// (0 disables the ceiling).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationPolicy {
    #[serde(default = "default_per_page")]
    pub default_per_page: i64,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: i64,
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

fn default_max_per_page() -> i64 {
    DEFAULT_MAX_PER_PAGE
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}

impl PaginationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_per_page(mut self, per_page: i64) -> Self {
        self.default_per_page = per_page;
        self
    }

    pub fn with_max_per_page(mut self, max: i64) -> Self {
        self.max_per_page = max;
        self
    }

    pub fn normalize(&self, page: Option<&str>, per_page: Option<&str>) -> PageRequest {
        let page = page.map(coerce_int).unwrap_or(1);
        let per_page = per_page
            .map(coerce_int)
            .unwrap_or(self.default_per_page)
            .max(1);

        let per_page = if self.max_per_page > 0 {
            per_page.min(self.max_per_page)
        } else {
            per_page
        };

        PageRequest::new(page, per_page)
    }
}
