use serde::{Deserialize, Serialize};

use crate::pagination::PageRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: request.window(total).total_pages,
        }
    }
}

/// Listing envelope: `{ "data": [...], "meta": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            meta: PageMeta::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Search envelope: total hit count, ordered results, echoed page/per_page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub total: u64,
    pub results: Vec<T>,
    pub page: i64,
    pub per_page: i64,
}
