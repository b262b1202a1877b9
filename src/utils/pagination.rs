use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw list query. Values stay strings so malformed input falls back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        let page = if page <= 0 { 1 } else { page };
        let limit = if limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };
        Self { page, limit }
    }

    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|value| value.trim().parse::<i64>().ok());
        Self::new(parse(page).unwrap_or(1), parse(limit).unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn pagination(&self, total_records: i64) -> Pagination {
        Pagination::new(total_records, self.page, self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_records: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn new(total_records: i64, current_page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_records + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            total_records,
            total_pages,
            current_page,
            page_size,
        }
    }
}
