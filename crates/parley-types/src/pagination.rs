use serde::{Deserialize, Serialize};

/// Offset/limit window over an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Compute the window for a requested page.
///
/// `page` and `per_page` are clamped to a minimum of 1. `total_pages` is
/// `ceil(total / per_page)`, which is 0 for an empty result set. No upper
/// bound is applied to `per_page` here; see [`crate::PaginationPolicy`].
pub fn window(page: i64, per_page: i64, total: u64) -> Window {
    let page = page.max(1) as u64;
    let per_page = per_page.max(1) as u64;

    Window {
        offset: (page - 1).saturating_mul(per_page),
        limit: per_page,
        total_pages: total.div_ceil(per_page),
    }
}

/// A page request whose values have already been clamped to >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        self.window(0).offset
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    pub fn window(&self, total: u64) -> Window {
        window(self.page, self.per_page, total)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, crate::config::DEFAULT_PER_PAGE)
    }
}

/// Lenient integer coercion for query-string values.
///
/// Reads an optional sign followed by leading digits and ignores the rest;
/// input without leading digits coerces to 0. Saturates instead of overflowing.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_empty_total() {
        assert_eq!(
            window(1, 20, 0),
            Window { offset: 0, limit: 20, total_pages: 0 }
        );
    }

    #[test]
    fn test_window_clamps_page() {
        assert_eq!(
            window(0, 20, 45),
            Window { offset: 0, limit: 20, total_pages: 3 }
        );
        assert_eq!(window(-7, 20, 45).offset, 0);
    }

    #[test]
    fn test_window_third_page() {
        assert_eq!(
            window(3, 20, 45),
            Window { offset: 40, limit: 20, total_pages: 3 }
        );
    }

    #[test]
    fn test_window_clamps_per_page() {
        let w = window(2, 0, 5);
        assert_eq!(w.limit, 1);
        assert_eq!(w.offset, 1);
        assert_eq!(w.total_pages, 5);
    }

    #[test]
    fn test_window_exact_multiple() {
        assert_eq!(window(1, 10, 40).total_pages, 4);
        assert_eq!(window(1, 10, 41).total_pages, 5);
    }

    #[test]
    fn test_window_huge_page_saturates() {
        let w = window(i64::MAX, i64::MAX, 1);
        assert_eq!(w.offset, u64::MAX);
        assert_eq!(w.total_pages, 1);
    }

    #[test]
    fn test_page_request_offset() {
        let req = PageRequest::new(3, 20);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int("3"), 3);
        assert_eq!(coerce_int("  42abc"), 42);
        assert_eq!(coerce_int("abc"), 0);
        assert_eq!(coerce_int(""), 0);
        assert_eq!(coerce_int("-5"), -5);
        assert_eq!(coerce_int("+8"), 8);
        assert_eq!(coerce_int("99999999999999999999999"), i64::MAX);
    }
}
