pub mod inventory;
pub mod purchase_orders;
pub mod suppliers;
pub mod users;

use crate::errors::ServiceError;

/// Sort direction accepted by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses the `order` query parameter, defaulting when absent.
    pub fn parse(raw: Option<&str>, default: SortOrder) -> Result<Self, ServiceError> {
        match raw {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "asc" => Ok(SortOrder::Asc),
                "desc" => Ok(SortOrder::Desc),
                other => Err(ServiceError::ValidationError(format!(
                    "Invalid sort order '{other}'. Must be 'asc' or 'desc'"
                ))),
            },
        }
    }
}

/// Page window for list queries. Limits are clamped to keep a single request
/// from dragging an unbounded result set through the store.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Total page count for a result set of `total` rows.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_out_of_range_values() {
        let page = Page::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);

        let page = Page::new(3, 1000);
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.offset(), 2 * Page::MAX_LIMIT);
    }

    #[test]
    fn pages_rounds_up() {
        let page = Page::new(1, 10);
        assert_eq!(page.pages(0), 0);
        assert_eq!(page.pages(10), 1);
        assert_eq!(page.pages(11), 2);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!(
            SortOrder::parse(None, SortOrder::Desc).unwrap(),
            SortOrder::Desc
        );
        assert_eq!(
            SortOrder::parse(Some("ASC"), SortOrder::Desc).unwrap(),
            SortOrder::Asc
        );
        assert!(SortOrder::parse(Some("sideways"), SortOrder::Asc).is_err());
    }
}
