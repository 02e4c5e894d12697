//! Page parameters and the pagination envelope.

use quarry_sql_core::builder::SortOrder;
use serde::{Deserialize, Serialize};

use crate::error::PaginationError;

/// Page sizes accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

/// Raw page parameters, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageRequest {
    pub page: Option<i64>,
    pub count: Option<i64>,
    pub order_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Columns a page may be ordered by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderColumns {
    entries: Vec<(String, Option<String>)>,
}

impl OrderColumns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows ordering by a selected column.
    #[must_use]
    pub fn allow(mut self, name: &str) -> Self {
        self.entries.push((String::from(name), None));
        self
    }

    /// Allows ordering by `name`, sorting on `column`.
    #[must_use]
    pub fn map(mut self, name: &str, column: &str) -> Self {
        self.entries
            .push((String::from(name), Some(String::from(column))));
        self
    }

    fn find(&self, name: &str) -> Option<&(String, Option<String>)> {
        self.entries.iter().find(|(allowed, _)| allowed == name)
    }
}

/// An accepted order column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumn {
    pub name: String,
    pub mapped: Option<String>,
}

impl OrderColumn {
    /// The SQL column to sort on: the mapping, else the selected column of
    /// that name, else its table-qualified form when selected, else the
    /// name as given.
    #[must_use]
    pub fn resolve(&self, selected: &[String], table: &str) -> String {
        if let Some(mapped) = &self.mapped {
            return mapped.clone();
        }
        if selected.iter().any(|column| *column == self.name) {
            return self.name.clone();
        }
        let qualified = format!("{table}.{}", self.name);
        if selected.iter().any(|column| *column == qualified) {
            return qualified;
        }
        self.name.clone()
    }
}

/// Page parameters after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPage {
    pub page: u64,
    pub page_size: u64,
    pub order_by: Option<OrderColumn>,
    pub sort_order: SortOrder,
}

impl PageRequest {
    /// Checks the parameters and fills in defaults.
    ///
    /// # Errors
    ///
    /// [`PaginationError`] for a page below 1, a size outside
    /// `1..=max_page_size`, an order column not in `columns`, or a sort
    /// order other than `asc`/`desc`.
    pub fn validate(&self, config: &PaginationConfig, columns: &OrderColumns) -> Result<ValidatedPage, PaginationError> {
        let page = match self.page {
            None => 1,
            Some(page) => u64::try_from(page)
                .ok()
                .filter(|page| *page >= 1)
                .ok_or(PaginationError::InvalidPage(page))?,
        };
        let page_size = match self.count {
            None => config.default_page_size,
            Some(size) => u64::try_from(size)
                .ok()
                .filter(|size| (1..=config.max_page_size).contains(size))
                .ok_or(PaginationError::InvalidPageSize {
                    size,
                    max: config.max_page_size,
                })?,
        };
        let order_by = match &self.order_by {
            None => None,
            Some(name) => {
                let (name, mapped) = columns
                    .find(name)
                    .ok_or_else(|| PaginationError::UnknownOrderColumn(name.clone()))?;
                Some(OrderColumn {
                    name: name.clone(),
                    mapped: mapped.clone(),
                })
            }
        };
        let sort_order = match &self.sort_order {
            None => SortOrder::Asc,
            Some(order) => order
                .parse()
                .map_err(|_| PaginationError::InvalidSortOrder(order.clone()))?,
        };
        Ok(ValidatedPage {
            page,
            page_size,
            order_by,
            sort_order,
        })
    }
}

/// The slice of a result a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub total: i64,
    pub page_size: u64,
    pub page_count: u64,
    /// The requested page, clamped to the existing ones.
    pub current: u64,
    pub offset: u64,
}

impl PageWindow {
    #[must_use]
    pub fn new(total: i64, page: u64, page_size: u64) -> Self {
        let rows = u64::try_from(total).unwrap_or(0);
        let page_count = if page_size == 0 {
            0
        } else {
            rows.div_ceil(page_size)
        };
        let current = page.min(page_count).max(1);
        Self {
            total,
            page_size,
            page_count,
            current,
            offset: (current - 1) * page_size,
        }
    }

    #[must_use]
    pub const fn info(&self) -> PaginationInfo {
        PaginationInfo {
            current: self.current,
            page_size: self.page_size,
            page_count: self.page_count,
            total: self.total,
        }
    }
}

/// The `pagination` member of a page envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub total: i64,
}

/// One page of items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_is_clamped() {
        let window = PageWindow::new(95, 6, 20);
        assert_eq!(window.page_count, 5);
        assert_eq!(window.current, 5);
        assert_eq!(window.offset, 80);
    }

    #[test]
    fn test_empty_result_stays_on_first_page() {
        let window = PageWindow::new(0, 3, 25);
        assert_eq!(window.page_count, 0);
        assert_eq!(window.current, 1);
        assert_eq!(window.offset, 0);
    }

    #[test]
    fn test_defaults() {
        let page = PageRequest::default()
            .validate(&PaginationConfig::default(), &OrderColumns::new())
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 25);
        assert_eq!(page.order_by, None);
        assert_eq!(page.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let config = PaginationConfig::default();
        let columns = OrderColumns::new().allow("name");
        let request = |page, count, order: &str, sort: &str| PageRequest {
            page: Some(page),
            count: Some(count),
            order_by: Some(order.into()),
            sort_order: Some(sort.into()),
        };
        assert_eq!(
            request(0, 10, "name", "asc").validate(&config, &columns),
            Err(PaginationError::InvalidPage(0))
        );
        assert_eq!(
            request(1, 101, "name", "asc").validate(&config, &columns),
            Err(PaginationError::InvalidPageSize { size: 101, max: 100 })
        );
        assert_eq!(
            request(1, 10, "password", "asc").validate(&config, &columns),
            Err(PaginationError::UnknownOrderColumn("password".into()))
        );
        assert_eq!(
            request(1, 10, "name", "sideways").validate(&config, &columns),
            Err(PaginationError::InvalidSortOrder("sideways".into()))
        );
        assert!(request(2, 10, "name", "DESC").validate(&config, &columns).is_ok());
    }

    #[test]
    fn test_order_column_resolution() {
        let selected = vec![String::from("User.name"), String::from("group_name")];
        let column = |name: &str, mapped: Option<&str>| OrderColumn {
            name: name.into(),
            mapped: mapped.map(String::from),
        };
        assert_eq!(column("name", Some("t1.name")).resolve(&selected, "User"), "t1.name");
        assert_eq!(column("group_name", None).resolve(&selected, "User"), "group_name");
        assert_eq!(column("name", None).resolve(&selected, "User"), "User.name");
        assert_eq!(column("created", None).resolve(&selected, "User"), "created");
    }

    #[test]
    fn test_envelope_is_camel_case() {
        let info = PageWindow::new(95, 6, 20).info();
        assert_eq!(
            serde_json::to_value(info).unwrap(),
            serde_json::json!({"current": 5, "pageSize": 20, "pageCount": 5, "total": 95})
        );
    }
}
