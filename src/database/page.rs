use serde::{Deserialize, Serialize};

use crate::config;

/// Pagination query parameters shared by every list endpoint.
///
/// Limits are clamped against `ApiConfig.max_limit`; sort columns are
/// validated against a per-resource whitelist so user input never reaches
/// SQL as an identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// "column" or "column.desc" / "column.asc"
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Resolved, SQL-safe pagination values
#[derive(Debug, Clone)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
    pub order_column: &'static str,
    pub order_direction: SortDirection,
}

impl Page {
    pub fn order_sql(&self) -> String {
        format!(
            "\"{}\" {}",
            self.order_column,
            self.order_direction.to_sql()
        )
    }
}

impl PageParams {
    /// Resolve against a column whitelist. The first whitelist entry is the
    /// default sort column. An unknown order column falls back to the
    /// default rather than erroring; direction defaults to descending.
    pub fn resolve(&self, allowed_columns: &[&'static str]) -> Page {
        let api = &config::config().api;
        let limit = self
            .limit
            .unwrap_or(api.default_limit)
            .clamp(1, api.max_limit);
        let offset = self.offset.unwrap_or(0).max(0);

        let (column, direction) = match self.order.as_deref() {
            Some(raw) => {
                let (name, dir) = match raw.rsplit_once('.') {
                    Some((name, "asc")) => (name, SortDirection::Asc),
                    Some((name, "desc")) => (name, SortDirection::Desc),
                    _ => (raw, SortDirection::Desc),
                };
                match allowed_columns.iter().find(|c| **c == name) {
                    Some(col) => (*col, dir),
                    None => (allowed_columns[0], SortDirection::Desc),
                }
            }
            None => (allowed_columns[0], SortDirection::Desc),
        };

        Page {
            limit,
            offset,
            order_column: column,
            order_direction: direction,
        }
    }
}

/// Standard list response body: items plus paging metadata
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["created_at", "updated_at", "name"];

    #[test]
    fn clamps_limit_to_config_max() {
        let params = PageParams {
            limit: Some(1_000_000),
            offset: Some(-5),
            order: None,
        };
        let page = params.resolve(COLUMNS);
        assert!(page.limit <= crate::config::config().api.max_limit);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn parses_order_direction_suffix() {
        let params = PageParams {
            limit: None,
            offset: None,
            order: Some("name.asc".to_string()),
        };
        let page = params.resolve(COLUMNS);
        assert_eq!(page.order_column, "name");
        assert_eq!(page.order_direction, SortDirection::Asc);
        assert_eq!(page.order_sql(), "\"name\" ASC");
    }

    #[test]
    fn unknown_column_falls_back_to_default() {
        let params = PageParams {
            limit: None,
            offset: None,
            order: Some("password_hash.desc".to_string()),
        };
        let page = params.resolve(COLUMNS);
        assert_eq!(page.order_column, "created_at");
    }

    #[test]
    fn defaults_to_newest_first() {
        let page = PageParams::default().resolve(COLUMNS);
        assert_eq!(page.order_column, "created_at");
        assert_eq!(page.order_direction, SortDirection::Desc);
    }
}
