//! Page/per_page query parameters and the `{list, pagination}` envelope shared
//! by every list endpoint.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::AppError;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Validated paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl PageParams {
    pub fn validate(&self) -> Result<Page, AppError> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(AppError::Validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        // The row offset must fit in a BIGINT.
        if (page - 1).checked_mul(per_page).is_none() {
            return Err(AppError::Validation("page is too large".to_string()));
        }
        Ok(Page { page, per_page })
    }
}

impl Page {
    /// Only valid on a `Page` returned by `PageParams::validate`.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(
    ResumePage = Paginated<crate::models::resume::ResumeRow>,
    CoverLetterPage = Paginated<crate::models::cover_letter::CoverLetterRow>,
    JobQueryPage = Paginated<crate::models::job_query::JobQueryRow>,
    JobFlowPage = Paginated<crate::job_flows::handlers::JobFlowSummary>
)]
pub struct Paginated<T> {
    pub list: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> Paginated<T> {
    pub fn new(list: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            list,
            pagination: PaginationInfo {
                total,
                current_page: page.page,
                total_pages: total_pages(total, page.per_page),
                per_page: page.per_page,
            },
        }
    }
}

/// Ceiling division; zero items means zero pages.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageParams {
            page: None,
            per_page: None,
        }
        .validate()
        .unwrap();
        assert_eq!(page, Page { page: 1, per_page: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset_for_third_page() {
        let page = PageParams {
            page: Some(3),
            per_page: Some(20),
        }
        .validate()
        .unwrap();
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_page_past_offset_range_rejected() {
        let err = PageParams {
            page: Some(i64::MAX),
            per_page: Some(100),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "page is too large"));
    }

    #[test]
    fn test_largest_page_with_single_item_pages() {
        let page = PageParams {
            page: Some(i64::MAX),
            per_page: Some(1),
        }
        .validate()
        .unwrap();
        assert_eq!(page.offset(), i64::MAX - 1);
    }

    #[test]
    fn test_page_zero_rejected() {
        let err = PageParams {
            page: Some(0),
            per_page: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_per_page_out_of_range_rejected() {
        for per_page in [0, -5, 101] {
            let result = PageParams {
                page: None,
                per_page: Some(per_page),
            }
            .validate();
            assert!(result.is_err(), "per_page={per_page} should be rejected");
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 10), 10);
    }

    #[test]
    fn test_envelope_uses_camel_case_keys() {
        let page = Page { page: 2, per_page: 5 };
        let body = Paginated::new(vec!["a", "b"], 7, page);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["list"].as_array().unwrap().len(), 2);
        assert_eq!(json["pagination"]["total"], 7);
        assert_eq!(json["pagination"]["currentPage"], 2);
        assert_eq!(json["pagination"]["totalPages"], 2);
        assert_eq!(json["pagination"]["perPage"], 5);
    }
}
