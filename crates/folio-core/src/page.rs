//! Page request normalization and pagination arithmetic.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// Page size used when the request asks for none.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// The page a caller asks for. Zero fields mean "use the default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    pub page_size: i64,
    pub current_page: i64,
}

impl PageRequest {
    pub fn new(current_page: i64, page_size: i64) -> Self {
        Self {
            page_size,
            current_page,
        }
    }

    /// Substitutes defaults for zero values.
    ///
    /// A page size of zero becomes `default_size`; a current page below one
    /// becomes one.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidPageSize`] for a negative page size or a
    /// non-positive default.
    pub fn normalize(self, default_size: i64) -> Result<Self> {
        let page_size = match self.page_size {
            0 => default_size,
            size => size,
        };
        if page_size <= 0 {
            return Err(QueryError::InvalidPageSize(page_size));
        }

        Ok(Self {
            page_size,
            current_page: self.current_page.max(1),
        })
    }
}

/// Result of the pagination arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: i64,
    pub current_page: i64,
    pub first_index: i64,
    pub total_page_count: i64,
    pub total_data_count: i64,
}

/// Computes the offset and page count of a request.
///
/// The request is normalized first, so this never divides by zero and never
/// produces a negative offset.
pub fn paginate(request: PageRequest, total_data_count: i64, default_size: i64) -> Result<Pagination> {
    let request = request.normalize(default_size)?;
    let total_data_count = total_data_count.max(0);

    Ok(Pagination {
        page_size: request.page_size,
        current_page: request.current_page,
        first_index: request
            .page_size
            .saturating_mul(request.current_page - 1),
        total_page_count: total_data_count.saturating_add(request.page_size - 1)
            / request.page_size,
        total_data_count,
    })
}
