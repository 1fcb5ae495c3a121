//! The request pipeline.
//!
//! [`run_query`] derives the plan, counts the matching rows, computes the
//! page, derives facet options and loads the page rows. Any storage failure
//! aborts the whole request.

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    builder::PlanBuilder,
    error::{QueryError, Result},
    facet::{derive_facets, FacetOptions},
    page::{paginate, PageRequest, DEFAULT_PAGE_SIZE},
    schema::{BaseModel, FilterSchema, OutputSchema, RequestValues},
    storage::{CountQuery, PageQuery, Storage},
};

/// Everything one paged, filtered request needs.
#[derive(Debug, Clone, Copy)]
pub struct QueryInput<'a> {
    pub page: PageRequest,
    pub schema: &'a FilterSchema,
    pub values: &'a RequestValues,
    pub output: &'a OutputSchema,
    pub model: &'a BaseModel,
    /// Join clause appended after the base table, trusted SQL.
    pub join: Option<&'a str>,
    pub include_soft_deleted: bool,
    /// Log the rendered SQL at info level instead of debug.
    pub debug_trace: bool,
    pub default_page_size: i64,
}

impl<'a> QueryInput<'a> {
    pub fn new(
        schema: &'a FilterSchema,
        values: &'a RequestValues,
        output: &'a OutputSchema,
        model: &'a BaseModel,
    ) -> Self {
        Self {
            page: PageRequest::default(),
            schema,
            values,
            output,
            model,
            join: None,
            include_soft_deleted: false,
            debug_trace: false,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn with_join(mut self, join: Option<&'a str>) -> Self {
        self.join = join;
        self
    }

    pub fn with_soft_deleted(mut self, include: bool) -> Self {
        self.include_soft_deleted = include;
        self
    }

    pub fn with_debug_trace(mut self, debug_trace: bool) -> Self {
        self.debug_trace = debug_trace;
        self
    }

    pub fn with_default_page_size(mut self, size: i64) -> Self {
        self.default_page_size = size;
        self
    }
}

/// One page of results with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<R> {
    pub page_size: i64,
    pub current_page: i64,
    pub total_page_count: i64,
    pub total_data_count: i64,
    #[serde(skip)]
    pub first_index: i64,
    #[serde(rename = "list")]
    pub rows: Vec<R>,
    #[serde(rename = "options", skip_serializing_if = "Option::is_none")]
    pub facet_options: Option<FacetOptions>,
}

fn trace_sql(enabled: bool, kind: &str, sql: &str) {
    if enabled {
        info!(kind, sql, "rendered query");
    } else {
        debug!(kind, sql, "rendered query");
    }
}

/// Runs a paged, filtered query against `storage`.
///
/// # Errors
///
/// [`QueryError::InvalidPageSize`] before any query is issued when the page
/// size is negative, [`QueryError::Storage`] when any storage call fails.
pub fn run_query<S: Storage>(storage: &mut S, input: &QueryInput<'_>) -> Result<PageResult<S::Row>> {
    let page = input.page.normalize(input.default_page_size)?;

    let plan = PlanBuilder::new(input.schema, input.values)
        .join(input.join)
        .include_soft_deleted(input.include_soft_deleted)
        .build(input.model, input.output)?;

    let count = CountQuery {
        model: input.model,
        plan: &plan,
    };
    trace_sql(input.debug_trace, "count", &count.to_literal_sql());
    let total = storage.count(&count).map_err(QueryError::storage)?;

    let pagination = paginate(page, total, input.default_page_size)?;

    let facet_options = derive_facets(storage, input.schema, input.model)?;

    let select = PageQuery {
        model: input.model,
        plan: &plan,
        limit: pagination.page_size,
        offset: pagination.first_index,
    };
    trace_sql(input.debug_trace, "page", &select.to_literal_sql());
    let rows = storage.select_page(&select).map_err(QueryError::storage)?;

    debug!(
        total = pagination.total_data_count,
        pages = pagination.total_page_count,
        rows = rows.len(),
        "query completed"
    );

    Ok(PageResult {
        page_size: pagination.page_size,
        current_page: pagination.current_page,
        total_page_count: pagination.total_page_count,
        total_data_count: pagination.total_data_count,
        first_index: pagination.first_index,
        rows,
        facet_options,
    })
}
