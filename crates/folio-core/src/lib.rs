//! Declarative query derivation.
//!
//! A [`FilterSchema`] declares which columns of a [`BaseModel`] can be
//! filtered, sorted, grouped and faceted. Given per-request values and a
//! [`PageRequest`], [`run_query`] derives the WHERE/ORDER BY/GROUP BY
//! clauses, counts the matching rows, and loads one page through a
//! [`Storage`] implementation.

pub mod builder;
pub mod error;
pub mod facet;
pub mod format;
pub mod page;
pub mod plan;
pub mod query;
pub mod schema;
pub mod storage;
pub mod template;

pub use builder::{PlanBuilder, SortMode};
pub use error::{QueryError, Result};
pub use facet::FacetOptions;
pub use format::{BindValue, MatchKind};
pub use page::{PageRequest, Pagination, DEFAULT_PAGE_SIZE};
pub use plan::QueryPlan;
pub use query::{run_query, PageResult, QueryInput};
pub use schema::{BaseModel, FieldDescriptor, FilterSchema, OutputField, OutputSchema, RequestValues};
pub use storage::{CountQuery, DistinctQuery, PageQuery, Storage};
