//! The storage collaborator.
//!
//! The core never talks to a database directly. It renders the three queries
//! it needs ([`CountQuery`], [`DistinctQuery`], [`PageQuery`]) and hands them
//! to a [`Storage`] implementation, which executes them with its bound
//! values.
//!
//! Count and page queries are both rendered from the same [`QueryPlan`], so
//! their WHERE, GROUP BY and JOIN parts cannot drift apart.

use crate::{
    format::BindValue,
    plan::QueryPlan,
    schema::BaseModel,
};

/// Executes rendered queries against a relational store.
pub trait Storage {
    /// Row type produced by [`Storage::select_page`].
    type Row;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Counts the rows matched by the query.
    fn count(&mut self, query: &CountQuery<'_>) -> Result<i64, Self::Error>;

    /// Lists the distinct values of a column, as text.
    fn select_distinct(&mut self, query: &DistinctQuery<'_>) -> Result<Vec<String>, Self::Error>;

    /// Loads one page of rows.
    fn select_page(&mut self, query: &PageQuery<'_>) -> Result<Vec<Self::Row>, Self::Error>;
}

fn push_from(sql: &mut String, model: &BaseModel, plan: &QueryPlan, where_clause: &str) {
    sql.push_str(" FROM ");
    sql.push_str(&model.table);

    if let Some(join) = plan.join() {
        sql.push(' ');
        sql.push_str(join);
    }

    sql.push_str(" WHERE ");
    sql.push_str(where_clause);

    let group = plan.group_clause();
    if !group.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group);
    }
}

/// Counts the rows of the filtered, grouped query.
///
/// The filtered query is wrapped as a derived table, so grouped rows are
/// counted after grouping.
#[derive(Debug, Clone, Copy)]
pub struct CountQuery<'a> {
    pub model: &'a BaseModel,
    pub plan: &'a QueryPlan,
}

impl CountQuery<'_> {
    fn render(&self, where_clause: &str) -> String {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM (SELECT 1");
        push_from(&mut sql, self.model, self.plan, where_clause);
        sql.push_str(") AS counts");
        sql
    }

    /// SQL with `?` placeholders and the values to bind.
    pub fn to_sql(&self) -> (String, Vec<BindValue>) {
        (self.render(&self.plan.where_clause()), self.plan.binds())
    }

    /// SQL with values embedded literally, for tracing.
    pub fn to_literal_sql(&self) -> String {
        self.render(&self.plan.where_literal())
    }
}

/// Lists distinct non-null values of one column of the base model.
#[derive(Debug, Clone, Copy)]
pub struct DistinctQuery<'a> {
    pub model: &'a BaseModel,
    pub column: &'a str,
}

impl DistinctQuery<'_> {
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "SELECT DISTINCT CAST({column} AS TEXT) AS value FROM {table}",
            column = self.column,
            table = self.model.table
        );
        if let Some(condition) = self.model.soft_delete_condition() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        sql
    }
}

/// Loads one page of the filtered, grouped, ordered query.
#[derive(Debug, Clone, Copy)]
pub struct PageQuery<'a> {
    pub model: &'a BaseModel,
    pub plan: &'a QueryPlan,
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery<'_> {
    fn render(&self, projection: &str, where_clause: &str) -> String {
        let mut sql = format!("SELECT {projection}");
        push_from(&mut sql, self.model, self.plan, where_clause);

        let order = self.plan.order_clause();
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        sql.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset));
        sql
    }

    /// SQL with `?` placeholders and the values to bind.
    pub fn to_sql(&self) -> (String, Vec<BindValue>) {
        self.to_sql_with_projection(&self.plan.projection_clause())
    }

    /// Same as [`Self::to_sql`] with a custom projection, for stores that
    /// shape rows themselves.
    pub fn to_sql_with_projection(&self, projection: &str) -> (String, Vec<BindValue>) {
        (
            self.render(projection, &self.plan.where_clause()),
            self.plan.binds(),
        )
    }

    /// SQL with values embedded literally, for tracing.
    pub fn to_literal_sql(&self) -> String {
        self.render(&self.plan.projection_clause(), &self.plan.where_literal())
    }
}
