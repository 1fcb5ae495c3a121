//! The query plan.
//!
//! [`QueryPlan`] accumulates the WHERE conditions, ORDER BY and GROUP BY
//! columns, projection and join of one request. It is an immutable builder:
//! every `with_*` method consumes the plan and returns the extended one.

use std::fmt;

use crate::{format::BindValue, template::Expanded};

/// Leading tautology of every WHERE clause.
pub const WHERE_PREFIX: &str = "1=1";

/// A single WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub sql: String,
    pub literal: String,
    pub binds: Vec<BindValue>,
}

impl Condition {
    /// A condition without bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            literal: sql.clone(),
            sql,
            binds: vec![],
        }
    }
}

impl From<Expanded> for Condition {
    fn from(expanded: Expanded) -> Self {
        Self {
            sql: expanded.sql,
            literal: expanded.literal,
            binds: expanded.binds,
        }
    }
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub desc: bool,
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.column,
            if self.desc { "desc" } else { "asc" }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    conditions: Vec<Condition>,
    orders: Vec<OrderClause>,
    groups: Vec<String>,
    projection: Vec<String>,
    join: Option<String>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn with_order(mut self, order: OrderClause) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_group(mut self, column: impl Into<String>) -> Self {
        self.groups.push(column.into());
        self
    }

    pub fn with_projection(mut self, projection: Vec<String>) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_join(mut self, join: Option<impl Into<String>>) -> Self {
        self.join = join.map(Into::into).filter(|j: &String| !j.trim().is_empty());
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    pub fn join(&self) -> Option<&str> {
        self.join.as_deref()
    }

    /// WHERE clause with bind placeholders.
    pub fn where_clause(&self) -> String {
        self.conditions
            .iter()
            .fold(WHERE_PREFIX.to_string(), |mut acc, c| {
                acc.push_str(" and ");
                acc.push_str(&c.sql);
                acc
            })
    }

    /// WHERE clause with values embedded literally.
    pub fn where_literal(&self) -> String {
        self.conditions
            .iter()
            .fold(WHERE_PREFIX.to_string(), |mut acc, c| {
                acc.push_str(" and ");
                acc.push_str(&c.literal);
                acc
            })
    }

    /// Values bound by [`Self::where_clause`], in placeholder order.
    pub fn binds(&self) -> Vec<BindValue> {
        self.conditions
            .iter()
            .flat_map(|c| c.binds.iter().cloned())
            .collect()
    }

    /// ORDER BY clause, empty when nothing sorts.
    pub fn order_clause(&self) -> String {
        self.orders
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// GROUP BY clause, empty when nothing groups.
    pub fn group_clause(&self) -> String {
        self.groups.join(",")
    }

    /// Projection clause, `*` when the output shape projects nothing.
    pub fn projection_clause(&self) -> String {
        if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection.join(",")
        }
    }
}
