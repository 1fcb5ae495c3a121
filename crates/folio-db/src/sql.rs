//! Execution of rendered queries with their bound values.

use diesel::{
    prelude::*,
    query_builder::{BoxedSqlQuery, SqlQuery},
    sql_query,
    sql_types::{BigInt, Double, Nullable, Text},
    sqlite::Sqlite,
};
use folio_core::{BindValue, CountQuery, DistinctQuery};
use tracing::trace;

use crate::error::Result;

#[derive(Debug, QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(Debug, QueryableByName)]
struct DistinctValue {
    #[diesel(sql_type = Nullable<Text>)]
    value: Option<String>,
}

/// Builds a raw query with every value bound to its placeholder, in order.
pub fn bound_query<'f>(sql: &str, binds: &[BindValue]) -> BoxedSqlQuery<'f, Sqlite, SqlQuery> {
    trace!(sql, binds = binds.len(), "binding query");

    binds
        .iter()
        .fold(sql_query(sql).into_boxed(), |query, bind| match bind {
            BindValue::Text(v) => query.bind::<Text, _>(v.clone()),
            BindValue::Integer(v) => query.bind::<BigInt, _>(*v),
            BindValue::Real(v) => query.bind::<Double, _>(*v),
        })
}

pub fn count(conn: &mut SqliteConnection, query: &CountQuery<'_>) -> Result<i64> {
    let (sql, binds) = query.to_sql();
    let row = bound_query(&sql, &binds).get_result::<CountRow>(conn)?;
    Ok(row.count)
}

pub fn select_distinct(
    conn: &mut SqliteConnection,
    query: &DistinctQuery<'_>,
) -> Result<Vec<String>> {
    let rows = sql_query(query.to_sql()).load::<DistinctValue>(conn)?;
    Ok(rows.into_iter().filter_map(|row| row.value).collect())
}
