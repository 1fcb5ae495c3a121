//! [`Storage`] implementations over a SQLite connection.

use std::marker::PhantomData;

use diesel::{prelude::*, sql_types::Text, sqlite::Sqlite};
use folio_core::{
    CountQuery, DistinctQuery, OutputSchema, PageQuery, Storage,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    connection::DbConnection,
    error::{DbError, Result},
    sql::{self, bound_query},
};

/// Loads page rows into a typed struct.
///
/// The row type reads columns by their projected alias, so its field names
/// must match the output schema.
pub struct SqliteStore<'c, R> {
    conn: &'c mut DbConnection,
    _row: PhantomData<R>,
}

impl<'c, R> SqliteStore<'c, R> {
    pub fn new(conn: &'c mut DbConnection) -> Self {
        Self {
            conn,
            _row: PhantomData,
        }
    }
}

impl<R: QueryableByName<Sqlite> + 'static> Storage for SqliteStore<'_, R> {
    type Row = R;
    type Error = DbError;

    fn count(&mut self, query: &CountQuery<'_>) -> Result<i64> {
        sql::count(self.conn.conn(), query)
    }

    fn select_distinct(&mut self, query: &DistinctQuery<'_>) -> Result<Vec<String>> {
        sql::select_distinct(self.conn.conn(), query)
    }

    fn select_page(&mut self, query: &PageQuery<'_>) -> Result<Vec<R>> {
        let (sql, binds) = query.to_sql();
        Ok(bound_query(&sql, &binds).load::<R>(self.conn.conn())?)
    }
}

#[derive(Debug, QueryableByName)]
struct JsonRow {
    #[diesel(sql_type = Text)]
    row: String,
}

#[derive(Debug, QueryableByName)]
struct TableColumn {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Loads page rows as JSON objects keyed by output alias.
///
/// Rows are shaped by SQLite's `json_object`, so views declared at runtime
/// need no row struct. Without output fields every column of the base table
/// is returned.
pub struct JsonStore<'c> {
    conn: &'c mut DbConnection,
    columns: Vec<(String, String)>,
}

impl<'c> JsonStore<'c> {
    pub fn new(conn: &'c mut DbConnection, output: &OutputSchema) -> Self {
        let columns = output
            .fields()
            .iter()
            .filter_map(|field| {
                field
                    .column
                    .as_ref()
                    .map(|column| (field.alias.clone(), column.clone()))
            })
            .collect();

        Self { conn, columns }
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<(String, String)>> {
        let columns = diesel::sql_query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind::<Text, _>(table)
            .load::<TableColumn>(self.conn.conn())?;

        if columns.is_empty() {
            return Err(DbError::NoColumns(table.to_string()));
        }

        debug!(table, count = columns.len(), "discovered table columns");
        Ok(columns
            .into_iter()
            .map(|c| (c.name.clone(), format!("{table}.{}", c.name)))
            .collect())
    }

    fn projection(&mut self, table: &str) -> Result<String> {
        let columns = if self.columns.is_empty() {
            self.table_columns(table)?
        } else {
            self.columns.clone()
        };

        let pairs = columns
            .iter()
            .map(|(alias, column)| format!("'{alias}', {column}"))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("json_object({pairs}) AS row"))
    }
}

impl Storage for JsonStore<'_> {
    type Row = Value;
    type Error = DbError;

    fn count(&mut self, query: &CountQuery<'_>) -> Result<i64> {
        sql::count(self.conn.conn(), query)
    }

    fn select_distinct(&mut self, query: &DistinctQuery<'_>) -> Result<Vec<String>> {
        sql::select_distinct(self.conn.conn(), query)
    }

    fn select_page(&mut self, query: &PageQuery<'_>) -> Result<Vec<Value>> {
        let projection = self.projection(&query.model.table)?;
        let (sql, binds) = query.to_sql_with_projection(&projection);

        bound_query(&sql, &binds)
            .load::<JsonRow>(self.conn.conn())?
            .into_iter()
            .map(|row| serde_json::from_str(&row.row).map_err(DbError::from))
            .collect()
    }
}
