use folio_config::{config::Config, view::View};
use folio_core::{run_query, PageRequest, PageResult, QueryInput, RequestValues};
use folio_db::{DbConnection, DbError, JsonStore};
use nu_ansi_term::Color::{Blue, Cyan, Green, Magenta};
use serde_json::Value;
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::{debug, info};

use crate::{
    error::{CliError, CliResult},
    utils::{cell, term_width, Colored},
};

pub struct QueryOptions {
    pub page: i64,
    pub size: i64,
    pub filters: Vec<String>,
    pub include_deleted: bool,
    pub debug: bool,
    pub json: bool,
}

/// Parses `field=value` arguments into request values. A later value for
/// the same field wins.
pub fn parse_filters(filters: &[String]) -> CliResult<RequestValues> {
    filters
        .iter()
        .map(|filter| {
            filter
                .split_once('=')
                .filter(|(field, _)| !field.trim().is_empty())
                .map(|(field, value)| (field.trim().to_string(), value.to_string()))
                .ok_or_else(|| CliError::InvalidFilter(filter.clone()))
        })
        .collect()
}

pub fn query_view(config: &Config, name: &str, options: QueryOptions) -> CliResult<()> {
    let view = config.get_view(name)?;
    let values = parse_filters(&options.filters)?;

    let db_path = config.get_db_path()?;
    debug!("querying view {} in {}", view.name, db_path.display());
    let mut conn = DbConnection::open(&db_path).map_err(DbError::from)?;
    let mut store = JsonStore::new(&mut conn, &view.output);

    let input = QueryInput::new(&view.schema, &values, &view.output, &view.model)
        .with_page(PageRequest::new(options.page, options.size))
        .with_join(view.join.as_deref())
        .with_soft_deleted(options.include_deleted)
        .with_debug_trace(options.debug || config.get_debug_trace())
        .with_default_page_size(config.get_default_page_size());

    let result = run_query(&mut store, &input)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display_page(&view, &result);
    }

    Ok(())
}

fn columns(view: &View, rows: &[Value]) -> Vec<String> {
    let aliases = view.output.aliases();
    if !aliases.is_empty() {
        return aliases.into_iter().map(String::from).collect();
    }

    rows.first()
        .and_then(Value::as_object)
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

fn display_page(view: &View, result: &PageResult<Value>) {
    let columns = columns(view, &result.rows);

    if !result.rows.is_empty() {
        let mut builder = Builder::new();
        builder.push_record(columns.iter().map(|c| Colored(Cyan, c).to_string()));
        for row in &result.rows {
            builder.push_record(columns.iter().map(|c| cell(row.get(c))));
        }

        let table = builder
            .build()
            .with(Panel::header(view.name.as_str()))
            .with(Style::rounded())
            .with(BorderCorrection {})
            .with(Width::wrap(term_width()).priority(PriorityMax::default()))
            .to_string();

        info!("\n{table}");
    }

    info!(
        "Page {} of {} ({} rows, showing {} from #{})",
        Colored(Green, result.current_page),
        Colored(Green, result.total_page_count),
        Colored(Cyan, result.total_data_count),
        Colored(Blue, result.rows.len()),
        result.first_index + 1
    );

    if let Some(options) = &result.facet_options {
        for (column, values) in options {
            let values = values
                .iter()
                .map(|(value, label)| {
                    if value == label {
                        value.clone()
                    } else {
                        format!("{value} ({label})")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            info!("{}: {}", Colored(Magenta, column), values);
        }
    }
}

pub fn list_views(config: &Config, json: bool) -> CliResult<()> {
    if json {
        let views = config
            .views
            .iter()
            .map(|view| {
                serde_json::json!({
                    "name": view.name,
                    "table": view.table,
                    "filters": view.filters.iter().map(|f| &f.name).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if config.views.is_empty() {
        info!("No views configured");
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["View", "Table", "Filters"].map(|h| Colored(Cyan, h).to_string()));
    for view in &config.views {
        builder.push_record([
            Colored(Green, &view.name).to_string(),
            view.table.clone(),
            view.filters
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ]);
    }

    let table = builder
        .build()
        .with(Panel::header("Views"))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .with(Width::wrap(term_width()).priority(PriorityMax::default()))
        .to_string();

    info!("\n{table}");
    Ok(())
}
