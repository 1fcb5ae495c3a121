//! Doc comments of the config structs rendered as TOML comments.

use documented::{Documented, DocumentedFields};
use toml_edit::{ArrayOfTables, Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Prepends `docs` as `#` comment lines to the decor of a TOML item,
/// keeping any comment already there.
pub fn add_comments(decor: &mut Decor, docs: &str) {
    let existing = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default()
        .to_string();

    let comments: String = docs
        .lines()
        .map(|line| match line.trim_end() {
            "" => "#\n".to_string(),
            line => format!("# {line}\n"),
        })
        .collect();

    let prefix = match existing.lines().last() {
        None | Some("") => format!("{existing}{comments}"),
        Some(_) => format!("{existing}#\n{comments}"),
    };
    decor.set_prefix(prefix);
}

/// Annotates every key of `table` with the field docs of `T`.
///
/// Nested tables get the container docs of `T` on their header.
pub fn annotate_table<T>(table: &mut Table, nested: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if nested {
        add_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let name = key.get().to_string();
        let Ok(docs) = T::get_field_docs(&name) else {
            warn!(field = %name, "no documentation for config field");
            continue;
        };

        match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(name)),
            Item::Value(_) => add_comments(key.leaf_decor_mut(), docs),
            Item::Table(sub) => add_comments(sub.decor_mut(), docs),
            Item::ArrayOfTables(array) => {
                if let Some(first) = array.iter_mut().next() {
                    add_comments(first.decor_mut(), docs);
                }
            }
        }
    }

    Ok(())
}

/// Annotates the first table of an array of tables with the docs of `T`.
pub fn annotate_array<T>(array: &mut ArrayOfTables) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    match array.iter_mut().next() {
        Some(first) => annotate_table::<T>(first, false),
        None => Ok(()),
    }
}
