//! Placeholder substitution for condition templates.
//!
//! A template is a short SQL condition such as `{column} like ?`. Each `?`
//! is a positional marker consumed left to right by the supplied values, and
//! every `{column}` token is replaced by the field's column name.

use crate::{
    error::{QueryError, Result},
    format::{BindValue, FormattedValue},
};

/// Positional value marker.
pub const MARKER: char = '?';

/// Token replaced by the column name.
pub const COLUMN_TOKEN: &str = "{column}";

/// A template expanded with its values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expanded {
    /// SQL with bind placeholders.
    pub sql: String,
    /// The same condition with values embedded literally.
    pub literal: String,
    pub binds: Vec<BindValue>,
}

/// Counts the value markers in a template.
pub fn marker_count(template: &str) -> usize {
    template.chars().filter(|c| *c == MARKER).count()
}

/// Substitutes `values` into the markers of `template`, left to right.
///
/// Fails with [`QueryError::TemplateMismatch`] when the number of markers and
/// the number of values differ.
pub fn substitute(template: &str, column: &str, values: &[FormattedValue]) -> Result<Expanded> {
    let markers = marker_count(template);
    if markers != values.len() {
        return Err(QueryError::TemplateMismatch {
            markers,
            values: values.len(),
        });
    }

    let template = template.replace(COLUMN_TOKEN, column);
    let mut expanded = Expanded::default();
    let mut values = values.iter();

    for c in template.chars() {
        if c == MARKER {
            if let Some(value) = values.next() {
                expanded.sql.push_str(&value.to_sql(&mut expanded.binds));
                expanded.literal.push_str(&value.literal());
            }
        } else {
            expanded.sql.push(c);
            expanded.literal.push(c);
        }
    }

    Ok(expanded)
}
