//! Facet options for filter widgets.
//!
//! Every field declaring a label mapping gets the distinct values of its
//! column across the whole base model, not just the filtered view, mapped to
//! their labels.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    error::{QueryError, Result},
    schema::{BaseModel, FilterSchema},
    storage::{DistinctQuery, Storage},
};

/// Column name to (raw value to label).
pub type FacetOptions = BTreeMap<String, BTreeMap<String, String>>;

/// Derives the facet options of a schema.
///
/// Returns `None` when no field declares facet options, so callers can hide
/// the control entirely. A declared field without values maps to an empty
/// inner map. A facet on a column outside `model` is a
/// [`QueryError::MalformedTag`] and issues no query.
pub fn derive_facets<S: Storage>(
    storage: &mut S,
    schema: &FilterSchema,
    model: &BaseModel,
) -> Result<Option<FacetOptions>> {
    schema.check_facets(model)?;

    let mut options = FacetOptions::new();

    for field in schema.fields() {
        let Some(labels) = &field.labels else {
            continue;
        };

        let query = DistinctQuery {
            model,
            column: &field.column,
        };
        let values = storage
            .select_distinct(&query)
            .map_err(QueryError::storage)?;

        let mapped = values
            .into_iter()
            .filter(|value| !value.is_empty())
            .map(|value| {
                let label = labels.get(&value).cloned().unwrap_or_else(|| value.clone());
                (value, label)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(column = %field.column, count = mapped.len(), "facet options");
        options.insert(field.column.clone(), mapped);
    }

    Ok((!options.is_empty()).then_some(options))
}
