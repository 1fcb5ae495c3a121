use std::collections::BTreeMap;

use documented::{Documented, DocumentedFields};
use folio_core::{
    BaseModel, FieldDescriptor, FilterSchema, MatchKind, OutputField, OutputSchema, QueryError,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A queryable view over one table.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Documented, DocumentedFields)]
pub struct ViewConfig {
    /// Unique name of the view, used on the command line.
    pub name: String,

    /// Table the view queries.
    pub table: String,

    /// Column marking soft-deleted rows. Rows where it is not NULL are
    /// hidden unless deleted rows are requested.
    pub soft_delete_column: Option<String>,

    /// SQL join clause appended after the table, e.g.
    /// "left join teams on teams.id = users.team_id"
    pub join: Option<String>,

    /// Filterable, sortable and groupable fields, in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterConfig>,

    /// Output columns. All columns of the table are returned when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnConfig>,
}

/// One field of a view's filter schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FilterConfig {
    pub name: String,
    pub db_name: Option<String>,
    pub kind: Option<String>,
    pub rule: Option<String>,
    pub default: Option<String>,
    pub sequence: Option<i64>,
    pub orderby: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub groupby: bool,
    pub options: Option<FacetLabels>,
}

/// Facet labels, either as a `value:label,...` tag or as a table.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FacetLabels {
    Tag(String),
    Table(BTreeMap<String, String>),
}

/// One output column of a view. A `db_name` of `-` hides the column.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    pub db_name: Option<String>,
}

/// A view compiled into query schemas.
#[derive(Clone, Debug)]
pub struct View {
    pub name: String,
    pub model: BaseModel,
    pub schema: FilterSchema,
    pub output: OutputSchema,
    pub join: Option<String>,
}

impl FilterConfig {
    pub fn to_descriptor(&self) -> std::result::Result<FieldDescriptor, QueryError> {
        let kind = self
            .kind
            .as_deref()
            .map(MatchKind::from_tag)
            .unwrap_or_default();
        let mut field = FieldDescriptor::new(&self.name).with_kind(kind);

        if let Some(column) = &self.db_name {
            field = field.with_column(column.trim());
        }
        if let Some(rule) = &self.rule {
            field = field.with_rule(rule);
        }
        if let Some(default) = &self.default {
            field = field.with_default(default);
        }
        if let Some(sequence) = self.sequence {
            field = field.with_sequence(sequence);
        }
        if let Some(order_by) = self.orderby {
            field = field.with_order_by(order_by);
        }
        if self.groupby {
            field = field.with_group_by();
        }

        match &self.options {
            Some(FacetLabels::Tag(tag)) => field.with_options_tag(tag),
            Some(FacetLabels::Table(labels)) => Ok(field.with_labels(labels.clone())),
            None => Ok(field),
        }
    }
}

impl ColumnConfig {
    pub fn to_output_field(&self) -> OutputField {
        let field = OutputField::new(&self.name);
        match &self.db_name {
            Some(column) => field.with_column(column),
            None => field,
        }
    }
}

impl ViewConfig {
    /// Validates the view and builds its schemas.
    pub fn compile(&self) -> Result<View> {
        self.try_compile().map_err(|source| ConfigError::InvalidView {
            view: self.name.clone(),
            source,
        })
    }

    fn try_compile(&self) -> std::result::Result<View, QueryError> {
        let mut model = BaseModel::new(self.table.trim())?;
        if let Some(column) = self.soft_delete_column.as_deref().filter(|c| !c.trim().is_empty()) {
            model = model.with_soft_delete(column.trim())?;
        }

        let schema = FilterSchema::new(
            self.filters
                .iter()
                .map(FilterConfig::to_descriptor)
                .collect::<std::result::Result<_, _>>()?,
        )?;
        schema.check_facets(&model)?;

        let output = OutputSchema::new(
            self.columns
                .iter()
                .map(ColumnConfig::to_output_field)
                .collect(),
        )?;

        Ok(View {
            name: self.name.clone(),
            model,
            schema,
            output,
            join: self.join.clone().filter(|j| !j.trim().is_empty()),
        })
    }
}
