//! Filter and output schemas.
//!
//! A [`FilterSchema`] is the ordered list of [`FieldDescriptor`]s that
//! describes which columns can be searched, sorted, grouped and faceted. It
//! is validated once when it is built, so a malformed declaration fails at
//! startup instead of in the middle of a request.
//!
//! An [`OutputSchema`] describes the shape of the returned rows and drives
//! the projection of the page query.

use std::collections::{BTreeMap, HashMap, HashSet};

use folio_utils::string::{camel_to_snake, is_identifier, lower_first};

use crate::{
    error::{QueryError, Result},
    format::MatchKind,
    template::{marker_count, MARKER},
};

/// Request values keyed by logical field name.
pub type RequestValues = HashMap<String, String>;

/// Request value that means "no value supplied".
pub const NULL_SENTINEL: &str = "NULL";

/// Column marker that excludes an output field from the projection.
pub const EXCLUDE_COLUMN: &str = "-";

/// One queryable field of a filter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Logical name, the key looked up in [`RequestValues`].
    pub name: String,
    /// Column the field resolves to.
    pub column: String,
    pub kind: MatchKind,
    /// Condition template with a single `?` marker.
    pub rule: Option<String>,
    /// Value used when the request supplies none.
    pub default_value: Option<String>,
    /// Declared sort sequence.
    pub sequence: Option<i64>,
    /// Declared sort value; `<= 0` sorts ascending, `> 0` descending.
    pub order_by: Option<i64>,
    pub group_by: bool,
    /// Facet label mapping, raw value to display label.
    pub labels: Option<BTreeMap<String, String>>,
}

impl FieldDescriptor {
    /// Creates a field from a struct-style name.
    ///
    /// The logical name has its first character lowercased (`CreatedAt` becomes
    /// `createdAt`) and the column defaults to the snake_case form
    /// (`created_at`).
    pub fn new(name: &str) -> Self {
        Self {
            name: lower_first(name.trim()),
            column: camel_to_snake(name.trim()),
            kind: MatchKind::default(),
            rule: None,
            default_value: None,
            sequence: None,
            order_by: None,
            group_by: false,
            labels: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn with_kind(mut self, kind: MatchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_order_by(mut self, order_by: i64) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_group_by(mut self) -> Self {
        self.group_by = true;
        self
    }

    /// Declares facet options with the given labels.
    pub fn with_labels<K, V, I>(mut self, labels: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.labels = Some(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Declares facet options from a tag such as `1:Active,0:Disabled`.
    ///
    /// The tag `-` declares a facet without labels.
    pub fn with_options_tag(mut self, tag: &str) -> Result<Self> {
        self.labels = Some(parse_labels(&self.name, tag)?);
        Ok(self)
    }

    fn normalize(mut self) -> Result<Self> {
        if self.name.is_empty() {
            return Err(QueryError::malformed("<unnamed>", "field name is empty"));
        }

        if !is_identifier(&self.column) {
            return Err(QueryError::malformed(
                &self.name,
                format!("`{}` is not a valid column name", self.column),
            ));
        }

        self.rule = match self.rule.take() {
            Some(rule) => {
                let rule = strip_connective(&rule);
                if rule.is_empty() {
                    None
                } else if marker_count(rule) != 1 {
                    return Err(QueryError::malformed(
                        &self.name,
                        format!(
                            "condition template `{rule}` for kind `{}` must contain exactly one `{MARKER}` marker",
                            self.kind
                        ),
                    ));
                } else {
                    check_kind(self.kind, rule).map_err(|reason| {
                        QueryError::malformed(
                            &self.name,
                            format!("condition template `{rule}` for kind `{}` {reason}", self.kind),
                        )
                    })?;
                    Some(rule.to_string())
                }
            }
            None => None,
        };

        self.default_value = self.default_value.filter(|v| !v.is_empty());

        Ok(self)
    }
}

/// Checks that the text around the marker fits the value `kind` renders.
fn check_kind(kind: MatchKind, rule: &str) -> std::result::Result<(), &'static str> {
    let Some((before, after)) = rule.split_once(MARKER) else {
        return Ok(());
    };
    let before = before.trim_end().to_ascii_lowercase();

    match kind {
        MatchKind::SetMembership => {
            let opens_in = before
                .strip_suffix('(')
                .map(|head| {
                    let head = head.trim_end();
                    head == "in" || head.ends_with(" in")
                })
                .unwrap_or(false);
            if opens_in && after.trim_start().starts_with(')') {
                Ok(())
            } else {
                Err("must place the marker inside `in (...)`")
            }
        }
        MatchKind::IsNull => {
            let last_word = before.rsplit(char::is_whitespace).next().unwrap_or_default();
            if before.ends_with(['=', '<', '>', '(', ','])
                || matches!(last_word, "is" | "not" | "like" | "in" | "glob")
            {
                Err("must not put an operator before the marker")
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Removes a leading `and` connective; the builder supplies its own.
fn strip_connective(rule: &str) -> &str {
    let rule = rule.trim();
    match rule.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("and ") => rule[4..].trim_start(),
        _ => rule,
    }
}

/// Parses a facet label tag of the form `value:label,value:label`.
pub fn parse_labels(field: &str, tag: &str) -> Result<BTreeMap<String, String>> {
    let tag = tag.trim();
    if tag == EXCLUDE_COLUMN || tag.is_empty() {
        return Ok(BTreeMap::new());
    }

    tag.split(',')
        .map(|pair| {
            pair.split_once(':')
                .map(|(value, label)| (value.trim().to_string(), label.trim().to_string()))
                .ok_or_else(|| {
                    QueryError::malformed(
                        field,
                        format!("facet option `{pair}` is not of the form value:label"),
                    )
                })
        })
        .collect()
}

/// A validated, ordered list of field descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSchema {
    fields: Vec<FieldDescriptor>,
}

impl FilterSchema {
    /// Validates the descriptors and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedTag`] for empty or duplicate names,
    /// invalid column names, condition templates without exactly one
    /// marker, and templates that do not fit the field's match kind.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(fields.len());

        for field in fields {
            let field = field.normalize()?;
            if !seen.insert(field.name.clone()) {
                return Err(QueryError::malformed(&field.name, "declared more than once"));
            }
            normalized.push(field);
        }

        Ok(Self { fields: normalized })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Checks that every faceted column can be read from `model` alone.
    ///
    /// Facet values are selected from the base table without the join, so a
    /// facet on a column qualified with another table is rejected.
    pub fn check_facets(&self, model: &BaseModel) -> Result<()> {
        for field in self.fields.iter().filter(|f| f.labels.is_some()) {
            match field.column.split_once('.') {
                Some((table, _)) if table != model.table => {
                    return Err(QueryError::malformed(
                        &field.name,
                        format!(
                            "facet column `{}` is not a column of `{}`",
                            field.column, model.table
                        ),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// One field of the returned row shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputField {
    /// Name of the field in the returned rows.
    pub alias: String,
    /// Source column, `None` when excluded from the projection.
    pub column: Option<String>,
}

impl OutputField {
    /// Creates an output field whose alias and column are the snake_case
    /// form of `name`.
    pub fn new(name: &str) -> Self {
        let alias = camel_to_snake(name.trim());
        Self {
            column: Some(alias.clone()),
            alias,
        }
    }

    /// Sets the source column; `-` excludes the field.
    pub fn with_column(mut self, column: &str) -> Self {
        self.column = if column.trim() == EXCLUDE_COLUMN {
            None
        } else {
            Some(column.trim().to_string())
        };
        self
    }

    pub fn excluded(mut self) -> Self {
        self.column = None;
        self
    }

    /// Renders the projection entry, `None` for excluded fields.
    pub fn projection(&self) -> Option<String> {
        self.column.as_ref().map(|column| {
            if *column == self.alias {
                column.clone()
            } else {
                format!("{column} as {}", self.alias)
            }
        })
    }
}

/// The shape of the returned rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    fields: Vec<OutputField>,
}

impl OutputSchema {
    /// Validates and builds an output schema.
    ///
    /// Aliases must be plain identifiers. Source columns may be expressions
    /// (`count(*)`) but cannot contain statement separators or comments.
    pub fn new(fields: Vec<OutputField>) -> Result<Self> {
        for field in &fields {
            if !is_identifier(&field.alias) || field.alias.contains('.') {
                return Err(QueryError::malformed(
                    &field.alias,
                    "output name is not a valid alias",
                ));
            }
            if let Some(column) = &field.column {
                if column.is_empty() || column.contains(';') || column.contains("--") {
                    return Err(QueryError::malformed(
                        &field.alias,
                        format!("`{column}` is not a valid source column"),
                    ));
                }
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    /// Projection entries in declaration order, excluded fields omitted.
    pub fn projection(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(OutputField::projection)
            .collect()
    }

    /// Aliases of the projected fields, excluded fields omitted.
    pub fn aliases(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.column.is_some())
            .map(|f| f.alias.as_str())
            .collect()
    }
}

/// The table a query runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseModel {
    pub table: String,
    /// Column flagging logically deleted rows.
    pub soft_delete_column: Option<String>,
}

impl BaseModel {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) || table.contains('.') {
            return Err(QueryError::malformed(&table, "not a valid table name"));
        }
        Ok(Self {
            table,
            soft_delete_column: None,
        })
    }

    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        if !is_identifier(&column) {
            return Err(QueryError::malformed(
                &self.table,
                format!("`{column}` is not a valid soft-delete column"),
            ));
        }
        self.soft_delete_column = Some(column);
        Ok(self)
    }

    /// Condition excluding soft-deleted rows, if the model has a soft-delete
    /// column.
    pub fn soft_delete_condition(&self) -> Option<String> {
        self.soft_delete_column.as_ref().map(|column| {
            if column.contains('.') {
                format!("{column} IS NULL")
            } else {
                format!("{}.{column} IS NULL", self.table)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_descriptor_defaults() {
        let field = FieldDescriptor::new("CreatedAt");
        assert_eq!(field.name, "createdAt");
        assert_eq!(field.column, "created_at");
        assert_eq!(field.kind, MatchKind::Fallback);
        assert!(field.rule.is_none());
        assert!(!field.group_by);
    }

    #[test]
    fn test_schema_strips_leading_connective() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("status").with_rule("and status = ?"),
            FieldDescriptor::new("name").with_rule("AND {column} like ?"),
            FieldDescriptor::new("age").with_rule("age > ?"),
            FieldDescriptor::new("android").with_rule("android = ?"),
        ])
        .unwrap();

        assert_eq!(schema.fields()[0].rule.as_deref(), Some("status = ?"));
        assert_eq!(schema.fields()[1].rule.as_deref(), Some("{column} like ?"));
        assert_eq!(schema.fields()[2].rule.as_deref(), Some("age > ?"));
        assert_eq!(schema.fields()[3].rule.as_deref(), Some("android = ?"));
    }

    #[test]
    fn test_schema_rejects_bad_templates() {
        let err = FilterSchema::new(vec![FieldDescriptor::new("age").with_rule("age between ? and ?")])
            .unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { ref field, .. } if field == "age"));

        let err = FilterSchema::new(vec![FieldDescriptor::new("age").with_rule("age > 1")])
            .unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { .. }));
    }

    #[test]
    fn test_schema_checks_template_against_kind() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("role")
                .with_kind(MatchKind::SetMembership)
                .with_rule("{column} in (?)"),
            FieldDescriptor::new("team")
                .with_kind(MatchKind::SetMembership)
                .with_rule("team_id not IN ( ? )"),
            FieldDescriptor::new("deletedAt")
                .with_kind(MatchKind::IsNull)
                .with_rule("{column} ?"),
        ]);
        assert!(schema.is_ok());

        for (kind, rule) in [
            (MatchKind::SetMembership, "{column} = ?"),
            (MatchKind::SetMembership, "{column} in ?"),
            (MatchKind::SetMembership, "{column} in (?, 1)"),
            (MatchKind::IsNull, "{column} = ?"),
            (MatchKind::IsNull, "{column} is ?"),
            (MatchKind::IsNull, "{column} like ?"),
        ] {
            let err = FilterSchema::new(vec![FieldDescriptor::new("x")
                .with_kind(kind)
                .with_rule(rule)])
            .unwrap_err();
            assert!(
                matches!(err, QueryError::MalformedTag { ref field, .. } if field == "x"),
                "{rule} accepted for {kind}"
            );
        }
    }

    #[test]
    fn test_schema_rejects_bad_columns_and_duplicates() {
        let err = FilterSchema::new(vec![
            FieldDescriptor::new("name").with_column("name; drop table users")
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { .. }));

        let err = FilterSchema::new(vec![
            FieldDescriptor::new("name"),
            FieldDescriptor::new("Name"),
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { ref reason, .. } if reason.contains("more than once")));

        let err = FilterSchema::new(vec![FieldDescriptor::new("  ")]).unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { .. }));
    }

    #[test]
    fn test_schema_drops_empty_rule_and_default() {
        let schema = FilterSchema::new(vec![FieldDescriptor::new("status")
            .with_rule("  ")
            .with_default("")])
        .unwrap();

        assert!(schema.fields()[0].rule.is_none());
        assert!(schema.fields()[0].default_value.is_none());
    }

    #[test]
    fn test_check_facets() {
        let users = BaseModel::new("users").unwrap();

        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("status").with_options_tag("-").unwrap(),
            FieldDescriptor::new("role")
                .with_column("users.role")
                .with_options_tag("-")
                .unwrap(),
            FieldDescriptor::new("teamName").with_column("teams.name"),
        ])
        .unwrap();
        assert!(schema.check_facets(&users).is_ok());

        let schema = FilterSchema::new(vec![FieldDescriptor::new("teamName")
            .with_column("teams.name")
            .with_options_tag("-")
            .unwrap()])
        .unwrap();
        let err = schema.check_facets(&users).unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { ref field, .. } if field == "teamName"));
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("status", "1:Active, 0:Disabled").unwrap();
        assert_eq!(labels.get("1").map(String::as_str), Some("Active"));
        assert_eq!(labels.get("0").map(String::as_str), Some("Disabled"));

        assert!(parse_labels("status", "-").unwrap().is_empty());

        let err = parse_labels("status", "1:Active,broken").unwrap_err();
        assert!(matches!(err, QueryError::MalformedTag { ref field, .. } if field == "status"));
    }

    #[test]
    fn test_output_field_projection() {
        assert_eq!(
            OutputField::new("status").projection().as_deref(),
            Some("status")
        );
        assert_eq!(
            OutputField::new("UserName")
                .with_column("users.name")
                .projection()
                .as_deref(),
            Some("users.name as user_name")
        );
        assert!(OutputField::new("password")
            .with_column("-")
            .projection()
            .is_none());
    }

    #[test]
    fn test_output_schema_projection_skips_excluded() {
        let schema = OutputSchema::new(vec![
            OutputField::new("id"),
            OutputField::new("secret").excluded(),
            OutputField::new("teamName").with_column("teams.name"),
        ])
        .unwrap();

        assert_eq!(schema.projection(), vec!["id", "teams.name as team_name"]);
        assert_eq!(schema.aliases(), vec!["id", "team_name"]);
    }

    #[test]
    fn test_output_schema_validation() {
        assert!(OutputSchema::new(vec![OutputField::new("total").with_column("count(*)")]).is_ok());
        assert!(OutputSchema::new(vec![OutputField::new("x").with_column("1; delete from t")]).is_err());
        assert!(OutputSchema::new(vec![OutputField::new("a.b")]).is_err());
    }

    #[test]
    fn test_base_model_soft_delete() {
        let model = BaseModel::new("users").unwrap();
        assert!(model.soft_delete_condition().is_none());

        let model = model.with_soft_delete("deleted_at").unwrap();
        assert_eq!(
            model.soft_delete_condition().as_deref(),
            Some("users.deleted_at IS NULL")
        );

        assert!(BaseModel::new("users; --").is_err());
        assert!(BaseModel::new("users")
            .unwrap()
            .with_soft_delete("deleted at")
            .is_err());
    }
}
