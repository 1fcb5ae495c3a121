//! Derivation of a [`QueryPlan`] from a filter schema and request values.
//!
//! Fields are walked in declaration order. For every field:
//!
//! 1. a group-by field appends its column to GROUP BY;
//! 2. a field with an order value contributes to ORDER BY according to the
//!    request's [`SortMode`];
//! 3. a field with a condition template and an effective value (request
//!    value, else declared default) contributes a WHERE condition.
//!
//! Sorting and grouping do not depend on whether the field filters.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{
    error::Result,
    format::format,
    plan::{Condition, OrderClause, QueryPlan},
    schema::{BaseModel, FieldDescriptor, FilterSchema, OutputSchema, RequestValues, NULL_SENTINEL},
    template::substitute,
};

/// How ORDER BY entries are resolved for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Every field with an order value sorts, in declaration order.
    Declaration,
    /// Only fields whose sequence number was supplied by the request sort,
    /// in ascending sequence order. Sequence numbers below zero and numbers
    /// without an orderable field are dropped.
    Sequence,
}

/// Builds the [`QueryPlan`] of one request.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'a> {
    schema: &'a FilterSchema,
    values: &'a RequestValues,
    join: Option<&'a str>,
    include_soft_deleted: bool,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(schema: &'a FilterSchema, values: &'a RequestValues) -> Self {
        Self {
            schema,
            values,
            join: None,
            include_soft_deleted: false,
        }
    }

    /// Overrides the join clause of the count and page queries.
    pub fn join(mut self, join: Option<&'a str>) -> Self {
        self.join = join;
        self
    }

    pub fn include_soft_deleted(mut self, include: bool) -> Self {
        self.include_soft_deleted = include;
        self
    }

    /// Sequence mode applies iff any field declaring a sequence receives a
    /// request value.
    pub fn sort_mode(&self) -> SortMode {
        let sequenced = self
            .schema
            .fields()
            .iter()
            .any(|field| field.sequence.is_some() && request_value(self.values, field).is_some());

        if sequenced {
            SortMode::Sequence
        } else {
            SortMode::Declaration
        }
    }

    pub fn build(&self, model: &BaseModel, output: &OutputSchema) -> Result<QueryPlan> {
        let mode = self.sort_mode();
        let mut plan = QueryPlan::new().with_join(self.join);
        let mut sequenced = BTreeMap::new();

        for field in self.schema.fields() {
            let raw = request_value(self.values, field);

            if field.group_by {
                plan = plan.with_group(&field.column);
            }

            if let Some(order_by) = field.order_by {
                let order = OrderClause {
                    column: field.column.clone(),
                    desc: raw.map_or(order_by, parse_sort_value) > 0,
                };

                match mode {
                    SortMode::Declaration => plan = plan.with_order(order),
                    SortMode::Sequence => match field.sequence.and(raw) {
                        Some(seq) => {
                            sequenced.insert(parse_sort_value(seq), order);
                        }
                        None => trace!(field = %field.name, "no sequence supplied, not sorted"),
                    },
                }
            } else if mode == SortMode::Sequence && field.sequence.is_some() && raw.is_some() {
                trace!(field = %field.name, "sequence supplied for a field without order value, dropped");
            }

            let Some(value) = filter_value(self.values, field) else {
                continue;
            };
            let Some(rule) = field.rule.as_deref() else {
                continue;
            };

            let expanded = substitute(rule, &field.column, &[format(field.kind, value)])?;
            trace!(field = %field.name, condition = %expanded.literal, "filter condition");
            plan = plan.with_condition(expanded);
        }

        for (_, order) in sequenced.into_iter().filter(|(seq, _)| *seq >= 0) {
            plan = plan.with_order(order);
        }

        if !self.include_soft_deleted {
            if let Some(condition) = model.soft_delete_condition() {
                plan = plan.with_condition(Condition::raw(condition));
            }
        }

        let plan = plan.with_projection(output.projection());

        debug!(
            ?mode,
            where_clause = %plan.where_literal(),
            order = %plan.order_clause(),
            group = %plan.group_clause(),
            "derived query plan"
        );

        Ok(plan)
    }
}

/// The request value of a field, if non-empty.
fn request_value<'v>(values: &'v RequestValues, field: &FieldDescriptor) -> Option<&'v str> {
    values
        .get(&field.name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// The value a field filters by: the request value unless it is missing or
/// the `NULL` sentinel, else the declared default.
fn filter_value<'v>(values: &'v RequestValues, field: &'v FieldDescriptor) -> Option<&'v str> {
    request_value(values, field)
        .filter(|v| *v != NULL_SENTINEL)
        .or(field.default_value.as_deref())
        .filter(|v| !v.is_empty())
}

/// Unparsable sort values count as zero.
fn parse_sort_value(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::{BindValue, MatchKind},
        schema::OutputField,
    };

    fn values(pairs: &[(&str, &str)]) -> RequestValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn model() -> BaseModel {
        BaseModel::new("users").unwrap()
    }

    fn build(schema: &FilterSchema, values: &RequestValues) -> QueryPlan {
        PlanBuilder::new(schema, values)
            .build(&model(), &OutputSchema::default())
            .unwrap()
    }

    #[test]
    fn test_status_condition() {
        let schema = FilterSchema::new(vec![FieldDescriptor::new("status")
            .with_kind(MatchKind::ExactString)
            .with_rule("and status = ?")])
        .unwrap();

        let plan = build(&schema, &values(&[("status", "active")]));

        assert!(plan.where_literal().contains("and status = 'active'"));
        assert_eq!(plan.where_clause(), "1=1 and status = ?");
        assert_eq!(plan.binds(), vec![BindValue::Text("active".into())]);
    }

    #[test]
    fn test_declaration_order_ascending() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("name")
                .with_kind(MatchKind::Prefix)
                .with_sequence(1)
                .with_order_by(0),
            FieldDescriptor::new("createdAt")
                .with_sequence(2)
                .with_order_by(0),
        ])
        .unwrap();
        let values = RequestValues::new();

        let builder = PlanBuilder::new(&schema, &values);
        assert_eq!(builder.sort_mode(), SortMode::Declaration);

        let plan = builder.build(&model(), &OutputSchema::default()).unwrap();
        assert_eq!(plan.order_clause(), "name asc,created_at asc");
    }

    #[test]
    fn test_declaration_mode_direction() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("score").with_order_by(1),
            FieldDescriptor::new("age").with_order_by(-1),
            FieldDescriptor::new("rank").with_order_by(0),
        ])
        .unwrap();

        let plan = build(&schema, &RequestValues::new());
        assert_eq!(plan.order_clause(), "score desc,age asc,rank asc");

        let plan = build(&schema, &values(&[("score", "0"), ("rank", "5")]));
        assert_eq!(plan.order_clause(), "score asc,age asc,rank desc");

        let plan = build(&schema, &values(&[("age", "desc")]));
        assert_eq!(plan.order_clause(), "score desc,age asc,rank asc");
    }

    #[test]
    fn test_sequence_mode() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("name").with_sequence(0).with_order_by(0),
            FieldDescriptor::new("createdAt")
                .with_sequence(0)
                .with_order_by(0),
            FieldDescriptor::new("id").with_order_by(1),
        ])
        .unwrap();
        let values = values(&[("name", "1"), ("createdAt", "0")]);

        let builder = PlanBuilder::new(&schema, &values);
        assert_eq!(builder.sort_mode(), SortMode::Sequence);

        let plan = builder.build(&model(), &OutputSchema::default()).unwrap();
        assert_eq!(plan.order_clause(), "created_at asc,name desc");
    }

    #[test]
    fn test_sequence_mode_skips_gaps_and_negative_keys() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("a").with_sequence(0).with_order_by(0),
            FieldDescriptor::new("b").with_sequence(0).with_order_by(0),
            FieldDescriptor::new("c").with_sequence(0).with_order_by(0),
        ])
        .unwrap();

        let plan = build(&schema, &values(&[("a", "7"), ("b", "-2"), ("c", "3")]));
        assert_eq!(plan.order_clause(), "c desc,a desc");
    }

    #[test]
    fn test_sequence_mode_later_field_wins_same_key() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("a").with_sequence(0).with_order_by(0),
            FieldDescriptor::new("b").with_sequence(0).with_order_by(0),
        ])
        .unwrap();

        let plan = build(&schema, &values(&[("a", "1"), ("b", "1")]));
        assert_eq!(plan.order_clause(), "b desc");
    }

    #[test]
    fn test_sequence_without_matching_field_is_dropped() {
        // The sequence number has no orderable field, so sequence mode is
        // active but nothing sorts; the declared order of `name` is lost too.
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("tag").with_sequence(0),
            FieldDescriptor::new("name").with_order_by(0),
        ])
        .unwrap();
        let values = values(&[("tag", "0")]);

        let builder = PlanBuilder::new(&schema, &values);
        assert_eq!(builder.sort_mode(), SortMode::Sequence);

        let plan = builder.build(&model(), &OutputSchema::default()).unwrap();
        assert_eq!(plan.order_clause(), "");
    }

    #[test]
    fn test_sort_independent_of_filter() {
        let schema = FilterSchema::new(vec![FieldDescriptor::new("name")
            .with_rule("{column} like ?")
            .with_order_by(1)
            .with_group_by()])
        .unwrap();

        let plan = build(&schema, &RequestValues::new());
        assert_eq!(plan.where_clause(), "1=1");
        assert_eq!(plan.order_clause(), "name desc");
        assert_eq!(plan.group_clause(), "name");
    }

    #[test]
    fn test_value_resolution() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("status")
                .with_kind(MatchKind::ExactString)
                .with_rule("{column} = ?")
                .with_default("active"),
            FieldDescriptor::new("name")
                .with_kind(MatchKind::Substring)
                .with_rule("{column} like ?"),
            FieldDescriptor::new("team").with_kind(MatchKind::ExactString),
        ])
        .unwrap();

        let plan = build(&schema, &RequestValues::new());
        assert_eq!(plan.where_literal(), "1=1 and status = 'active'");

        let plan = build(&schema, &values(&[("status", "NULL"), ("name", "")]));
        assert_eq!(plan.where_literal(), "1=1 and status = 'active'");

        let plan = build(
            &schema,
            &values(&[("status", "banned"), ("name", "ann"), ("team", "red")]),
        );
        assert_eq!(
            plan.where_literal(),
            "1=1 and status = 'banned' and name like '%ann%'"
        );
        assert_eq!(plan.where_clause(), "1=1 and status = ? and name like ?");
    }

    #[test]
    fn test_null_sentinel_without_default_skips_field() {
        let schema = FilterSchema::new(vec![FieldDescriptor::new("status")
            .with_kind(MatchKind::ExactString)
            .with_rule("{column} = ?")])
        .unwrap();

        let plan = build(&schema, &values(&[("status", "NULL")]));
        assert_eq!(plan.where_clause(), "1=1");
    }

    #[test]
    fn test_group_by_in_declaration_order() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("team").with_group_by(),
            FieldDescriptor::new("name"),
            FieldDescriptor::new("status").with_group_by(),
        ])
        .unwrap();

        let plan = build(&schema, &RequestValues::new());
        assert_eq!(plan.group_clause(), "team,status");
    }

    #[test]
    fn test_permuted_fields_produce_same_conditions() {
        let status = FieldDescriptor::new("status")
            .with_kind(MatchKind::ExactString)
            .with_rule("{column} = ?");
        let age = FieldDescriptor::new("age")
            .with_kind(MatchKind::Compare)
            .with_rule("{column} >= ?");
        let values = values(&[("status", "active"), ("age", "30")]);

        let forward = build(
            &FilterSchema::new(vec![status.clone(), age.clone()]).unwrap(),
            &values,
        );
        let backward = build(&FilterSchema::new(vec![age, status]).unwrap(), &values);

        let mut a: Vec<_> = forward.conditions().iter().map(|c| c.literal.clone()).collect();
        let mut b: Vec<_> = backward.conditions().iter().map(|c| c.literal.clone()).collect();
        assert_ne!(a, b);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_soft_delete_and_join() {
        let schema = FilterSchema::new(vec![]).unwrap();
        let values = RequestValues::new();
        let model = model().with_soft_delete("deleted_at").unwrap();

        let plan = PlanBuilder::new(&schema, &values)
            .join(Some("left join teams on teams.id = users.team_id"))
            .build(&model, &OutputSchema::default())
            .unwrap();
        assert_eq!(plan.where_clause(), "1=1 and users.deleted_at IS NULL");
        assert_eq!(
            plan.join(),
            Some("left join teams on teams.id = users.team_id")
        );

        let plan = PlanBuilder::new(&schema, &values)
            .include_soft_deleted(true)
            .build(&model, &OutputSchema::default())
            .unwrap();
        assert_eq!(plan.where_clause(), "1=1");
    }

    #[test]
    fn test_projection_from_output_schema() {
        let schema = FilterSchema::new(vec![FieldDescriptor::new("status")]).unwrap();
        let output = OutputSchema::new(vec![
            OutputField::new("id"),
            OutputField::new("userName").with_column("users.name"),
            OutputField::new("password").with_column("-"),
        ])
        .unwrap();

        let plan = PlanBuilder::new(&schema, &RequestValues::new())
            .build(&model(), &output)
            .unwrap();
        assert_eq!(plan.projection_clause(), "id,users.name as user_name");
    }

    #[test]
    fn test_set_membership_and_is_null() {
        let schema = FilterSchema::new(vec![
            FieldDescriptor::new("role")
                .with_kind(MatchKind::SetMembership)
                .with_rule("{column} in (?)"),
            FieldDescriptor::new("deletedAt")
                .with_kind(MatchKind::IsNull)
                .with_rule("{column} ?"),
        ])
        .unwrap();

        let plan = build(&schema, &values(&[("role", "admin,owner"), ("deletedAt", "1")]));
        assert_eq!(
            plan.where_literal(),
            "1=1 and role in ('admin','owner') and deleted_at is null"
        );
        assert_eq!(plan.where_clause(), "1=1 and role in (?,?) and deleted_at is null");
        assert_eq!(plan.binds().len(), 2);
    }
}
