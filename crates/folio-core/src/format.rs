//! Value formatting for filter conditions.
//!
//! A raw request value is turned into a [`FormattedValue`] according to the
//! field's [`MatchKind`]. The formatted value can be rendered two ways:
//!
//! - [`FormattedValue::literal`] produces the literal SQL text (`'abc%'`,
//!   `'a','b'`, `is null`, ...). It is only used for tracing.
//! - [`FormattedValue::to_sql`] produces `?` placeholders and pushes the
//!   matching [`BindValue`]s, which is what actually reaches the database.

use std::fmt;

/// How a raw request value is matched against its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchKind {
    /// `'<value>%'`
    Prefix,
    /// `'%<value>%'`
    Substring,
    /// `<value>`, compared as a number.
    ExactNumber,
    /// `'<value>'`
    ExactString,
    /// `<value>`; the template supplies the comparator.
    Compare,
    /// `'<v1>','<v2>',...` from a comma separated value.
    SetMembership,
    /// The keyword `is null`; the value itself is ignored.
    IsNull,
    /// Unrecognized kinds behave like a suffix wildcard.
    #[default]
    Fallback,
}

impl MatchKind {
    /// Parses a tag name. Unknown names map to [`MatchKind::Fallback`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "start_with" | "prefix" => Self::Prefix,
            "all_with" | "substring" => Self::Substring,
            "equals-number" | "equals_number" => Self::ExactNumber,
            "equals-string" | "equals_string" => Self::ExactString,
            "compare" => Self::Compare,
            "where_in" | "in" => Self::SetMembership,
            "is_null" => Self::IsNull,
            _ => Self::Fallback,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Prefix => "start_with",
            Self::Substring => "all_with",
            Self::ExactNumber => "equals-number",
            Self::ExactString => "equals-string",
            Self::Compare => "compare",
            Self::SetMembership => "where_in",
            Self::IsNull => "is_null",
            Self::Fallback => "default",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl BindValue {
    /// Binds numeric text as a number when it parses, as text otherwise.
    fn numeric(raw: &str) -> Self {
        if let Ok(v) = raw.trim().parse::<i64>() {
            return Self::Integer(v);
        }
        if let Ok(v) = raw.trim().parse::<f64>() {
            return Self::Real(v);
        }
        Self::Text(raw.to_string())
    }
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
        }
    }
}

/// A request value after match-kind formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedValue {
    /// Single quoted value.
    Quoted(String),
    /// Unquoted numeric value, the raw text is kept for the literal form.
    Numeric { raw: String, bind: BindValue },
    /// Comma separated quoted values.
    Set(Vec<String>),
    /// A SQL keyword embedded as-is.
    Keyword(&'static str),
}

impl FormattedValue {
    /// Renders the literal SQL text of this value.
    pub fn literal(&self) -> String {
        match self {
            Self::Quoted(v) => BindValue::Text(v.clone()).to_string(),
            Self::Numeric { raw, .. } => raw.clone(),
            Self::Set(items) => items
                .iter()
                .map(|item| BindValue::Text(item.clone()).to_string())
                .collect::<Vec<_>>()
                .join(","),
            Self::Keyword(keyword) => (*keyword).to_string(),
        }
    }

    /// Renders placeholders for this value and appends the bound values.
    pub fn to_sql(&self, params: &mut Vec<BindValue>) -> String {
        match self {
            Self::Quoted(v) => {
                params.push(BindValue::Text(v.clone()));
                "?".to_string()
            }
            Self::Numeric { bind, .. } => {
                params.push(bind.clone());
                "?".to_string()
            }
            Self::Set(items) => {
                params.extend(items.iter().cloned().map(BindValue::Text));
                vec!["?"; items.len()].join(",")
            }
            Self::Keyword(keyword) => (*keyword).to_string(),
        }
    }
}

/// Formats a raw request value for the given match kind.
pub fn format(kind: MatchKind, raw: &str) -> FormattedValue {
    match kind {
        MatchKind::Prefix | MatchKind::Fallback => FormattedValue::Quoted(format!("{raw}%")),
        MatchKind::Substring => FormattedValue::Quoted(format!("%{raw}%")),
        MatchKind::ExactString => FormattedValue::Quoted(raw.to_string()),
        MatchKind::ExactNumber | MatchKind::Compare => FormattedValue::Numeric {
            raw: raw.to_string(),
            bind: BindValue::numeric(raw),
        },
        MatchKind::SetMembership => {
            FormattedValue::Set(raw.split(',').map(String::from).collect())
        }
        MatchKind::IsNull => FormattedValue::Keyword("is null"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_forms() {
        assert_eq!(format(MatchKind::Prefix, "ab").literal(), "'ab%'");
        assert_eq!(format(MatchKind::Substring, "ab").literal(), "'%ab%'");
        assert_eq!(format(MatchKind::ExactNumber, "42").literal(), "42");
        assert_eq!(format(MatchKind::ExactString, "ab").literal(), "'ab'");
        assert_eq!(format(MatchKind::Compare, "3.5").literal(), "3.5");
        assert_eq!(
            format(MatchKind::SetMembership, "a,b,c").literal(),
            "'a','b','c'"
        );
        assert_eq!(format(MatchKind::IsNull, "ignored").literal(), "is null");
        assert_eq!(format(MatchKind::Fallback, "ab").literal(), "'ab%'");
    }

    #[test]
    fn test_literal_escapes_quotes() {
        assert_eq!(format(MatchKind::ExactString, "o'neil").literal(), "'o''neil'");
    }

    #[test]
    fn test_to_sql_binds_values() {
        let mut params = vec![];
        let sql = format(MatchKind::Substring, "ana").to_sql(&mut params);
        assert_eq!(sql, "?");
        assert_eq!(params, vec![BindValue::Text("%ana%".into())]);

        let mut params = vec![];
        let sql = format(MatchKind::SetMembership, "x,y").to_sql(&mut params);
        assert_eq!(sql, "?,?");
        assert_eq!(
            params,
            vec![BindValue::Text("x".into()), BindValue::Text("y".into())]
        );

        let mut params = vec![];
        let sql = format(MatchKind::IsNull, "").to_sql(&mut params);
        assert_eq!(sql, "is null");
        assert!(params.is_empty());
    }

    #[test]
    fn test_numeric_binding() {
        let mut params = vec![];
        format(MatchKind::ExactNumber, "7").to_sql(&mut params);
        format(MatchKind::Compare, "2.5").to_sql(&mut params);
        format(MatchKind::Compare, "abc").to_sql(&mut params);
        assert_eq!(
            params,
            vec![
                BindValue::Integer(7),
                BindValue::Real(2.5),
                BindValue::Text("abc".into())
            ]
        );
    }

    #[test]
    fn test_malformed_set_is_partial_not_failing() {
        let value = format(MatchKind::SetMembership, "a,,b,");
        assert_eq!(value.literal(), "'a','','b',''");

        let mut params = vec![];
        assert_eq!(value.to_sql(&mut params), "?,?,?,?");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_match_kind_from_tag() {
        assert_eq!(MatchKind::from_tag("start_with"), MatchKind::Prefix);
        assert_eq!(MatchKind::from_tag("all_with"), MatchKind::Substring);
        assert_eq!(MatchKind::from_tag("equals-number"), MatchKind::ExactNumber);
        assert_eq!(MatchKind::from_tag("equals-string"), MatchKind::ExactString);
        assert_eq!(MatchKind::from_tag("compare"), MatchKind::Compare);
        assert_eq!(MatchKind::from_tag("where_in"), MatchKind::SetMembership);
        assert_eq!(MatchKind::from_tag("is_null"), MatchKind::IsNull);
        assert_eq!(MatchKind::from_tag("fuzzy"), MatchKind::Fallback);
        assert_eq!(MatchKind::from_tag(""), MatchKind::Fallback);
    }
}
