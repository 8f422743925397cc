//! Issue filters and ordering for the read API

use std::fmt;
use std::str::FromStr;

use fixme_core::{ExperienceLevel, IssueType, RepoRef};
use sqlx::{QueryBuilder, Sqlite};

use crate::{Error, Result};

/// Split a filter value such as `["rust","go"]` or `rust,go` into its items
///
/// Brackets, double quotes and backslashes are dropped; `,` and `]` end an
/// item. Blank items are discarded.
pub fn parse_filter_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();

    for c in raw.chars() {
        match c {
            '[' | '"' | '\\' => {}
            ',' | ']' => values.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    values.push(current);

    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Column an issue listing can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderField {
    ExperienceNeeded,
    ExpectedTime,
    #[default]
    UpdatedAt,
}

impl OrderField {
    pub fn column(&self) -> &'static str {
        match self {
            OrderField::ExperienceNeeded => "experience_needed",
            OrderField::ExpectedTime => "expected_time",
            OrderField::UpdatedAt => "updated_at",
        }
    }
}

/// Sort order; `-field` parses as descending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl FromStr for Ordering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "experience_needed" => OrderField::ExperienceNeeded,
            "expected_time" => OrderField::ExpectedTime,
            "updated_at" => OrderField::UpdatedAt,
            other => {
                return Err(Error::InvalidData(format!(
                    "cannot order by '{}' (expected experience_needed, expected_time or updated_at)",
                    other
                )))
            }
        };
        Ok(Self { field, descending })
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        write!(f, "{}", self.field.column())
    }
}

/// Filters for listing stored issues
///
/// Each populated filter matches any of its values; filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    pub language: Vec<String>,
    pub tech_stack: Vec<String>,
    pub experience_needed: Vec<ExperienceLevel>,
    pub expected_time: Vec<String>,
    pub issue_type: Vec<IssueType>,
    pub repository: Option<RepoRef>,
    pub ordering: Ordering,
}

impl IssueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, raw: &str) -> Self {
        self.language = parse_filter_values(raw);
        self
    }

    pub fn tech_stack(mut self, raw: &str) -> Self {
        self.tech_stack = parse_filter_values(raw);
        self
    }

    pub fn expected_time(mut self, raw: &str) -> Self {
        self.expected_time = parse_filter_values(raw);
        self
    }

    pub fn experience_needed(mut self, raw: &str) -> Result<Self> {
        self.experience_needed = parse_enum_values(raw)?;
        Ok(self)
    }

    pub fn issue_type(mut self, raw: &str) -> Result<Self> {
        self.issue_type = parse_enum_values(raw)?;
        Ok(self)
    }

    pub fn repository(mut self, repo: RepoRef) -> Self {
        self.repository = Some(repo);
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Append WHERE and ORDER BY clauses for a query over `issues i JOIN repositories r`
    pub(crate) fn push_clauses<'q>(&'q self, builder: &mut QueryBuilder<'q, Sqlite>) {
        builder.push(" WHERE 1 = 1");

        push_in(builder, "i.language", self.language.iter().map(String::as_str).collect());
        push_in(builder, "i.tech_stack", self.tech_stack.iter().map(String::as_str).collect());
        push_in(
            builder,
            "i.experience_needed",
            self.experience_needed.iter().map(|e| e.as_str()).collect(),
        );
        push_in(builder, "i.expected_time", self.expected_time.iter().map(String::as_str).collect());
        push_in(builder, "i.issue_type", self.issue_type.iter().map(|t| t.as_str()).collect());

        if let Some(ref repo) = self.repository {
            builder.push(" AND r.owner = ");
            builder.push_bind(repo.owner.as_str());
            builder.push(" AND r.name = ");
            builder.push_bind(repo.name.as_str());
        }

        let direction = if self.ordering.descending { "DESC" } else { "ASC" };
        builder.push(format!(
            " ORDER BY i.{} {}, i.issue_id {}",
            self.ordering.field.column(),
            direction,
            direction
        ));
    }
}

fn parse_enum_values<T: FromStr<Err = fixme_core::Error>>(raw: &str) -> Result<Vec<T>> {
    parse_filter_values(raw)
        .iter()
        .map(|v| v.parse().map_err(|e: fixme_core::Error| Error::InvalidData(e.to_string())))
        .collect()
}

fn push_in<'q>(builder: &mut QueryBuilder<'q, Sqlite>, column: &str, values: Vec<&'q str>) {
    if values.is_empty() {
        return;
    }
    builder.push(format!(" AND {} IN (", column));
    let mut separated = builder.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_values_bracketed() {
        assert_eq!(parse_filter_values(r#"["rust","go"]"#), vec!["rust", "go"]);
        assert_eq!(parse_filter_values(r#"[\"python\"]"#), vec!["python"]);
    }

    #[test]
    fn test_parse_filter_values_plain() {
        assert_eq!(parse_filter_values("rust, go"), vec!["rust", "go"]);
        assert_eq!(parse_filter_values("rust"), vec!["rust"]);
        assert!(parse_filter_values("").is_empty());
        assert!(parse_filter_values("[]").is_empty());
    }

    #[test]
    fn test_ordering_parse() {
        let ordering: Ordering = "-experience_needed".parse().unwrap();
        assert_eq!(ordering.field, OrderField::ExperienceNeeded);
        assert!(ordering.descending);

        let ordering: Ordering = "expected_time".parse().unwrap();
        assert!(!ordering.descending);
        assert_eq!(ordering.to_string(), "expected_time");

        assert!("title".parse::<Ordering>().is_err());
    }

    #[test]
    fn test_default_ordering_is_updated_at_ascending() {
        let query = IssueQuery::new();
        assert_eq!(query.ordering.field, OrderField::UpdatedAt);
        assert!(!query.ordering.descending);
    }

    #[test]
    fn test_enum_filters_reject_unknown_values() {
        let query = IssueQuery::new().experience_needed("easy,senior").unwrap();
        assert_eq!(
            query.experience_needed,
            vec![ExperienceLevel::Easy, ExperienceLevel::Senior]
        );
        assert!(IssueQuery::new().issue_type("feature").is_err());
    }

    #[test]
    fn test_clauses_bind_each_value() {
        let query = IssueQuery::new().language("rust,go");
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT i.issue_id FROM issues i JOIN repositories r ON r.id = i.repository_id");
        query.push_clauses(&mut builder);
        let sql = builder.sql();
        assert!(sql.contains("i.language IN (?, ?)"));
        assert!(sql.ends_with("ORDER BY i.updated_at ASC, i.issue_id ASC"));
    }
}
