use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_match;
use super::filter_where::FilterWhere;
use super::types::{CompareOp, Condition, SqlParam, SqlResult};

/// A document predicate shared by every store backend.
///
/// Built either from a Mongo-style WHERE document via [`Filter::parse`] or
/// programmatically with the `eq`/`and_*` builders. The same predicate can be
/// evaluated in memory ([`Filter::matches`]) or rendered as SQL over a JSONB
/// column ([`Filter::to_where_sql`]).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(where_data: &Value) -> Result<Self, FilterError> {
        Ok(Self { conditions: FilterWhere::parse(where_data)? })
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::Compare { field: field.into(), op: CompareOp::Eq, value: value.into() })
    }

    /// Case-insensitive substring match; `needle` is matched literally
    pub fn and_contains(self, field: impl Into<String>, needle: &str) -> Result<Self, FilterError> {
        let pattern = RegexBuilder::new(&regex::escape(needle)).case_insensitive(true).build()?;
        Ok(self.with(Condition::Regex { field: field.into(), pattern, case_insensitive: true }))
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| filter_match::matches(c, doc))
    }

    /// Render as a WHERE expression, appending bind values to `params`
    pub fn to_where_sql(&self, params: &mut Vec<SqlParam>) -> Result<String, FilterError> {
        FilterWhere::new(params).generate(&self.conditions)
    }

    pub fn to_count_sql(&self, table: &str) -> Result<SqlResult, FilterError> {
        let mut params = Vec::new();
        let where_clause = self.to_where_sql(&mut params)?;
        Ok(SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", table, where_clause),
            params,
        })
    }
}
