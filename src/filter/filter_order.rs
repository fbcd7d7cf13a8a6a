use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_match::compare_json;
use super::filter_where::json_expr;
use super::types::{validate_field, SortDirection, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// ORDER BY over JSONB fields; `seq` keeps ties in insertion order
    pub fn generate(specs: &[SortSpec]) -> Result<String, FilterError> {
        let mut parts = Vec::with_capacity(specs.len() + 1);
        for spec in specs {
            validate_field(&spec.field)?;
            parts.push(format!("{} {}", json_expr(&spec.field), spec.direction.to_sql()));
        }
        parts.push("seq ASC".to_string());
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    /// Same ordering as [`FilterOrder::generate`] for in-memory documents.
    /// Ties return `Equal`, so a stable sort preserves insertion order.
    pub fn compare(specs: &[SortSpec], a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for spec in specs {
            let left = a.get(&spec.field).unwrap_or(&Value::Null);
            let right = b.get(&spec.field).unwrap_or(&Value::Null);
            let ord = match spec.direction {
                SortDirection::Asc => compare_json(left, right),
                SortDirection::Desc => compare_json(right, left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
