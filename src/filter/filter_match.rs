use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{CompareOp, Condition};

static NULL: Value = Value::Null;

/// Evaluate a condition against an in-memory document
pub fn matches(condition: &Condition, doc: &Map<String, Value>) -> bool {
    match condition {
        Condition::Compare { field, op, value } => {
            let actual = field_value(doc, field);
            match op {
                CompareOp::Eq => values_equal(actual, value),
                CompareOp::Ne => !values_equal(actual, value),
                _ => match ordered_cmp(actual, value) {
                    Some(ord) => match op {
                        CompareOp::Gt => ord == Ordering::Greater,
                        CompareOp::Gte => ord != Ordering::Less,
                        CompareOp::Lt => ord == Ordering::Less,
                        CompareOp::Lte => ord != Ordering::Greater,
                        CompareOp::Eq | CompareOp::Ne => unreachable!(),
                    },
                    None => false,
                },
            }
        }
        Condition::In { field, values, negate } => {
            let actual = field_value(doc, field);
            values.iter().any(|v| values_equal(actual, v)) != *negate
        }
        Condition::Regex { field, pattern, .. } => match field_value(doc, field) {
            Value::String(s) => pattern.is_match(s),
            _ => false,
        },
        Condition::Exists { field, exists } => doc.contains_key(field) == *exists,
        Condition::And(parts) => parts.iter().all(|c| matches(c, doc)),
        Condition::Or(parts) => parts.iter().any(|c| matches(c, doc)),
        Condition::Not(inner) => !matches(inner, doc),
    }
}

/// Missing fields read as null
fn field_value<'a>(doc: &'a Map<String, Value>, field: &str) -> &'a Value {
    doc.get(field).unwrap_or(&NULL)
}

/// JSON equality where `1` and `1.0` are the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordered comparison only between two numbers or two strings
fn ordered_cmp(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order over JSON values, following PostgreSQL jsonb ordering:
/// null < string < number < boolean < array < object
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    };
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;
    use serde_json::json;

    fn check(where_data: Value, doc: Value) -> bool {
        let conditions = FilterWhere::parse(&where_data).unwrap();
        let doc = doc.as_object().unwrap().clone();
        conditions.iter().all(|c| matches(c, &doc))
    }

    #[test]
    fn equality_treats_missing_as_null() {
        assert!(check(json!({ "video": null }), json!({ "tweet": "t1" })));
        assert!(!check(json!({ "video": { "$ne": null } }), json!({ "tweet": "t1" })));
        assert!(check(json!({ "video": { "$ne": null } }), json!({ "video": "v1" })));
    }

    #[test]
    fn regex_is_case_insensitive_with_option() {
        let doc = json!({ "title": "Learning Rust Ownership" });
        assert!(check(json!({ "title": { "$regex": "rust", "$options": "i" } }), doc.clone()));
        assert!(!check(json!({ "title": { "$regex": "rust" } }), doc.clone()));
        assert!(!check(json!({ "views": { "$regex": "1" } }), json!({ "views": 1 })));
    }

    #[test]
    fn ordered_comparisons_do_not_cross_types() {
        assert!(check(json!({ "views": { "$gt": 3 } }), json!({ "views": 4 })));
        assert!(!check(json!({ "views": { "$gt": 3 } }), json!({ "views": "4" })));
        assert!(check(json!({ "views": { "$lte": 4.0 } }), json!({ "views": 4 })));
    }

    #[test]
    fn logical_operators() {
        let doc = json!({ "username": "alice", "email": "alice@example.com" });
        assert!(check(json!({ "$or": [ { "username": "bob" }, { "email": "alice@example.com" } ] }), doc.clone()));
        assert!(!check(json!({ "$and": [ { "username": "alice" }, { "email": "x" } ] }), doc.clone()));
        assert!(check(json!({ "$not": { "username": "bob" } }), doc.clone()));
        assert!(check(json!({ "username": { "$in": ["bob", "alice"] } }), doc.clone()));
        assert!(check(json!({ "username": { "$nin": ["bob"] } }), doc.clone()));
        assert!(check(json!({ "email": { "$exists": true }, "avatar": { "$exists": false } }), doc));
    }

    #[test]
    fn json_ordering_follows_jsonb() {
        assert_eq!(compare_json(&json!(null), &json!("a")), Ordering::Less);
        assert_eq!(compare_json(&json!("z"), &json!(1)), Ordering::Less);
        assert_eq!(compare_json(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_json(&json!(true), &json!(1)), Ordering::Greater);
        assert_eq!(compare_json(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
