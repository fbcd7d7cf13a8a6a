use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::StoreError;
use crate::filter::filter_match::values_equal;
use crate::filter::validate_field;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// A stored record: the store-assigned id plus its JSON body.
/// The body always carries `_id`, `createdAt` and `updatedAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub data: Map<String, Value>,
}

impl Document {
    /// Build a fresh document from caller-supplied fields, assigning id and timestamps
    pub fn new(mut fields: Map<String, Value>) -> Self {
        let id = Uuid::new_v4();
        let now = Value::String(timestamp());
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        fields.insert(CREATED_AT.to_string(), now.clone());
        fields.insert(UPDATED_AT.to_string(), now);
        Self { id, data: fields }
    }

    /// Rehydrate a document read back from a backend
    pub fn from_data(data: Map<String, Value>) -> Result<Self, StoreError> {
        let id = data
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| StoreError::Corrupt("document without a valid _id".to_string()))?;
        Ok(Self { id, data })
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

/// A single-document mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite the given top-level fields
    Set(Map<String, Value>),
    /// Remove the given top-level fields
    Unset(Vec<String>),
    /// Append a value to an array field; a missing or non-array field starts empty
    Push { field: String, value: Value },
    /// Remove every element equal to `value` from an array field
    Pull { field: String, value: Value },
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.into(), value.into());
        Update::Set(fields)
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            Update::Set(fields) => fields.keys().map(String::as_str).collect(),
            Update::Unset(fields) => fields.iter().map(String::as_str).collect(),
            Update::Push { field, .. } | Update::Pull { field, .. } => vec![field.as_str()],
        }
    }

    /// Field names must be identifiers and store-managed fields are read-only
    pub fn validate(&self) -> Result<(), StoreError> {
        for field in self.fields() {
            validate_field(field)?;
            if matches!(field, ID_FIELD | CREATED_AT | UPDATED_AT) {
                return Err(StoreError::InvalidUpdate(format!("field '{}' is immutable", field)));
            }
        }
        Ok(())
    }

    /// Apply to an in-memory body and refresh `updatedAt`
    pub fn apply(&self, data: &mut Map<String, Value>) {
        match self {
            Update::Set(fields) => {
                for (k, v) in fields {
                    data.insert(k.clone(), v.clone());
                }
            }
            Update::Unset(fields) => {
                for k in fields {
                    data.remove(k);
                }
            }
            Update::Push { field, value } => match data.get_mut(field) {
                Some(Value::Array(items)) => items.push(value.clone()),
                _ => {
                    data.insert(field.clone(), Value::Array(vec![value.clone()]));
                }
            },
            Update::Pull { field, value } => match data.get_mut(field) {
                Some(Value::Array(items)) => items.retain(|item| !values_equal(item, value)),
                _ => {
                    data.insert(field.clone(), Value::Array(vec![]));
                }
            },
        }
        data.insert(UPDATED_AT.to_string(), Value::String(timestamp()));
    }
}

/// RFC 3339 with millisecond precision so lexical and chronological order agree
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn new_document_assigns_id_and_timestamps() {
        let doc = Document::new(body(json!({ "content": "hello" })));
        assert_eq!(doc.data.get("_id"), Some(&json!(doc.id.to_string())));
        assert_eq!(doc.data.get("createdAt"), doc.data.get("updatedAt"));
        assert_eq!(Document::from_data(doc.data.clone()).unwrap().id, doc.id);
    }

    #[test]
    fn immutable_fields_are_rejected() {
        assert!(Update::set("_id", "x").validate().is_err());
        assert!(Update::Unset(vec!["createdAt".into()]).validate().is_err());
        assert!(Update::set("title", "x").validate().is_ok());
        assert!(Update::set("bad field", "x").validate().is_err());
    }

    #[test]
    fn push_and_pull_on_arrays() {
        let mut data = body(json!({ "videos": ["a"] }));
        Update::Push { field: "videos".into(), value: json!("b") }.apply(&mut data);
        assert_eq!(data["videos"], json!(["a", "b"]));

        Update::Pull { field: "videos".into(), value: json!("a") }.apply(&mut data);
        assert_eq!(data["videos"], json!(["b"]));

        Update::Push { field: "watchHistory".into(), value: json!("v") }.apply(&mut data);
        assert_eq!(data["watchHistory"], json!(["v"]));
        assert!(data.contains_key("updatedAt"));
    }

    #[test]
    fn unset_removes_fields() {
        let mut data = body(json!({ "refreshToken": "digest", "username": "alice" }));
        Update::Unset(vec!["refreshToken".into()]).apply(&mut data);
        assert!(!data.contains_key("refreshToken"));
        assert_eq!(data["username"], json!("alice"));
    }
}
