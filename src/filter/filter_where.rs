use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{validate_field, CompareOp, Condition, FilterOp, SqlParam};

/// Parses Mongo-style WHERE documents and renders them as SQL over a JSONB `data` column
pub struct FilterWhere<'p> {
    params: &'p mut Vec<SqlParam>,
}

impl<'p> FilterWhere<'p> {
    pub fn new(params: &'p mut Vec<SqlParam>) -> Self {
        Self { params }
    }

    /// Parse a WHERE document into a list of implicitly AND-ed conditions
    pub fn parse(where_data: &Value) -> Result<Vec<Condition>, FilterError> {
        match where_data {
            Value::Null => Ok(vec![]),
            Value::Object(obj) => {
                let mut conditions = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    if key.starts_with('$') {
                        conditions.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        conditions.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(conditions)
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut parts = Vec::with_capacity(arr.len());
                for v in arr {
                    parts.push(Condition::And(Self::parse(v)?));
                }
                Ok(if op == "$and" { Condition::And(parts) } else { Condition::Or(parts) })
            }
            "$not" => Ok(Condition::Not(Box::new(Condition::And(Self::parse(value)?)))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        validate_field(field)?;

        let operators = match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => {
                return Err(FilterError::InvalidWhereClause(format!(
                    "field '{}' mixes operators and literal keys",
                    field
                )));
            }
            // Implicit equality: { field: value }
            _ => {
                return Ok(vec![Condition::Compare {
                    field: field.to_string(),
                    op: CompareOp::Eq,
                    value: value.clone(),
                }]);
            }
        };

        let mut out = Vec::with_capacity(operators.len());
        for (op_key, op_val) in operators {
            if op_key == "$options" {
                if !operators.contains_key("$regex") {
                    return Err(FilterError::InvalidOperatorData("$options requires $regex".to_string()));
                }
                continue;
            }
            out.push(Self::parse_operator(field, FilterOp::from_key(op_key)?, op_val, operators)?);
        }
        Ok(out)
    }

    fn parse_operator(
        field: &str,
        op: FilterOp,
        data: &Value,
        siblings: &Map<String, Value>,
    ) -> Result<Condition, FilterError> {
        let field = field.to_string();
        let compare = |op: CompareOp| Condition::Compare { field: field.clone(), op, value: data.clone() };
        let ordered = |op: CompareOp| {
            if data.is_number() || data.is_string() {
                Ok(compare(op))
            } else {
                Err(FilterError::InvalidOperatorData(format!(
                    "ordered comparison on '{}' requires a number or string",
                    field
                )))
            }
        };

        match op {
            FilterOp::Eq => Ok(compare(CompareOp::Eq)),
            FilterOp::Ne => Ok(compare(CompareOp::Ne)),
            FilterOp::Gt => ordered(CompareOp::Gt),
            FilterOp::Gte => ordered(CompareOp::Gte),
            FilterOp::Lt => ordered(CompareOp::Lt),
            FilterOp::Lte => ordered(CompareOp::Lte),
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin requires array".to_string()))?;
                Ok(Condition::In { field, values: values.clone(), negate: op == FilterOp::NIn })
            }
            FilterOp::Regex => {
                let pattern = data
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$regex requires string".to_string()))?;
                let case_insensitive = siblings
                    .get("$options")
                    .and_then(Value::as_str)
                    .map(|o| o.contains('i'))
                    .unwrap_or(false);
                let pattern = RegexBuilder::new(pattern).case_insensitive(case_insensitive).build()?;
                Ok(Condition::Regex { field, pattern, case_insensitive })
            }
            FilterOp::Exists => {
                let exists = data
                    .as_bool()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$exists requires boolean".to_string()))?;
                Ok(Condition::Exists { field, exists })
            }
        }
    }

    /// Render AND-ed conditions; an empty list matches everything
    pub fn generate(&mut self, conditions: &[Condition]) -> Result<String, FilterError> {
        self.generate_and(conditions)
    }

    fn generate_and(&mut self, conditions: &[Condition]) -> Result<String, FilterError> {
        match conditions {
            [] => Ok("TRUE".to_string()),
            [single] => self.generate_condition(single),
            many => {
                let parts = many
                    .iter()
                    .map(|c| self.generate_condition(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" AND ")))
            }
        }
    }

    fn generate_condition(&mut self, condition: &Condition) -> Result<String, FilterError> {
        match condition {
            Condition::Compare { field, op, value } => {
                validate_field(field)?;
                match op {
                    CompareOp::Eq | CompareOp::Ne => {
                        let p = self.param(SqlParam::Json(value.clone()));
                        Ok(format!("{} {} {}::jsonb", json_expr(field), op.to_sql(), p))
                    }
                    _ => match value {
                        Value::Number(n) => {
                            let f = n.as_f64().ok_or_else(|| {
                                FilterError::InvalidOperatorData(format!("unrepresentable number {}", n))
                            })?;
                            let p = self.param(SqlParam::Float(f));
                            Ok(format!("COALESCE({} {} {}, FALSE)", number_expr(field), op.to_sql(), p))
                        }
                        Value::String(s) => {
                            let p = self.param(SqlParam::Text(s.clone()));
                            Ok(format!("COALESCE({} {} {}, FALSE)", text_expr(field), op.to_sql(), p))
                        }
                        _ => Err(FilterError::InvalidOperatorData(format!(
                            "ordered comparison on '{}' requires a number or string",
                            field
                        ))),
                    },
                }
            }
            Condition::In { field, values, negate } => {
                validate_field(field)?;
                if values.is_empty() {
                    return Ok(if *negate { "TRUE" } else { "FALSE" }.to_string());
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("{}::jsonb", self.param(SqlParam::Json(v.clone()))))
                    .collect();
                let sql = format!("{} IN ({})", json_expr(field), placeholders.join(", "));
                Ok(if *negate { format!("NOT ({})", sql) } else { sql })
            }
            Condition::Regex { field, pattern, case_insensitive } => {
                validate_field(field)?;
                let p = self.param(SqlParam::Text(pattern.as_str().to_string()));
                let op = if *case_insensitive { "~*" } else { "~" };
                Ok(format!("COALESCE({} {} {}, FALSE)", text_expr(field), op, p))
            }
            Condition::Exists { field, exists } => {
                validate_field(field)?;
                let p = self.param(SqlParam::Text(field.clone()));
                let sql = format!("jsonb_exists(data, {})", p);
                Ok(if *exists { sql } else { format!("NOT {}", sql) })
            }
            Condition::And(parts) => self.generate_and(parts),
            Condition::Or(parts) => {
                if parts.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let rendered = parts
                    .iter()
                    .map(|c| self.generate_condition(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", rendered.join(" OR ")))
            }
            Condition::Not(inner) => Ok(format!("NOT ({})", self.generate_condition(inner)?)),
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

/// JSON value of a field; missing fields read as JSON null so comparisons stay two-valued
pub fn json_expr(field: &str) -> String {
    format!("COALESCE(data->'{}', 'null'::jsonb)", field)
}

fn text_expr(field: &str) -> String {
    format!("(CASE WHEN jsonb_typeof(data->'{f}') = 'string' THEN data->>'{f}' END)", f = field)
}

fn number_expr(field: &str) -> String {
    format!(
        "(CASE WHEN jsonb_typeof(data->'{f}') = 'number' THEN (data->>'{f}')::double precision END)",
        f = field
    )
}
