use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use super::error::FilterError;
use super::filter_order::compare_values;
use super::types::{FilterSpec, SearchOp, SearchTerm};
use crate::types::Document;

/// A single compiled constraint on one field
#[derive(Debug, Clone)]
pub enum Condition {
    /// Exact match. `null` also matches a missing field; an array field matches if any element does.
    Equals { field: String, value: Value },
    /// Raw, unescaped regular expression supplied by the caller
    Like { field: String, pattern: Regex },
    /// Whole-string match against one of the alternatives: `^(a|b)$`
    In { field: String, pattern: Regex },
    /// Non-empty string that equals none of the alternatives (`pattern` matches the excluded set)
    NotIn { field: String, pattern: Regex },
    /// Inclusive epoch-millisecond range; `None` means unbounded on that side
    Between { field: String, start: Option<i64>, end: Option<i64> },
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Equals { field, .. }
            | Condition::Like { field, .. }
            | Condition::In { field, .. }
            | Condition::NotIn { field, .. }
            | Condition::Between { field, .. } => field,
        }
    }

    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Condition::Equals { field: field.into(), value }
    }

    /// Evaluate the constraint against a document held in memory
    pub fn matches(&self, doc: &Document) -> bool {
        let value = doc.get(self.field());
        match self {
            Condition::Equals { value: expected, .. } => match (value, expected) {
                (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
                (None, _) => false,
                (Some(Value::Array(items)), expected) if !expected.is_array() => {
                    items.iter().any(|item| json_equal(item, expected))
                }
                (Some(actual), expected) => json_equal(actual, expected),
            },
            Condition::Like { pattern, .. } | Condition::In { pattern, .. } => {
                any_string(value, |s| pattern.is_match(s))
            }
            Condition::NotIn { pattern, .. } => any_string(value, |s| !s.is_empty() && !pattern.is_match(s)),
            Condition::Between { start, end, .. } => {
                let Some(actual) = value.and_then(Value::as_f64) else {
                    return false;
                };
                start.map_or(true, |s| actual >= s as f64) && end.map_or(true, |e| actual <= e as f64)
            }
        }
    }
}

/// Compiles the constraint maps of a merged `FilterSpec` into conditions.
///
/// Later maps overwrite earlier ones on the same field: `equals`, then `searchMap`, then `betweenMap`.
pub struct FilterWhere {
    conditions: BTreeMap<String, Condition>,
    now_ms: i64,
    open_ended_between: bool,
}

impl FilterWhere {
    pub fn new(now_ms: i64, open_ended_between: bool) -> Self {
        Self {
            conditions: BTreeMap::new(),
            now_ms,
            open_ended_between,
        }
    }

    pub fn generate(spec: &FilterSpec, now_ms: i64, open_ended_between: bool) -> Result<Vec<Condition>, FilterError> {
        let mut filter_where = Self::new(now_ms, open_ended_between);
        filter_where.build(spec)
    }

    fn build(&mut self, spec: &FilterSpec) -> Result<Vec<Condition>, FilterError> {
        self.conditions.clear();

        for (field, value) in &spec.equals {
            self.push(Condition::equals(field.clone(), value.clone()));
        }
        for (field, term) in &spec.search_map {
            let condition = Self::compile_search(field, term)?;
            self.push(condition);
        }
        for (field, bounds) in &spec.between_map {
            if let Some(condition) = self.compile_between(field, bounds)? {
                self.push(condition);
            }
        }

        Ok(std::mem::take(&mut self.conditions).into_values().collect())
    }

    fn push(&mut self, condition: Condition) {
        self.conditions.insert(condition.field().to_string(), condition);
    }

    fn compile_search(field: &str, term: &SearchTerm) -> Result<Condition, FilterError> {
        let field = field.to_string();
        match term.op {
            SearchOp::Like => Ok(Condition::Like {
                pattern: Self::regex(&field, &term.value)?,
                field,
            }),
            SearchOp::In => Ok(Condition::In {
                pattern: Self::regex(&field, &format!("^({})$", Self::alternatives(&term.value)))?,
                field,
            }),
            SearchOp::NotIn => Ok(Condition::NotIn {
                pattern: Self::regex(&field, &format!("^(?:{})$", Self::alternatives(&term.value)))?,
                field,
            }),
        }
    }

    fn alternatives(value: &str) -> String {
        value.split(',').collect::<Vec<_>>().join("|")
    }

    fn regex(field: &str, pattern: &str) -> Result<Regex, FilterError> {
        Regex::new(pattern).map_err(|e| FilterError::InvalidPattern {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }

    fn compile_between(&self, field: &str, bounds: &Value) -> Result<Option<Condition>, FilterError> {
        let Some(bounds) = bounds.as_array().filter(|b| !b.is_empty()) else {
            return Ok(None);
        };

        let fallback = if self.open_ended_between { None } else { Some(self.now_ms) };
        let start = parse_bound(field, bounds.first())?.or(fallback);
        let end = parse_bound(field, bounds.get(1))?.or(fallback);

        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        Ok(Some(Condition::Between {
            field: field.to_string(),
            start,
            end,
        }))
    }
}

/// Parse one `betweenMap` bound into epoch milliseconds. Falsy bounds yield `None`.
fn parse_bound(field: &str, bound: Option<&Value>) -> Result<Option<i64>, FilterError> {
    let invalid = |value: &Value| FilterError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    };

    match bound {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(ms) if ms == 0.0 => Ok(None),
            Some(ms) => Ok(Some(ms as i64)),
            None => Err(invalid(&Value::Number(n.clone()))),
        },
        Some(Value::String(s)) => parse_date(s.trim()).map(Some).ok_or_else(|| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}

fn parse_date(s: &str) -> Option<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn any_string(value: Option<&Value>, pred: impl Fn(&str) -> bool) -> bool {
    match value {
        Some(Value::String(s)) => pred(s),
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str().is_some_and(&pred)),
        _ => false,
    }
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(Some(a), Some(b)) == Ordering::Equal,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn doc(value: Value) -> Document {
        json!({ "status": value }).as_object().cloned().unwrap()
    }

    fn compile(spec: FilterSpec) -> Vec<Condition> {
        FilterWhere::generate(&spec, NOW, false).unwrap()
    }

    #[test]
    fn in_matches_whole_alternatives_only() {
        let conditions = compile(FilterSpec::new().search("status", SearchOp::In, "a,b"));
        let cond = &conditions[0];

        assert!(cond.matches(&doc(json!("a"))));
        assert!(cond.matches(&doc(json!("b"))));
        assert!(!cond.matches(&doc(json!("ab"))));
        assert!(!cond.matches(&doc(json!("c"))));
    }

    #[test]
    fn not_in_excludes_alternatives_and_empty_string() {
        let conditions = compile(FilterSpec::new().search("status", SearchOp::NotIn, "a,b"));
        let cond = &conditions[0];

        assert!(!cond.matches(&doc(json!("a"))));
        assert!(!cond.matches(&doc(json!("b"))));
        assert!(!cond.matches(&doc(json!(""))));
        assert!(cond.matches(&doc(json!("ab"))));
        assert!(cond.matches(&doc(json!("c"))));
    }

    #[test]
    fn like_uses_raw_pattern() {
        let conditions = compile(FilterSpec::new().search("status", SearchOp::Like, "^ru.t"));
        let cond = &conditions[0];

        assert!(cond.matches(&doc(json!("rust lang"))));
        assert!(!cond.matches(&doc(json!("trust"))));
    }

    #[test]
    fn invalid_like_pattern_is_reported() {
        let spec = FilterSpec::new().search("status", SearchOp::Like, "(unclosed");
        assert!(matches!(
            FilterWhere::generate(&spec, NOW, false),
            Err(FilterError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn search_overrides_equals_on_same_field() {
        let spec = FilterSpec::new()
            .equal("status", json!("draft"))
            .search("status", SearchOp::In, "published");
        let conditions = compile(spec);

        assert_eq!(conditions.len(), 1);
        assert!(matches!(conditions[0], Condition::In { .. }));
    }

    #[test]
    fn missing_between_bound_collapses_to_now() {
        let spec = FilterSpec::new().between("createdAt", json!(["2023-01-01 00:00:00"]));
        let conditions = compile(spec);

        match &conditions[0] {
            Condition::Between { start, end, .. } => {
                assert_eq!(*start, Some(1_672_531_200_000));
                assert_eq!(*end, Some(NOW));
            }
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn open_ended_between_leaves_missing_bound_unbounded() {
        let spec = FilterSpec::new().between("createdAt", json!([null, "2023-01-01"]));
        let conditions = FilterWhere::generate(&spec, NOW, true).unwrap();

        match &conditions[0] {
            Condition::Between { start, end, .. } => {
                assert_eq!(*start, None);
                assert_eq!(*end, Some(1_672_531_200_000));
            }
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn malformed_between_entries_are_ignored() {
        let spec = FilterSpec::new()
            .between("a", json!("2023-01-01"))
            .between("b", json!([]))
            .between("c", json!({ "from": 1 }));
        assert!(compile(spec).is_empty());
    }

    #[test]
    fn unparseable_between_bound_is_an_error() {
        let spec = FilterSpec::new().between("createdAt", json!(["yesterday-ish"]));
        assert!(matches!(
            FilterWhere::generate(&spec, NOW, false),
            Err(FilterError::InvalidDate { .. })
        ));
    }

    #[test]
    fn between_is_inclusive() {
        let cond = Condition::Between {
            field: "status".to_string(),
            start: Some(10),
            end: Some(20),
        };
        assert!(cond.matches(&doc(json!(10))));
        assert!(cond.matches(&doc(json!(20))));
        assert!(!cond.matches(&doc(json!(21))));
        assert!(!cond.matches(&doc(json!("15"))));
    }

    #[test]
    fn equals_null_matches_missing_field() {
        let cond = Condition::equals("other", Value::Null);
        assert!(cond.matches(&doc(json!("x"))));
        assert!(!Condition::equals("status", Value::Null).matches(&doc(json!("x"))));
    }

    #[test]
    fn equals_matches_array_elements_and_numeric_forms() {
        assert!(Condition::equals("status", json!("rust")).matches(&doc(json!(["go", "rust"]))));
        assert!(Condition::equals("status", json!(1)).matches(&doc(json!(1.0))));
    }
}
