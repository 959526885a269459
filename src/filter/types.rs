use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FilterError;

/// Pattern operators accepted in `searchMap`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum SearchOp {
    Like,
    In,
    NotIn,
}

impl FromStr for SearchOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIKE" => Ok(SearchOp::Like),
            "IN" => Ok(SearchOp::In),
            "NOT_IN" => Ok(SearchOp::NotIn),
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for SearchOp {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One `searchMap` entry. IN / NOT_IN values are comma separated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTerm {
    #[serde(alias = "opt")]
    pub op: SearchOp,
    #[serde(default)]
    pub value: String,
}

impl SearchTerm {
    pub fn new(op: SearchOp, value: impl Into<String>) -> Self {
        Self { op, value: value.into() }
    }
}

/// Include or exclude a field from query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "Value")]
pub enum ProjectionFlag {
    Include,
    Exclude,
}

impl TryFrom<Value> for ProjectionFlag {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::Bool(true) => Ok(ProjectionFlag::Include),
            Value::Bool(false) => Ok(ProjectionFlag::Exclude),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(ProjectionFlag::Exclude),
            Value::Number(_) => Ok(ProjectionFlag::Include),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "include" | "1" => Ok(ProjectionFlag::Include),
                "exclude" | "0" => Ok(ProjectionFlag::Exclude),
                _ => Err(FilterError::InvalidProjection(s.clone())),
            },
            _ => Err(FilterError::InvalidProjection(value.to_string())),
        }
    }
}

/// Declarative description of a listing request.
///
/// Field maps are keyed by document field name. Unknown fields are passed
/// through to the store without validation. Sort keys keep their request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    #[serde(alias = "dto")]
    pub equals: Map<String, Value>,
    pub search_map: BTreeMap<String, SearchTerm>,
    /// Raw `[start, end]` pairs; malformed entries are ignored at compile time
    pub between_map: BTreeMap<String, Value>,
    pub sort: Map<String, Value>,
    #[serde(alias = "current")]
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    #[serde(alias = "filter")]
    pub projection: BTreeMap<String, ProjectionFlag>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: impl Into<String>, value: Value) -> Self {
        self.equals.insert(field.into(), value);
        self
    }

    pub fn search(mut self, field: impl Into<String>, op: SearchOp, value: impl Into<String>) -> Self {
        self.search_map.insert(field.into(), SearchTerm::new(op, value));
        self
    }

    pub fn between(mut self, field: impl Into<String>, bounds: Value) -> Self {
        self.between_map.insert(field.into(), bounds);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.insert(field.into(), Value::String(direction.to_sql().to_string()));
        self
    }

    pub fn paged(mut self, page: u64, page_size: u64) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn project(mut self, field: impl Into<String>, flag: ProjectionFlag) -> Self {
        self.projection.insert(field.into(), flag);
        self
    }
}

/// Knobs applied while translating a `FilterSpec` into a plan
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Upper bound for `pageSize`; larger requests are capped
    pub max_page_size: Option<u64>,
    /// Treat an absent `betweenMap` bound as unbounded instead of "now"
    pub open_ended_between: bool,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Bind parameter for the SQL rendering of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Json(Value),
    BigInt(i64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
