use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{FilterOrderInfo, SortDirection};
use crate::types::Document;

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `{ "createdAt": "DESC", "reads": 1 }` into sort keys, keeping key order.
    /// `DESC`/`desc`/`-1` sort descending; anything else ascending.
    pub fn parse(order: &Map<String, Value>) -> Vec<FilterOrderInfo> {
        order
            .iter()
            .map(|(column, direction)| FilterOrderInfo {
                column: column.clone(),
                sort: Self::direction(direction),
            })
            .collect()
    }

    fn direction(value: &Value) -> SortDirection {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("desc") || s.eq_ignore_ascii_case("descending") || s == "-1" => {
                SortDirection::Desc
            }
            Value::Number(n) if n.as_f64().is_some_and(|v| v < 0.0) => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    /// Order two documents by the sort keys, first differing key wins
    pub fn compare(a: &Document, b: &Document, infos: &[FilterOrderInfo]) -> Ordering {
        for info in infos {
            let ordering = compare_values(a.get(&info.column), b.get(&info.column));
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Total order over JSON values: missing/null < numbers < strings < objects < arrays < booleans
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return type_rank(a).cmp(&type_rank(b)),
    };

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(Some(left), Some(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(Some(a)).cmp(&type_rank(Some(b))),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}
