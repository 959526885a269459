use super::error::FilterError;
use super::filter_where::Condition;
use super::types::{FilterOrderInfo, SqlParam, SqlResult};
use crate::types::Document;

/// Text of the current element inside `jsonb_array_elements(..) AS e`
const ELEMENT_TEXT: &str = "e #>> '{}'";

/// Applies `test` to a string field, or to each string element of an array field
fn string_condition(field: &str, test: impl Fn(&str) -> String) -> String {
    format!(
        "(CASE jsonb_typeof(doc -> {f}) WHEN 'string' THEN {scalar} \
         WHEN 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements(doc -> {f}) AS e \
         WHERE jsonb_typeof(e) = 'string' AND {element}) ELSE FALSE END)",
        f = field,
        scalar = test(&format!("doc ->> {}", field)),
        element = test(ELEMENT_TEXT)
    )
}

fn bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Renders compiled conditions as SQL over a `(_id BIGSERIAL, doc JSONB)` table.
///
/// Field names are bound as parameters, never spliced into the statement.
pub struct FilterSql {
    params: Vec<SqlParam>,
}

impl FilterSql {
    pub fn new() -> Self {
        Self { params: vec![] }
    }

    pub fn select(
        table: &str,
        conditions: &[Condition],
        sort: &[FilterOrderInfo],
        skip: u64,
        limit: Option<u64>,
    ) -> Result<SqlResult, FilterError> {
        validate_table_name(table)?;
        let mut sql = Self::new();
        let where_clause = sql.where_clause(conditions);
        let order_clause = sql.order_clause(sort);
        let limit_clause = sql.limit_clause(skip, limit);

        let query = [
            format!("SELECT doc FROM \"{}\"", table),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: sql.params })
    }

    pub fn count(table: &str, conditions: &[Condition]) -> Result<SqlResult, FilterError> {
        validate_table_name(table)?;
        let mut sql = Self::new();
        let where_clause = sql.where_clause(conditions);
        Ok(SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", table, where_clause),
            params: sql.params,
        })
    }

    pub fn insert(table: &str, doc: &Document) -> Result<SqlResult, FilterError> {
        validate_table_name(table)?;
        let mut sql = Self::new();
        let value = sql.param(SqlParam::Json(serde_json::Value::Object(doc.clone())));
        Ok(SqlResult {
            query: format!("INSERT INTO \"{}\" (doc) VALUES ({}::jsonb)", table, value),
            params: sql.params,
        })
    }

    /// `$set` semantics: top-level keys of `set` replace the stored ones
    pub fn update_one(table: &str, conditions: &[Condition], set: &Document) -> Result<SqlResult, FilterError> {
        validate_table_name(table)?;
        let mut sql = Self::new();
        let where_clause = sql.where_clause(conditions);
        let patch = sql.param(SqlParam::Json(serde_json::Value::Object(set.clone())));
        Ok(SqlResult {
            query: format!(
                "UPDATE \"{t}\" SET doc = doc || {p}::jsonb WHERE _id = (SELECT _id FROM \"{t}\" WHERE {w} LIMIT 1)",
                t = table,
                p = patch,
                w = where_clause
            ),
            params: sql.params,
        })
    }

    pub fn delete_one(table: &str, conditions: &[Condition]) -> Result<SqlResult, FilterError> {
        validate_table_name(table)?;
        let mut sql = Self::new();
        let where_clause = sql.where_clause(conditions);
        Ok(SqlResult {
            query: format!(
                "DELETE FROM \"{t}\" WHERE _id = (SELECT _id FROM \"{t}\" WHERE {w} LIMIT 1)",
                t = table,
                w = where_clause
            ),
            params: sql.params,
        })
    }

    /// DDL for a collection table plus one unique index per key
    pub fn create_collection(table: &str, unique_keys: &[&str]) -> Result<Vec<String>, FilterError> {
        validate_table_name(table)?;
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (_id BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL)",
            table
        )];
        for key in unique_keys {
            validate_table_name(key)?;
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{i}\" ON \"{t}\" ((doc ->> '{k}'))",
                i = Self::unique_index_name(table, key),
                t = table,
                k = key
            ));
        }
        Ok(statements)
    }

    pub fn unique_index_name(table: &str, key: &str) -> String {
        format!("{}_{}_key", table, key)
    }

    fn where_clause(&mut self, conditions: &[Condition]) -> String {
        if conditions.is_empty() {
            return "TRUE".to_string();
        }
        conditions
            .iter()
            .map(|c| self.condition(c))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn condition(&mut self, condition: &Condition) -> String {
        let field = self.param(SqlParam::Text(condition.field().to_string()));
        match condition {
            Condition::Equals { value, .. } if value.is_null() => {
                format!("(doc -> {f} IS NULL OR doc -> {f} = 'null'::jsonb)", f = field)
            }
            Condition::Equals { value, .. } => {
                let value = self.param(SqlParam::Json(value.clone()));
                format!(
                    "(doc -> {f} = {v}::jsonb OR doc -> {f} @> jsonb_build_array({v}::jsonb))",
                    f = field,
                    v = value
                )
            }
            Condition::Like { pattern, .. } | Condition::In { pattern, .. } => {
                let pattern = self.param(SqlParam::Text(pattern.as_str().to_string()));
                string_condition(&field, |text| format!("{} ~ {}", text, pattern))
            }
            Condition::NotIn { pattern, .. } => {
                let pattern = self.param(SqlParam::Text(pattern.as_str().to_string()));
                string_condition(&field, |text| format!("({t} <> '' AND {t} !~ {p})", t = text, p = pattern))
            }
            Condition::Between { start, end, .. } => {
                let numeric = format!(
                    "(CASE WHEN jsonb_typeof(doc -> {f}) = 'number' THEN (doc ->> {f})::numeric END)",
                    f = field
                );
                match (start, end) {
                    (Some(s), Some(e)) => {
                        let s = self.param(SqlParam::BigInt(*s));
                        let e = self.param(SqlParam::BigInt(*e));
                        format!("{} BETWEEN {} AND {}", numeric, s, e)
                    }
                    (Some(s), None) => format!("{} >= {}", numeric, self.param(SqlParam::BigInt(*s))),
                    (None, Some(e)) => format!("{} <= {}", numeric, self.param(SqlParam::BigInt(*e))),
                    (None, None) => format!("{} IS NOT NULL", numeric),
                }
            }
        }
    }

    /// Insertion order breaks ties, so equal sort keys page the same way on every call
    fn order_clause(&mut self, infos: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("doc -> {} {}", self.param(SqlParam::Text(i.column.clone())), i.sort.to_sql()))
            .collect();
        parts.push("_id ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }

    fn limit_clause(&mut self, skip: u64, limit: Option<u64>) -> String {
        let offset = self.param(SqlParam::BigInt(bigint(skip)));
        match limit {
            Some(l) => format!("LIMIT {} OFFSET {}", self.param(SqlParam::BigInt(bigint(l))), offset),
            None => format!("OFFSET {}", offset),
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

impl Default for FilterSql {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_table_name(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string()));
    };
    if !(first.is_ascii_alphabetic() || first == '_') || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
    }
    Ok(())
}
