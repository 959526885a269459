use serde_json::Value;

use super::error::{ServiceError, ServiceResult};

pub const MAX_TAG_LENGTH: usize = 20;
pub const MAX_NICKNAME_LENGTH: usize = 30;

/// Required string field, 6 to 16 characters
pub fn credential<'a>(value: Option<&'a str>, field: &str) -> ServiceResult<&'a str> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("{} is required", field)))?;
    let len = value.chars().count();
    if !(6..=16).contains(&len) {
        return Err(ServiceError::validation(format!("{} must be between 6 and 16 characters", field)));
    }
    Ok(value)
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Tags arrive either as a JSON array or as one comma separated string
pub fn normalize_tags(value: Option<&Value>) -> ServiceResult<Vec<String>> {
    let tags: Vec<String> = match value {
        None | Some(Value::Null) => vec![],
        Some(Value::String(s)) if s.is_empty() => vec![],
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ServiceError::validation("tags must be strings")),
            })
            .collect::<ServiceResult<_>>()?,
        Some(_) => return Err(ServiceError::validation("tags must be a list or a comma separated string")),
    };
    check_tags(&tags)?;
    Ok(tags)
}

pub fn check_tags(tags: &[String]) -> ServiceResult<()> {
    if tags.iter().any(|t| t.chars().count() > MAX_TAG_LENGTH) {
        return Err(ServiceError::validation(format!(
            "A single tag cannot be longer than {} characters",
            MAX_TAG_LENGTH
        )));
    }
    Ok(())
}
