use std::collections::{BTreeMap, BTreeSet};

use super::error::FilterError;
use super::types::ProjectionFlag;
use crate::types::{Document, INTERNAL_ID_FIELD};

/// Field selection applied to every document a plan returns.
///
/// The storage-internal identifier is always suppressed, whatever the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::excluding(std::iter::empty::<&str>())
    }
}

impl Projection {
    pub fn excluding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
        set.insert(INTERNAL_ID_FIELD.to_string());
        Projection::Exclude(set)
    }

    pub fn from_flags(flags: &BTreeMap<String, ProjectionFlag>) -> Result<Self, FilterError> {
        let included: BTreeSet<String> = flags
            .iter()
            .filter(|(field, flag)| **flag == ProjectionFlag::Include && field.as_str() != INTERNAL_ID_FIELD)
            .map(|(field, _)| field.clone())
            .collect();

        if included.is_empty() {
            let excluded = flags
                .iter()
                .filter(|(_, flag)| **flag == ProjectionFlag::Exclude)
                .map(|(field, _)| field.clone());
            return Ok(Projection::excluding(excluded));
        }

        if let Some((field, _)) = flags
            .iter()
            .find(|(field, flag)| **flag == ProjectionFlag::Exclude && field.as_str() != INTERNAL_ID_FIELD)
        {
            return Err(FilterError::MixedProjection(field.clone()));
        }

        Ok(Projection::Include(included))
    }

    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Projection::Include(fields) => {
                doc.retain(|key, _| fields.contains(key));
                doc
            }
            Projection::Exclude(fields) => {
                doc.retain(|key, _| !fields.contains(key));
                doc
            }
        }
    }
}
