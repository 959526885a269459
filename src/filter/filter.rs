use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{Condition, FilterWhere};
use super::projection::Projection;
use super::types::{FilterOptions, FilterOrderInfo, FilterSpec};
use crate::types::now_millis;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Backend-agnostic plan produced from a merged `FilterSpec`
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub conditions: Vec<Condition>,
    pub sort: Vec<FilterOrderInfo>,
    pub projection: Projection,
    pub page: u64,
    pub page_size: u64,
}

impl QueryPlan {
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Merges caller input over server defaults and compiles the result into a `QueryPlan`
pub struct Filter {
    spec: FilterSpec,
    options: FilterOptions,
}

impl Filter {
    /// Overlay `caller` on `defaults` field by field; the caller wins on every collision.
    pub fn new(caller: &FilterSpec, defaults: &FilterSpec, options: FilterOptions) -> Self {
        let mut spec = defaults.clone();

        spec.equals.extend(caller.equals.clone());
        spec.search_map.extend(caller.search_map.clone());
        spec.between_map.extend(caller.between_map.clone());
        spec.sort.extend(caller.sort.clone());
        spec.projection.extend(caller.projection.clone());

        spec.page = first_positive(caller.page, defaults.page);
        spec.page_size = first_positive(caller.page_size, defaults.page_size);

        Self { spec, options }
    }

    pub fn translate(caller: &FilterSpec, defaults: &FilterSpec, options: FilterOptions) -> Result<QueryPlan, FilterError> {
        Self::new(caller, defaults, options).to_plan()
    }

    pub fn merged(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn to_plan(&self) -> Result<QueryPlan, FilterError> {
        self.to_plan_at(now_millis())
    }

    /// Compile against a fixed "now", used for absent `betweenMap` bounds
    pub fn to_plan_at(&self, now_ms: i64) -> Result<QueryPlan, FilterError> {
        let conditions = FilterWhere::generate(&self.spec, now_ms, self.options.open_ended_between)?;
        let sort = FilterOrder::parse(&self.spec.sort);
        let projection = Projection::from_flags(&self.spec.projection)?;

        let page = self.spec.page.unwrap_or(DEFAULT_PAGE);
        let page_size = self.applied_page_size(self.spec.page_size.unwrap_or(DEFAULT_PAGE_SIZE));

        let plan = QueryPlan {
            conditions,
            sort,
            projection,
            page,
            page_size,
        };

        if self.options.debug_logging {
            tracing::debug!(
                "Compiled query plan: {} conditions, {} sort keys, page {} size {}",
                plan.conditions.len(),
                plan.sort.len(),
                plan.page,
                plan.page_size
            );
        }

        Ok(plan)
    }

    fn applied_page_size(&self, requested: u64) -> u64 {
        match self.options.max_page_size {
            Some(max) if requested > max => {
                tracing::warn!("Page size {} exceeds max {}, capping to max", requested, max);
                max
            }
            _ => requested,
        }
    }
}

fn first_positive(caller: Option<u64>, default: Option<u64>) -> Option<u64> {
    caller.filter(|v| *v > 0).or(default.filter(|v| *v > 0))
}
