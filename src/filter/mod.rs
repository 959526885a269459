pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod filter_sql;
pub mod projection;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter::{Filter, QueryPlan};
pub use filter_where::Condition;
pub use projection::Projection;
