//! Planning and executing regex queries.

pub mod planner;
pub mod rechecker;
pub mod regex_query;
pub mod settings;
pub mod timeout;
pub mod transform;
pub mod two_phase;

pub use planner::{QueryPlan, QueryPlanner};
pub use rechecker::{RecheckStrategy, Rechecker};
pub use regex_query::{CompiledQuery, RegexQuery};
pub use settings::Settings;
pub use timeout::{Clock, SystemClock, TimeoutChecker, TimeoutStatus};
pub use transform::QueryTransformer;
pub use two_phase::{Confirmation, ExecutionContext, ExecutionStats, RegexMatcher};
