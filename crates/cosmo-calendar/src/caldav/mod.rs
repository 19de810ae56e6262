//! CalDAV calendar-query evaluation.

pub mod filter;
pub mod overrides;
pub mod policy;
pub mod query;
pub mod recurrence;
pub mod render;
pub mod report;
pub mod repository;
pub mod time_range;

pub use filter::{Candidate, ComponentFilter, FilterEvaluator, FilterNode};
pub use overrides::OverrideMerger;
pub use policy::TimezonePolicy;
pub use query::{CandidateSet, QueryEvaluator, StoredItem};
pub use recurrence::RecurrenceExpander;
pub use report::{MatchedResource, QueryEngine, QueryOutcome};
pub use repository::{CollectionId, InMemoryRepository, ItemRepository};
pub use time_range::TimeRangePredicate;
