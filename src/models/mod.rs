pub mod category;
pub mod dashboard;
pub mod visit;

pub use category::{categorize, Category, CATEGORY_RULES, CATEGORY_TABLE_VERSION};
pub use dashboard::{DashboardPayload, Focus, Session, TopDomain, TopSearch, Trends};
pub use visit::{
    days_before, domain_of, from_source_epoch, to_source_epoch, DomainStat, SearchQueryStat, VisitRecord,
    SOURCE_EPOCH_OFFSET_SECS,
};
