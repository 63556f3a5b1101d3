pub mod schemas;
pub mod dataset;
pub mod reports;
pub mod summary;

pub use dataset::{SalesDataset, SalesTables};
pub use reports::ReportSet;
pub use schemas::TableKind;
pub use summary::SummaryStatistics;
