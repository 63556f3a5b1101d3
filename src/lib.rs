pub mod structures;
pub mod store;
pub mod sales;
pub mod features;
pub mod config;
pub mod logging;

pub use structures::column::{Column, DataType, FieldValue};
pub use structures::db_err::{DBError, Result};
pub use structures::schema::Schema;
pub use structures::relation::table::{Row, Table};
pub use structures::relation::io::{load, load_inferred, load_workbook, load_workbook_inferred, workbook_sheets};
pub use structures::relation::aggregate::{AggregateOp, Aggregation};
pub use structures::relation::sort::SortOrder;
pub use structures::relation::export::{to_bundle, to_spreadsheet, ExportFormat};
pub use structures::relation::profile::{ColumnProfile, NumericStatistics, TableProfile};
pub use store::{record_store::RecordStore, storage::{FileStorage, Storage}};
pub use config::Config;
