use thiserror::Error;

use super::column::DataType;


pub type Result<T> = std::result::Result<T, DBError>;


#[derive(Debug, Error)]
pub enum DBError {

    /// the backing file for a table does not exist
    #[error("the file '{0}' does not exist")]
    FileNotFound(String),

    /// no row matched the key used for an update or delete
    #[error("no record where '{column}' = '{value}' was found")]
    KeyNotFound { column: String, value: String },

    /// malformed input, `line` is 1-based and counts the header row
    #[error("could not parse '{file}' at line {line}: {message}")]
    Parse { file: String, line: u64, message: String },

    /// a record or change set was rejected before touching the table
    #[error("invalid record: {0}")]
    Validation(String),

    /// the table was mutated but could not be written back; the in-memory
    /// copy has already been reconciled with what is on disk
    #[error("failed to persist '{path}': {message}")]
    Persistence { path: String, message: String },

    #[error("the column '{0}' does not exist in the table")]
    InvalidColumn(String),

    /// first is expected dt, second is actual
    #[error("expected datatype '{0}', but got '{1}'")]
    MisMatchDataType(DataType, DataType),

    /// both sheet names end up identical once cut to the spreadsheet limit
    #[error("sheet names '{first}' and '{second}' both truncate to '{truncated}'")]
    SheetNameCollision { first: String, second: String, truncated: String },

    /// first is filename, second is error message
    #[error("an error has occurred with file {0}: {1}")]
    IOFailure(String, String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}


impl DBError {
    pub fn validation(message: impl Into<String>) -> Self { DBError::Validation(message.into()) }

    pub fn key_not_found(column: &str, value: &impl ToString) -> Self {
        DBError::KeyNotFound { column: column.to_string(), value: value.to_string() }
    }

    /// true for the errors a caller can fix by changing its input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DBError::KeyNotFound { .. } | DBError::Validation(_) | DBError::InvalidColumn(_) | DBError::MisMatchDataType(..)
        )
    }
}


/// only writers convert implicitly; readers build a `Parse` error with the file and line themselves
impl From<csv::Error> for DBError {
    fn from(err: csv::Error) -> Self { DBError::Export(err.to_string()) }
}


impl From<rust_xlsxwriter::XlsxError> for DBError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self { DBError::Export(err.to_string()) }
}


impl From<serde_json::Error> for DBError {
    fn from(err: serde_json::Error) -> Self { DBError::Export(err.to_string()) }
}


impl From<zip::result::ZipError> for DBError {
    fn from(err: zip::result::ZipError) -> Self { DBError::Export(err.to_string()) }
}
