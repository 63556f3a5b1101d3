pub mod column;
pub mod db_err;
pub mod rounding;
pub mod schema;
pub mod relation;
