pub mod storage;
pub mod record_store;
