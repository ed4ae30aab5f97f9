pub mod db;
pub mod error;
pub mod sql;
pub mod storage;
pub mod types;
