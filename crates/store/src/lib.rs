pub mod db;
pub mod query;
pub mod retention;
pub mod write;

pub use db::Store;
pub use write::BatchInsert;
