pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod producer;
pub mod query;
pub mod time;
pub mod value;

pub use error::{FnlogError, Result};
