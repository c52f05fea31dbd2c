pub mod config;
pub mod error;
pub mod types;

pub use error::{OspreyError, OspreyResult};
pub use types::Height;
