pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, ReaderError, Result};
pub use types::*;
