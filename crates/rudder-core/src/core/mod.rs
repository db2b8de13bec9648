//! Core error and path utilities.

pub mod error;
pub mod path;

pub use error::{ErrorKind, ResultExt, RudderError, RudderResult};
