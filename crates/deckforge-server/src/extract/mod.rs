//! Request extractors whose rejections are returned as [`Error`] bodies.
//!
//! - [`Json`]: JSON body extraction and JSON responses.
//! - [`ValidateJson`]: JSON body extraction followed by `validator` checks.
//! - [`Path`]: path parameter extraction.
//!
//! [`Error`]: crate::handler::Error

mod json;
mod path;

pub use self::json::{Json, ValidateJson};
pub use self::path::Path;
