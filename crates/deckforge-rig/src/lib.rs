#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod backend;
mod error;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
pub mod render;
pub mod research;
pub mod structured;

pub use error::{Error, Result};

/// Tracing target for the collaborator crate.
pub const TRACING_TARGET: &str = "deckforge_rig";
