#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod deck;
mod error;
pub mod extract;
pub mod outline;
pub mod pagination;
pub mod validation;

pub use error::{Error, Result};

/// Tracing target for the core crate.
pub const TRACING_TARGET: &str = "deckforge_core";
