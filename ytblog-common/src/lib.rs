//! # ytblog Common Library
//!
//! Shared code for the ytblog services:
//! - Error types
//! - Bootstrap configuration (TOML file, data folder resolution)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
