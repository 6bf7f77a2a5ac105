//! # docrepo-core
//!
//! Core crate for DocRepo. Contains the document model, the store handle
//! contract, per-operation option structs, pagination and sorting types,
//! configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DocRepo crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
