//! Convenience result type alias for DocRepo.

use crate::error::AppError;

/// A specialized `Result` type for store and repository operations.
pub type AppResult<T> = Result<T, AppError>;
