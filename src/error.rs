//! Structured error handling and exit codes.

use serde::Serialize;

use crate::cache::CacheError;
use crate::inventory::BuildError;
use crate::service::InventoryError;

/// Exit codes for the dbinventory application.
///
/// - 0: Success
/// - 1: General error (configuration, database, I/O)
/// - 2: Invalid data (a variables column is not a JSON object)
/// - 3: Cache corrupt (an artifact exists but cannot be parsed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the inventory was printed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Invalid data: the database holds malformed variables.
    InvalidData = 2,
    /// Cache corrupt: a cache artifact could not be parsed.
    CacheCorrupt = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DI000",
            Self::GeneralError => "DI001",
            Self::InvalidData => "DI002",
            Self::CacheCorrupt => "DI003",
        }
    }

    /// Classify an error by the first recognised cause in its chain.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<InventoryError>() {
                return match e {
                    InventoryError::Build(build) => Self::from_build_error(build),
                    InventoryError::Cache(cache) => Self::from_cache_error(cache),
                    InventoryError::Render(_) => Self::GeneralError,
                };
            }
            if let Some(e) = cause.downcast_ref::<BuildError>() {
                return Self::from_build_error(e);
            }
            if let Some(e) = cause.downcast_ref::<CacheError>() {
                return Self::from_cache_error(e);
            }
        }
        Self::GeneralError
    }

    fn from_build_error(err: &BuildError) -> Self {
        match err {
            BuildError::InvalidGroupVariables { .. } | BuildError::InvalidHostVariables { .. } => {
                Self::InvalidData
            }
            BuildError::Source(_) => Self::GeneralError,
        }
    }

    fn from_cache_error(err: &CacheError) -> Self {
        if err.is_corrupt() {
            Self::CacheCorrupt
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DI001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
        }
    }
}
