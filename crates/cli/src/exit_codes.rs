//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | File read/write error                    |
//! | 10-19   | import           | CSV import validation / commit           |
//! | 20-29   | api              | Backend authentication / transport       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tally_api_client::ApiError;
use tally_io::ImportError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Import (10-19)
// =============================================================================

/// CSV rejected before any create call (missing columns, invalid rows,
/// no data). Nothing was created.
pub const EXIT_IMPORT_INVALID: u8 = 10;

/// Some rows were created before a create call failed. Created rows are
/// not rolled back; re-check the transaction list.
pub const EXIT_IMPORT_PARTIAL: u8 = 11;

// =============================================================================
// API (20-29)
// =============================================================================

/// Not logged in, or the backend answered 401 (token has been cleared).
pub const EXIT_API_NOT_AUTH: u8 = 20;

/// Backend unreachable.
pub const EXIT_API_NETWORK: u8 = 21;

/// Backend answered with another non-2xx status or an unexpected body.
pub const EXIT_API_ERROR: u8 = 22;

/// Map an API error to its exit code.
pub fn api_exit_code(err: &ApiError) -> u8 {
    match err {
        ApiError::Unauthorized(_) => EXIT_API_NOT_AUTH,
        ApiError::Network(_) => EXIT_API_NETWORK,
        ApiError::Http(..) | ApiError::Parse(_) => EXIT_API_ERROR,
        ApiError::Aborted => EXIT_ERROR,
    }
}

/// Map an import validation error to its exit code.
pub fn import_exit_code(err: &ImportError) -> u8 {
    match err {
        ImportError::Io(_) => EXIT_IO,
        _ => EXIT_IMPORT_INVALID,
    }
}
