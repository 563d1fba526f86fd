//! Constants shared across crates.

/// Maximum number of row-level error samples returned in a response payload.
/// The ledger always keeps the complete error set.
pub const MAX_ERROR_SAMPLES: usize = 10;

/// Path template used when a storage configuration does not define one.
pub const DEFAULT_PATH_TEMPLATE: &str = "{base_path}/{organization_id}/{uuid}.{extension}";

/// Delimiter used when a configuration row carries an empty delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Upper bound for ledger list queries.
pub const MAX_LEDGER_PAGE_SIZE: i64 = 500;
