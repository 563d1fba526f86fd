//! API constants

/// Versioned prefix for every business route
pub const API_PREFIX: &str = "/api/v0";

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Multipart field carrying the upload configuration id
pub const CONFIG_ID_FIELD: &str = "config_id";

/// Page size for ledger listings when the caller gives none
pub const DEFAULT_OPERATIONS_LIMIT: i64 = 50;
