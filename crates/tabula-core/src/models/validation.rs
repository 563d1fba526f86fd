use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Stable machine-readable validation error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    InvalidFileType,
    FileTooLarge,
    EmptyFile,
    MalformedFile,
    MissingRequiredColumn,
    TooFewRows,
    TooManyRows,
    MissingRequiredValue,
    InvalidEmail,
    InvalidNumber,
    ValueTooSmall,
    ValueTooLarge,
    ValueTooShort,
    ValueTooLong,
    PatternMismatch,
}

impl ValidationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorCode::InvalidFileType => "INVALID_FILE_TYPE",
            ValidationErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ValidationErrorCode::EmptyFile => "EMPTY_FILE",
            ValidationErrorCode::MalformedFile => "MALFORMED_FILE",
            ValidationErrorCode::MissingRequiredColumn => "MISSING_REQUIRED_COLUMN",
            ValidationErrorCode::TooFewRows => "TOO_FEW_ROWS",
            ValidationErrorCode::TooManyRows => "TOO_MANY_ROWS",
            ValidationErrorCode::MissingRequiredValue => "MISSING_REQUIRED_VALUE",
            ValidationErrorCode::InvalidEmail => "INVALID_EMAIL",
            ValidationErrorCode::InvalidNumber => "INVALID_NUMBER",
            ValidationErrorCode::ValueTooSmall => "VALUE_TOO_SMALL",
            ValidationErrorCode::ValueTooLarge => "VALUE_TOO_LARGE",
            ValidationErrorCode::ValueTooShort => "VALUE_TOO_SHORT",
            ValidationErrorCode::ValueTooLong => "VALUE_TOO_LONG",
            ValidationErrorCode::PatternMismatch => "PATTERN_MISMATCH",
        }
    }
}

impl Display for ValidationErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Where a validation error applies.
///
/// Row-level errors always carry both the row number (header is row 1) and the column;
/// file-level errors never carry a row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorScope {
    Row {
        row: usize,
        column: String,
    },
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ValidationErrorCode,
    pub message: String,
    #[serde(flatten)]
    pub scope: ErrorScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationError {
    pub fn file(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            scope: ErrorScope::File { column: None },
            value: None,
        }
    }

    pub fn file_column(
        code: ValidationErrorCode,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            scope: ErrorScope::File {
                column: Some(column.into()),
            },
            value: None,
        }
    }

    pub fn row(
        code: ValidationErrorCode,
        row: usize,
        column: impl Into<String>,
        message: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            scope: ErrorScope::Row {
                row,
                column: column.into(),
            },
            value,
        }
    }

    pub fn is_file_level(&self) -> bool {
        matches!(self.scope, ErrorScope::File { .. })
    }

    pub fn row_number(&self) -> Option<usize> {
        match self.scope {
            ErrorScope::Row { row, .. } => Some(row),
            ErrorScope::File { .. } => None,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match &self.scope {
            ErrorScope::Row { column, .. } => Some(column),
            ErrorScope::File { column } => column.as_deref(),
        }
    }
}

/// Name and size of the submitted file, as reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_name: String,
    pub size: i64,
}

impl FileMetadata {
    pub fn new(file_name: impl Into<String>, size: i64) -> Self {
        Self {
            file_name: file_name.into(),
            size,
        }
    }

    /// Lowercased text after the last `.`; empty when there is none.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => String::new(),
        }
    }
}

/// Outcome of validating one file against one configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub total_rows: usize,
    pub valid_rows: usize,
    /// File-level errors first, then row-level errors by row and column position
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn file_level_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_file_level())
    }

    pub fn row_level_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| !e.is_file_level())
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_serializes_flat() {
        let err = ValidationError::row(
            ValidationErrorCode::InvalidEmail,
            3,
            "email",
            "Invalid email address",
            Some("not-an-email".to_string()),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_EMAIL");
        assert_eq!(json["row"], 3);
        assert_eq!(json["column"], "email");
        assert_eq!(json["value"], "not-an-email");

        let back: ValidationError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_file_error_has_no_row() {
        let err = ValidationError::file_column(
            ValidationErrorCode::MissingRequiredColumn,
            "email",
            "Missing required column: email",
        );
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("row").is_none());
        assert!(json.get("value").is_none());
        assert_eq!(json["column"], "email");

        let back: ValidationError = serde_json::from_value(json).unwrap();
        assert!(back.is_file_level());
        assert_eq!(back.column(), Some("email"));
    }

    #[test]
    fn test_extension_after_last_dot() {
        assert_eq!(FileMetadata::new("report.final.CSV", 1).extension(), "csv");
        assert_eq!(FileMetadata::new("README", 1).extension(), "");
    }

    #[test]
    fn test_code_display_matches_serde() {
        let code = ValidationErrorCode::ValueTooSmall;
        let json = serde_json::to_value(code).unwrap();
        assert_eq!(json, code.to_string());
    }
}
