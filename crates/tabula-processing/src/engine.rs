//! Validation engine
//!
//! Runs file-level checks, reads the header, streams data rows through the compiled column
//! rules and reduces the per-row outcomes into a `ValidationResult`.
//!
//! Error order in the result: file-level errors, then row-level errors by row number and,
//! within a row, by column position. Validation is pure: the same bytes and configuration
//! always yield the same result.

use std::collections::HashMap;
use tabula_core::models::{
    ColumnRule, FileMetadata, UploadConfiguration, ValidationError, ValidationErrorCode,
    ValidationResult,
};

use crate::reader::{DataRow, TabularReader};
use crate::rules::{CompiledColumn, CompiledRules, RuleError};
use crate::validator::FileValidator;

/// Running totals folded over data rows.
#[derive(Debug, Default)]
struct RowTally {
    total: usize,
    valid: usize,
    errors: Vec<ValidationError>,
}

impl RowTally {
    fn absorb(mut self, row_errors: Vec<ValidationError>) -> Self {
        self.total += 1;
        if row_errors.is_empty() {
            self.valid += 1;
        } else {
            self.errors.extend(row_errors);
        }
        self
    }
}

/// Stateless validator of tabular files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compile `columns` and validate `data` against them.
    pub fn validate(
        &self,
        data: &[u8],
        metadata: &FileMetadata,
        config: &UploadConfiguration,
        columns: &[ColumnRule],
    ) -> Result<ValidationResult, RuleError> {
        let rules = CompiledRules::compile(config, columns)?;
        Ok(self.validate_compiled(data, metadata, &rules))
    }

    /// Validate `data` against rules compiled ahead of time.
    pub fn validate_compiled(
        &self,
        data: &[u8],
        metadata: &FileMetadata,
        rules: &CompiledRules,
    ) -> ValidationResult {
        let file_validator = FileValidator::new(rules.max_file_size, &rules.allowed_extensions);
        if let Some(error) = file_validator.validate_all(metadata) {
            return rejected(error);
        }

        let mut reader = TabularReader::new(data, rules.delimiter);

        let header = match reader.read_header() {
            Ok(Some(header)) => header,
            Ok(None) => {
                return rejected(ValidationError::file(
                    ValidationErrorCode::EmptyFile,
                    "File has no header row",
                ))
            }
            Err(e) => return rejected(malformed(&e)),
        };

        // First occurrence wins for duplicated headers.
        let mut header_index: HashMap<&str, usize> = HashMap::new();
        for (index, name) in header.iter().enumerate() {
            header_index.entry(name.as_str()).or_insert(index);
        }

        let mut file_errors: Vec<ValidationError> = rules
            .columns
            .iter()
            .filter(|column| column.required && !header_index.contains_key(column.header.as_str()))
            .map(|column| {
                ValidationError::file_column(
                    ValidationErrorCode::MissingRequiredColumn,
                    &column.header,
                    format!("Missing required column: {}", column.header),
                )
            })
            .collect();

        let matched: Vec<(usize, &CompiledColumn)> = rules
            .columns
            .iter()
            .filter_map(|column| {
                header_index
                    .get(column.header.as_str())
                    .map(|&index| (index, column))
            })
            .collect();

        let outcome = reader
            .rows()
            .try_fold(RowTally::default(), |tally, row| match row {
                Ok(row) => Ok(tally.absorb(check_row(&row, &matched))),
                Err(e) => Err((tally, e)),
            });

        let (tally, parsed) = match outcome {
            Ok(tally) => (tally, true),
            Err((tally, e)) => {
                file_errors.push(malformed(&e));
                (tally, false)
            }
        };

        // Row counts are meaningless once parsing stopped early.
        let total = tally.total as i64;
        if parsed && total < rules.min_data_rows {
            file_errors.push(ValidationError::file(
                ValidationErrorCode::TooFewRows,
                format!(
                    "File has {} data rows (minimum: {})",
                    total, rules.min_data_rows
                ),
            ));
        }
        if let (true, Some(max)) = (parsed, rules.max_row_count) {
            if total > max {
                file_errors.push(ValidationError::file(
                    ValidationErrorCode::TooManyRows,
                    format!("File has {} data rows (maximum: {})", total, max),
                ));
            }
        }

        let mut errors = file_errors;
        errors.extend(tally.errors);

        tracing::debug!(
            file_name = %metadata.file_name,
            total_rows = tally.total,
            valid_rows = tally.valid,
            error_count = errors.len(),
            "File validated"
        );

        ValidationResult {
            is_valid: errors.is_empty(),
            total_rows: tally.total,
            valid_rows: tally.valid,
            errors,
        }
    }
}

fn check_row(row: &DataRow, matched: &[(usize, &CompiledColumn)]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (index, column) in matched {
        column.check_cell(row.number, row.cell(*index), &mut errors);
    }
    errors
}

fn rejected(error: ValidationError) -> ValidationResult {
    ValidationResult {
        is_valid: false,
        total_rows: 0,
        valid_rows: 0,
        errors: vec![error],
    }
}

fn malformed(error: &csv::Error) -> ValidationError {
    let location = error
        .position()
        .map(|p| format!(" near line {}", p.line()))
        .unwrap_or_default();
    ValidationError::file(
        ValidationErrorCode::MalformedFile,
        format!("File could not be parsed{}: {}", location, error),
    )
}
