//! Column rule compilation.
//!
//! Rules are compiled once per validation call into a tagged variant per data type, so the
//! per-cell path never re-parses patterns or re-inspects the data type.

use regex::Regex;
use std::collections::HashMap;
use tabula_core::models::{
    ColumnRule, DataType, UploadConfiguration, ValidationError, ValidationErrorCode,
};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// A configuration that cannot be compiled into runnable checks.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern for column '{column}': {source}")]
    InvalidPattern {
        column: String,
        #[source]
        source: regex::Error,
    },

    #[error("Columns '{first}' and '{second}' share position {position}")]
    DuplicatePosition {
        position: i32,
        first: String,
        second: String,
    },

    #[error("Invalid bounds for column '{column}': {detail}")]
    InvalidBounds { column: String, detail: String },

    #[error("Delimiter {0:?} is not a single-byte character")]
    InvalidDelimiter(char),

    #[error("Failed to compile built-in email pattern: {0}")]
    EmailPattern(#[source] regex::Error),
}

/// Per-type value checks.
#[derive(Debug, Clone)]
pub enum ValueRule {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Email {
        pattern: Regex,
    },
}

#[derive(Debug, Clone)]
pub struct CompiledColumn {
    /// Trimmed header matched against the file
    pub header: String,
    pub display_name: String,
    pub required: bool,
    pub values_required: bool,
    pub position: i32,
    pub rule: ValueRule,
}

/// Column rules of one configuration, ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub(crate) allowed_extensions: Vec<String>,
    pub(crate) max_file_size: i64,
    pub(crate) max_row_count: Option<i64>,
    pub(crate) min_data_rows: i64,
    pub(crate) delimiter: u8,
    /// Ordered by position
    pub(crate) columns: Vec<CompiledColumn>,
}

/// Single-byte form of the configured delimiter.
pub fn delimiter_byte(config: &UploadConfiguration) -> Result<u8, RuleError> {
    if config.delimiter.is_ascii() {
        Ok(config.delimiter as u8)
    } else {
        Err(RuleError::InvalidDelimiter(config.delimiter))
    }
}

fn non_negative(
    column: &str,
    name: &str,
    value: Option<i32>,
) -> Result<Option<usize>, RuleError> {
    match value {
        None => Ok(None),
        Some(v) => usize::try_from(v)
            .map(Some)
            .map_err(|_| RuleError::InvalidBounds {
                column: column.to_string(),
                detail: format!("{} must not be negative (got {})", name, v),
            }),
    }
}

impl CompiledRules {
    pub fn compile(
        config: &UploadConfiguration,
        columns: &[ColumnRule],
    ) -> Result<Self, RuleError> {
        let delimiter = delimiter_byte(config)?;

        let mut by_position: HashMap<i32, &str> = HashMap::new();
        for column in columns {
            if let Some(first) = by_position.insert(column.position, &column.header_name) {
                return Err(RuleError::DuplicatePosition {
                    position: column.position,
                    first: first.to_string(),
                    second: column.header_name.clone(),
                });
            }
        }

        let needs_email = columns.iter().any(|c| c.data_type == DataType::Email);
        let email = if needs_email {
            Some(Regex::new(EMAIL_PATTERN).map_err(RuleError::EmailPattern)?)
        } else {
            None
        };

        let mut compiled = columns
            .iter()
            .map(|column| compile_column(column, email.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        compiled.sort_by_key(|c| c.position);

        Ok(Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            max_file_size: config.max_file_size,
            max_row_count: config.max_row_count,
            min_data_rows: config.min_data_rows,
            delimiter,
            columns: compiled,
        })
    }

    pub fn columns(&self) -> &[CompiledColumn] {
        &self.columns
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

fn compile_column(
    column: &ColumnRule,
    email: Option<&Regex>,
) -> Result<CompiledColumn, RuleError> {
    let header = column.normalized_header().to_string();

    let rule = match column.data_type {
        DataType::String => {
            let min_length = non_negative(&header, "min_length", column.min_length)?;
            let max_length = non_negative(&header, "max_length", column.max_length)?;
            if let (Some(min), Some(max)) = (min_length, max_length) {
                if min > max {
                    return Err(RuleError::InvalidBounds {
                        column: header,
                        detail: format!("min_length {} exceeds max_length {}", min, max),
                    });
                }
            }
            let pattern = match column.pattern.as_deref().filter(|p| !p.is_empty()) {
                Some(p) => Some(Regex::new(p).map_err(|source| RuleError::InvalidPattern {
                    column: header.clone(),
                    source,
                })?),
                None => None,
            };
            ValueRule::String {
                min_length,
                max_length,
                pattern,
            }
        }
        DataType::Number => {
            if let (Some(min), Some(max)) = (column.min_value, column.max_value) {
                if min > max {
                    return Err(RuleError::InvalidBounds {
                        column: header,
                        detail: format!("min_value {} exceeds max_value {}", min, max),
                    });
                }
            }
            ValueRule::Number {
                min: column.min_value,
                max: column.max_value,
            }
        }
        DataType::Email => match email {
            Some(pattern) => ValueRule::Email {
                pattern: pattern.clone(),
            },
            None => ValueRule::Email {
                pattern: Regex::new(EMAIL_PATTERN).map_err(RuleError::EmailPattern)?,
            },
        },
    };

    Ok(CompiledColumn {
        header,
        display_name: column.display_name.clone(),
        required: column.required,
        values_required: column.values_required,
        position: column.position,
        rule,
    })
}

impl CompiledColumn {
    /// Check one cell, appending any violations to `errors`.
    pub fn check_cell(&self, row: usize, raw: &str, errors: &mut Vec<ValidationError>) {
        let value = raw.trim();

        if value.is_empty() {
            if self.values_required {
                errors.push(ValidationError::row(
                    ValidationErrorCode::MissingRequiredValue,
                    row,
                    &self.header,
                    format!("{} is required", self.display_name),
                    None,
                ));
            }
            return;
        }

        let mut fail = |code: ValidationErrorCode, message: String| {
            errors.push(ValidationError::row(
                code,
                row,
                &self.header,
                message,
                Some(value.to_string()),
            ));
        };

        match &self.rule {
            ValueRule::Email { pattern } => {
                if !pattern.is_match(value) {
                    fail(
                        ValidationErrorCode::InvalidEmail,
                        format!("{} must be a valid email address", self.display_name),
                    );
                }
            }
            ValueRule::Number { min, max } => match value.parse::<f64>() {
                Ok(number) if number.is_finite() => {
                    if let Some(min) = min {
                        if number < *min {
                            fail(
                                ValidationErrorCode::ValueTooSmall,
                                format!("{} must be at least {}", self.display_name, min),
                            );
                        }
                    }
                    if let Some(max) = max {
                        if number > *max {
                            fail(
                                ValidationErrorCode::ValueTooLarge,
                                format!("{} must be at most {}", self.display_name, max),
                            );
                        }
                    }
                }
                _ => fail(
                    ValidationErrorCode::InvalidNumber,
                    format!("{} must be a number", self.display_name),
                ),
            },
            ValueRule::String {
                min_length,
                max_length,
                pattern,
            } => {
                let length = value.chars().count();
                if let Some(min) = min_length {
                    if length < *min {
                        fail(
                            ValidationErrorCode::ValueTooShort,
                            format!(
                                "{} must be at least {} characters",
                                self.display_name, min
                            ),
                        );
                    }
                }
                if let Some(max) = max_length {
                    if length > *max {
                        fail(
                            ValidationErrorCode::ValueTooLong,
                            format!("{} must be at most {} characters", self.display_name, max),
                        );
                    }
                }
                if let Some(pattern) = pattern {
                    if !pattern.is_match(value) {
                        fail(
                            ValidationErrorCode::PatternMismatch,
                            format!("{} does not match the expected format", self.display_name),
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config() -> UploadConfiguration {
        UploadConfiguration::new(Uuid::new_v4(), "test", Uuid::new_v4())
    }

    fn check(column: &CompiledColumn, raw: &str) -> Vec<ValidationErrorCode> {
        let mut errors = Vec::new();
        column.check_cell(2, raw, &mut errors);
        errors.into_iter().map(|e| e.code).collect()
    }

    fn compile_one(rule: ColumnRule) -> CompiledColumn {
        let cfg = config();
        CompiledRules::compile(&cfg, &[rule]).unwrap().columns[0].clone()
    }

    #[test]
    fn test_numeric_bounds() {
        let column = compile_one(
            ColumnRule::new(Uuid::nil(), "amount", DataType::Number, 1)
                .with_value_range(Some(10.0), Some(100.0)),
        );
        assert_eq!(check(&column, "5"), vec![ValidationErrorCode::ValueTooSmall]);
        assert_eq!(check(&column, "150"), vec![ValidationErrorCode::ValueTooLarge]);
        assert!(check(&column, "50").is_empty());
        assert!(check(&column, " 10 ").is_empty());
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let column = compile_one(ColumnRule::new(Uuid::nil(), "amount", DataType::Number, 1));
        assert_eq!(check(&column, "abc"), vec![ValidationErrorCode::InvalidNumber]);
        assert_eq!(check(&column, "NaN"), vec![ValidationErrorCode::InvalidNumber]);
        assert_eq!(check(&column, "inf"), vec![ValidationErrorCode::InvalidNumber]);
        assert!(check(&column, "1e3").is_empty());
        assert!(check(&column, "-0.5").is_empty());
    }

    #[test]
    fn test_email_validation() {
        let column = compile_one(ColumnRule::new(Uuid::nil(), "email", DataType::Email, 1));
        assert!(check(&column, "a@b.com").is_empty());
        assert_eq!(check(&column, "not-an-email"), vec![ValidationErrorCode::InvalidEmail]);
        assert_eq!(check(&column, "a b@c.com"), vec![ValidationErrorCode::InvalidEmail]);
    }

    #[test]
    fn test_string_collects_every_violation() {
        let column = compile_one(
            ColumnRule::new(Uuid::nil(), "code", DataType::String, 1)
                .with_length(Some(3), Some(5))
                .with_pattern("^[0-9]+$"),
        );
        assert_eq!(
            check(&column, "ab"),
            vec![
                ValidationErrorCode::ValueTooShort,
                ValidationErrorCode::PatternMismatch
            ]
        );
        assert_eq!(check(&column, "123456"), vec![ValidationErrorCode::ValueTooLong]);
        assert!(check(&column, "1234").is_empty());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let column = compile_one(
            ColumnRule::new(Uuid::nil(), "name", DataType::String, 1).with_length(None, Some(4)),
        );
        assert!(check(&column, "Zoë!").is_empty());
    }

    #[test]
    fn test_pattern_is_unanchored_search() {
        let column = compile_one(
            ColumnRule::new(Uuid::nil(), "ref", DataType::String, 1).with_pattern("[0-9]{3}"),
        );
        assert!(check(&column, "REF-123-X").is_empty());
    }

    #[test]
    fn test_empty_cells() {
        let optional = compile_one(
            ColumnRule::new(Uuid::nil(), "amount", DataType::Number, 1)
                .with_value_range(Some(10.0), None),
        );
        assert!(check(&optional, "   ").is_empty());

        let mandatory = compile_one(
            ColumnRule::new(Uuid::nil(), "amount", DataType::Number, 1).values_required(),
        );
        assert_eq!(check(&mandatory, ""), vec![ValidationErrorCode::MissingRequiredValue]);
    }

    #[test]
    fn test_bad_pattern_is_rule_error() {
        let cfg = config();
        let rule = ColumnRule::new(Uuid::nil(), "ref", DataType::String, 1).with_pattern("([a-z");
        let err = CompiledRules::compile(&cfg, &[rule]).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { column, .. } if column == "ref"));
    }

    #[test]
    fn test_duplicate_position_is_rule_error() {
        let cfg = config();
        let rules = [
            ColumnRule::new(Uuid::nil(), "a", DataType::String, 1),
            ColumnRule::new(Uuid::nil(), "b", DataType::String, 1),
        ];
        let err = CompiledRules::compile(&cfg, &rules).unwrap_err();
        assert!(matches!(err, RuleError::DuplicatePosition { position: 1, .. }));
    }

    #[test]
    fn test_inverted_bounds_and_wide_delimiter_rejected() {
        let cfg = config();
        let rule = ColumnRule::new(Uuid::nil(), "n", DataType::Number, 1)
            .with_value_range(Some(5.0), Some(1.0));
        assert!(matches!(
            CompiledRules::compile(&cfg, &[rule]),
            Err(RuleError::InvalidBounds { .. })
        ));

        let mut wide = config();
        wide.delimiter = '§';
        assert!(matches!(
            CompiledRules::compile(&wide, &[]),
            Err(RuleError::InvalidDelimiter('§'))
        ));
    }

    #[test]
    fn test_columns_sorted_by_position() {
        let cfg = config();
        let rules = [
            ColumnRule::new(Uuid::nil(), "second", DataType::String, 2),
            ColumnRule::new(Uuid::nil(), "first", DataType::String, 1),
        ];
        let compiled = CompiledRules::compile(&cfg, &rules).unwrap();
        let headers: Vec<_> = compiled.columns().iter().map(|c| c.header.as_str()).collect();
        assert_eq!(headers, vec!["first", "second"]);
    }
}
