//! Downloadable header templates for upload configurations.

use tabula_core::models::{ColumnRule, UploadConfiguration};
use thiserror::Error;

use crate::rules::{delimiter_byte, RuleError};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] RuleError),

    #[error("Failed to write template: {0}")]
    Write(#[from] csv::Error),
}

/// A single header line with every configured column in position order, using the
/// configuration's delimiter.
pub fn build_template(
    config: &UploadConfiguration,
    columns: &[ColumnRule],
) -> Result<Vec<u8>, TemplateError> {
    let delimiter = delimiter_byte(config)?;

    let mut ordered: Vec<&ColumnRule> = columns.iter().collect();
    ordered.sort_by_key(|c| c.position);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(ordered.iter().map(|c| c.normalized_header()))?;

    writer
        .into_inner()
        .map_err(|e| TemplateError::Write(csv::Error::from(e.into_error())))
}

/// `<name>_template.<ext>` with the name reduced to filesystem-safe characters.
pub fn template_file_name(config: &UploadConfiguration) -> String {
    let stem: String = config
        .name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "upload".to_string() } else { stem };
    let extension = config
        .allowed_extensions
        .first()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .unwrap_or_else(|| "csv".to_string());
    format!("{}_template.{}", stem, extension)
}
