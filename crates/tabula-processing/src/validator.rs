use tabula_core::models::{FileMetadata, ValidationError, ValidationErrorCode};

/// File-level checks evaluated before any row is parsed.
///
/// Each check returns the single error that stops validation, if any.
pub struct FileValidator<'a> {
    max_file_size: i64,
    allowed_extensions: &'a [String],
}

impl<'a> FileValidator<'a> {
    pub fn new(max_file_size: i64, allowed_extensions: &'a [String]) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    /// Extension after the last `.`, compared case-insensitively.
    pub fn validate_extension(&self, metadata: &FileMetadata) -> Option<ValidationError> {
        let extension = metadata.extension();

        if self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return None;
        }

        let shown = if extension.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{}", extension)
        };
        Some(ValidationError::file(
            ValidationErrorCode::InvalidFileType,
            format!(
                "File type {} is not allowed (allowed: {})",
                shown,
                self.allowed_extensions.join(", ")
            ),
        ))
    }

    pub fn validate_file_size(&self, metadata: &FileMetadata) -> Option<ValidationError> {
        if metadata.size > self.max_file_size {
            return Some(ValidationError::file(
                ValidationErrorCode::FileTooLarge,
                format!(
                    "File too large: {} bytes (max: {} bytes)",
                    metadata.size, self.max_file_size
                ),
            ));
        }
        None
    }

    /// Extension first, then size.
    pub fn validate_all(&self, metadata: &FileMetadata) -> Option<ValidationError> {
        self.validate_extension(metadata)
            .or_else(|| self.validate_file_size(metadata))
    }
}
