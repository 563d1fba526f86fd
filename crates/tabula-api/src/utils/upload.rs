//! Multipart parsing for the submission endpoint

use axum::extract::Multipart;
use tabula_core::AppError;
use tabula_services::UploadFile;

use crate::constants::{CONFIG_ID_FIELD, FILE_FIELD};

/// Parts of a submission form. Absent parts are reported by the orchestrator.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadFile>,
    pub config_id: Option<String>,
}

/// Read the `file` and `config_id` fields. Only one `file` field is accepted; unknown
/// fields are ignored.
pub async fn extract_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == FILE_FIELD {
            if form.file.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
            let content_type = field.content_type().unwrap_or_default().to_string();

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

            form.file = Some(UploadFile {
                file_name,
                content_type,
                data,
            });
        } else if field_name == CONFIG_ID_FIELD {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read config_id: {}", e)))?;
            form.config_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        }
    }

    Ok(form)
}

/// Last path component of a client-supplied file name, without control characters.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}
