//! Storage key rendering from path templates.
//!
//! A template such as `{base_path}/{organization_id}/{date}/{uuid}.{extension}` is expanded
//! token by token. Unknown tokens and unbalanced braces are rejected rather than written
//! through literally.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Values substituted into a path template.
#[derive(Debug, Clone)]
pub struct KeyParams<'a> {
    pub base_path: &'a str,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub extension: &'a str,
    pub uuid: Uuid,
    pub date: DateTime<Utc>,
}

/// Render a storage key from `template`.
///
/// The result has no leading `/`, no empty segments and no `..`.
pub fn render_key(template: &str, params: &KeyParams<'_>) -> StorageResult<String> {
    let mut rendered = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            StorageError::InvalidKey(format!("Unclosed token in path template: {}", template))
        })?;
        let token = &after[..close];
        rendered.push_str(&token_value(token, params)?);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(StorageError::InvalidKey(format!(
            "Unbalanced '}}' in path template: {}",
            template
        )));
    }
    rendered.push_str(rest);

    normalize_key(&rendered)
}

fn token_value(token: &str, params: &KeyParams<'_>) -> StorageResult<String> {
    let value = match token {
        "base_path" => params.base_path.trim_matches('/').to_string(),
        "uuid" => params.uuid.to_string(),
        "extension" => sanitize_extension(params.extension),
        "organization_id" => params.organization_id.to_string(),
        "user_id" => params.user_id.to_string(),
        "date" => params.date.format("%Y/%m/%d").to_string(),
        other => {
            return Err(StorageError::InvalidKey(format!(
                "Unknown path template token: {{{}}}",
                other
            )))
        }
    };
    Ok(value)
}

fn sanitize_extension(extension: &str) -> String {
    extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Collapse empty segments and reject traversal.
pub fn normalize_key(raw: &str) -> StorageResult<String> {
    let mut segments = Vec::new();
    for segment in raw.split(['/', '\\']) {
        let segment = segment.trim();
        if segment.contains("..") {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        let segment = segment.trim_end_matches('.');
        if segment.is_empty() {
            continue;
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidKey(
            "Path template rendered an empty key".to_string(),
        ));
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params<'a>(base_path: &'a str, extension: &'a str) -> KeyParams<'a> {
        KeyParams {
            base_path,
            organization_id: Uuid::nil(),
            user_id: Uuid::from_u128(7),
            extension,
            uuid: Uuid::from_u128(42),
            date: Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_all_tokens_rendered() {
        let key = render_key(
            "{base_path}/{organization_id}/{user_id}/{date}/{uuid}.{extension}",
            &params("uploads", "CSV"),
        )
        .unwrap();
        assert_eq!(
            key,
            format!(
                "uploads/{}/{}/2024/03/09/{}.csv",
                Uuid::nil(),
                Uuid::from_u128(7),
                Uuid::from_u128(42)
            )
        );
    }

    #[test]
    fn test_empty_segments_collapsed() {
        let key = render_key("/{base_path}//{uuid}.{extension}", &params("", "csv")).unwrap();
        assert_eq!(key, format!("{}.csv", Uuid::from_u128(42)));
        assert!(!key.starts_with('/'));
    }

    #[test]
    fn test_traversal_never_emitted() {
        let err = render_key("{base_path}/{uuid}", &params("../../etc", "csv")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = render_key("../{uuid}", &params("uploads", "csv")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_extension_is_sanitized() {
        let key = render_key("{uuid}.{extension}", &params("x", "/../csv")).unwrap();
        assert_eq!(key, format!("{}.csv", Uuid::from_u128(42)));
    }

    #[test]
    fn test_unknown_token_rejected() {
        let err = render_key("{tenant}/{uuid}", &params("x", "csv")).unwrap_err();
        assert!(err.to_string().contains("{tenant}"));

        assert!(render_key("{uuid", &params("x", "csv")).is_err());
        assert!(render_key("uuid}", &params("x", "csv")).is_err());
    }

    #[test]
    fn test_fresh_uuid_yields_distinct_keys() {
        let mut first = params("uploads", "csv");
        first.uuid = Uuid::new_v4();
        let mut second = first.clone();
        second.uuid = Uuid::new_v4();
        let template = "{base_path}/{uuid}.{extension}";
        assert_ne!(
            render_key(template, &first).unwrap(),
            render_key(template, &second).unwrap()
        );
    }
}
