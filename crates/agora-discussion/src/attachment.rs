use std::path::Path;

use agora_types::models::Attachment;

use crate::error::ValidationError;

/// 5 MiB
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Accepted extensions and the MIME type sent for each.
pub const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("zip", "application/zip"),
];

/// Check a file picked for upload. The type is checked before the size, so a
/// large `.docx` is reported as the wrong type.
pub fn validate_attachment(name: &str, size: u64) -> Result<Attachment, ValidationError> {
    let mime = mime_for(name).ok_or_else(|| ValidationError::UnsupportedType {
        name: name.to_string(),
    })?;

    if size > MAX_ATTACHMENT_BYTES {
        return Err(ValidationError::TooLarge {
            name: name.to_string(),
            size,
            max: MAX_ATTACHMENT_BYTES,
        });
    }

    Ok(Attachment {
        name: name.to_string(),
        size,
        mime: mime.to_string(),
    })
}

pub fn mime_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}
