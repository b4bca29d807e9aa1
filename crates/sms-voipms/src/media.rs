//! MMS media handling.

use std::path::{Component, Path};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sms_core::SmsError;

const DANGEROUS_PATTERNS: &[&str] = &["~", "/etc/", "/root/", "c:\\windows\\"];

/// Accept only absolute paths without `..` and outside well-known sensitive locations.
pub fn validate_image_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return false;
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return false;
    }
    let lowered = path.to_string_lossy().to_lowercase();
    !DANGEROUS_PATTERNS.iter().any(|p| lowered.contains(p))
}

/// Read a file and wrap it as a `data:<mime>;base64,<content>` URI.
pub async fn encode_media(path: &Path) -> Result<String, SmsError> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes)))
}
