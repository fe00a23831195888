pub mod onboarding;
pub mod portfolio;

use axum::extract::Multipart;

use crate::error::ApiError;

/// File part pulled out of a multipart form.
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart fields the onboarding uploads care about.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<Upload>,
    pub name: Option<String>,
}

/// Read `file` (and an optional `name`) from a form. Other fields are skipped.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file: {}", e)))?;
                if !bytes.is_empty() {
                    form.file = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid name: {}", e)))?;
                let text = text.trim();
                if !text.is_empty() {
                    form.name = Some(text.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
