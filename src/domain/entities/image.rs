use actix_multipart::form::{bytes::Bytes, MultipartForm};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::errors::WizardError;

/// Photo bytes as they arrive from the capture input.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Encodes the photo as an embedded `data:` URL for the draft's
    /// `imageUrl`. The type comes from the bytes, not the file name.
    pub fn into_data_url(self, max_bytes: usize) -> Result<String, WizardError> {
        if self.bytes.len() > max_bytes {
            return Err(WizardError::ImageTooLarge(max_bytes));
        }

        let kind = infer::get(&self.bytes).ok_or(WizardError::UnreadableImage)?;
        if kind.matcher_type() != infer::MatcherType::Image {
            tracing::warn!(
                file_name = ?self.file_name,
                mime = kind.mime_type(),
                "Rejected non-image photo upload"
            );
            return Err(WizardError::UnreadableImage);
        }

        Ok(format!("data:{};base64,{}", kind.mime_type(), STANDARD.encode(&self.bytes)))
    }
}

/// `multipart/form-data` body of the photo step. The hard limit sits well
/// above the configured image size so oversized photos get the friendly
/// message instead of a transport error.
#[derive(Debug, MultipartForm)]
pub struct PhotoForm {
    #[multipart(rename = "photo", limit = "32MB")]
    pub photo: Bytes,
}

impl From<PhotoForm> for ImageUpload {
    fn from(form: PhotoForm) -> Self {
        ImageUpload {
            file_name: form.photo.file_name,
            bytes: form.photo.data.to_vec(),
        }
    }
}
