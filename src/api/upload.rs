use super::ApiClient;
use crate::error::{Error, Result};
use log::info;
use reqwest::{multipart, Method};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "imageUrl", alias = "secure_url")]
    url: String,
}

fn mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Upload an image; returns its public URL.
    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type(file_name))?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .request(Method::POST, "/upload")
            .multipart(form)
            .execute::<UploadResponse>()
            .await?;
        info!("Uploaded {} ({} bytes) to {}", file_name, size, response.url);
        Ok(response.url)
    }

    /// Upload an image from disk
    pub async fn upload_image_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::general(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::general(format!("Failed to read {}: {}", path.display(), e)))?;
        self.upload_image(&file_name, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_type("socket.PNG"), "image/png");
        assert_eq!(mime_type("a/b/c.jpeg"), "image/jpeg");
        assert_eq!(mime_type("manual.pdf"), "application/octet-stream");
        assert_eq!(mime_type("noext"), "application/octet-stream");
    }
}
