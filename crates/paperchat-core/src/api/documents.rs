use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::Method;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{Ack, Document, DocumentList, UploadResponse};

#[derive(Clone)]
pub struct DocumentsClient {
    api: ApiClient,
}

impl DocumentsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The backend answers 404 when the user has no uploads yet.
    pub async fn list(&self) -> ApiResult<Vec<Document>> {
        let request = self.api.authed(Method::GET, "/pdf/documents")?;
        match self.api.send_json::<DocumentList>(request).await {
            Ok(list) => Ok(list.document),
            Err(ApiError::Backend { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn upload_pdf(&self, path: &Path) -> ApiResult<UploadResponse> {
        let filename = file_name(path)?;
        if extension(path).as_deref() != Some("pdf") {
            return Err(ApiError::invalid("Only PDF files can be uploaded"));
        }
        let bytes = tokio::fs::read(path).await?;
        self.upload_pdf_bytes(&filename, bytes).await
    }

    pub async fn upload_pdf_bytes(&self, filename: &str, bytes: Vec<u8>) -> ApiResult<UploadResponse> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let request = self
            .api
            .authed(Method::POST, "/pdf/upload")?
            .multipart(Form::new().part("file", part));
        let response: UploadResponse = self.api.send_json(request).await?;
        tracing::info!("Uploaded {} as document {:?}", filename, response.pdf_id);
        Ok(response)
    }

    pub async fn upload_image(&self, path: &Path) -> ApiResult<UploadResponse> {
        let filename = file_name(path)?;
        let mime = extension(path)
            .as_deref()
            .and_then(image_mime)
            .ok_or_else(|| ApiError::invalid("Unsupported image type"))?;
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes).file_name(filename.clone()).mime_str(mime)?;
        let request = self
            .api
            .authed(Method::POST, "/pdf/image")?
            .multipart(Form::new().part("image", part));
        let response: UploadResponse = self.api.send_json(request).await?;
        tracing::info!("Uploaded image {}", filename);
        Ok(response)
    }

    pub async fn download(&self, id: &str) -> ApiResult<Vec<u8>> {
        let request = self.api.authed(Method::GET, &format!("/pdf/download/{}", id))?;
        self.api.send_bytes(request).await
    }

    /// Downloads into `dir/<filename>` and returns the written path.
    pub async fn download_to(&self, document: &Document, dir: &Path) -> ApiResult<PathBuf> {
        let bytes = self.download(&document.id).await?;
        tokio::fs::create_dir_all(dir).await?;
        let target = dir.join(sanitize_file_name(&document.filename));
        tokio::fs::write(&target, bytes).await?;
        tracing::info!("Saved document {} to {}", document.id, target.display());
        Ok(target)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<String> {
        let request = self.api.authed(Method::DELETE, &format!("/pdf/delete/{}", id))?;
        let ack: Ack = self.api.send_json(request).await?;
        Ok(ack.message.unwrap_or_else(|| "Document deleted".to_string()))
    }
}

fn file_name(path: &Path) -> ApiResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid(format!("Not a file: {}", path.display())))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn image_mime(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Backend filenames are user-supplied; keep only the final component.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() || base == "." || base == ".." {
        "document.pdf".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_lookup() {
        assert_eq!(image_mime("png"), Some("image/png"));
        assert_eq!(image_mime("jpeg"), Some("image/jpeg"));
        assert_eq!(image_mime("bmp"), None);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("paper.pdf"), "paper.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("dir\\paper.pdf"), "paper.pdf");
        assert_eq!(sanitize_file_name(".."), "document.pdf");
    }
}
