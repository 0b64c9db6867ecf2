use crate::api::models::AttachmentType;
use crate::api::{MediaHost, UploadFile};
use crate::error::UploadError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type for an upload. Images use their extension; documents prefer what the picker
/// reported and otherwise fall back to a small extension table.
pub fn mime_for(file_name: &str, kind: AttachmentType, supplied: Option<&str>) -> String {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();
    match kind {
        AttachmentType::Image if !ext.is_empty() => format!("image/{ext}"),
        AttachmentType::Image => "image/jpeg".to_string(),
        AttachmentType::Doc => match supplied.filter(|m| !m.is_empty()) {
            Some(m) => m.to_string(),
            None => match ext.as_str() {
                "pdf" => "application/pdf",
                "doc" => "application/msword",
                "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "txt" => "text/plain",
                _ => OCTET_STREAM,
            }
            .to_string(),
        },
    }
}

/// Pull the public URL out of an upload response.
pub fn parse_upload_response(json: &Value) -> Result<String, UploadError> {
    if let Some(url) = json.get("secure_url").and_then(Value::as_str) {
        return Ok(url.to_string());
    }
    match json.pointer("/error/message").and_then(Value::as_str) {
        Some(msg) => Err(UploadError::Rejected(msg.to_string())),
        None => Err(UploadError::MissingUrl),
    }
}

/// Unsigned-preset uploads to the media host.
pub struct CloudinaryClient {
    pub http: HttpClient,
    base_url: String,
    cloud_name: String,
    upload_preset: String,
}

impl CloudinaryClient {
    pub fn new(base_url: &str, cloud_name: &str, upload_preset: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
        }
    }

    pub fn upload_url(&self, kind: AttachmentType) -> String {
        let resource = match kind {
            AttachmentType::Image => "image",
            AttachmentType::Doc => "raw",
        };
        format!("{}/{}/{}/upload", self.base_url, self.cloud_name, resource)
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, file: UploadFile, kind: AttachmentType) -> Result<String, UploadError> {
        let size = file.bytes.len();
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(|e| UploadError::Rejected(e.to_string()))?;
        let form = Form::new().part("file", part).text("upload_preset", self.upload_preset.clone());

        log::info!("uploading {} ({size} bytes, {})", file.file_name, file.mime);
        let resp = self
            .http
            .post(self.upload_url(kind))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let json: Value = resp.json().await.map_err(|e| UploadError::Transport(e.to_string()))?;
        parse_upload_response(&json)
    }
}
