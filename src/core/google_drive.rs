use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::errors::CoreError;
use super::models::DriveFileRef;

const DRIVE_UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Option<String>,
    name: Option<String>,
}

pub struct GoogleDriveClient {
    client: Client,
    upload_endpoint: String,
}

impl GoogleDriveClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            upload_endpoint: DRIVE_UPLOAD_ENDPOINT.to_string(),
        }
    }

    pub fn with_upload_endpoint(mut self, endpoint: &str) -> Self {
        self.upload_endpoint = endpoint.to_string();
        self
    }

    /// Creates `name` inside `folder_id` with a single multipart request.
    pub async fn upload_file(
        &self,
        access_token: &str,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        content: &[u8],
    ) -> anyhow::Result<DriveFileRef> {
        let boundary = format!("cv-export-{}", Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let body = multipart_related_body(&boundary, &metadata.to_string(), mime_type, content);

        let response = self
            .client
            .post(&self.upload_endpoint)
            .bearer_auth(access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to upload {name} to Google Drive"))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CoreError::GoogleApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload = serde_json::from_str::<UploadResponse>(&body)
            .context("failed to parse Google Drive upload response")?;
        let Some(id) = payload.id else {
            return Err(CoreError::MalformedResponse("Drive upload returned no file id".into()).into());
        };

        Ok(DriveFileRef {
            id,
            name: payload.name.unwrap_or_else(|| name.to_string()),
        })
    }
}

fn multipart_related_body(boundary: &str, metadata: &str, mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
