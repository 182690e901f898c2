use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use super::auth::ServiceAccountAuth;
use super::google_drive::GoogleDriveClient;

pub const TEXT_MIME: &str = "text/plain";
pub const PDF_MIME: &str = "application/pdf";

/// Where rendered files end up.
pub enum ExportSink {
    Local {
        dir: PathBuf,
    },
    Drive {
        drive: GoogleDriveClient,
        auth: ServiceAccountAuth,
        folder_id: String,
        upload_delay: Duration,
    },
}

impl ExportSink {
    /// A local sink rooted at `dir`, creating it when missing.
    pub async fn local(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self::Local { dir })
    }

    pub fn drive(
        drive: GoogleDriveClient,
        auth: ServiceAccountAuth,
        folder_id: &str,
        upload_delay: Duration,
    ) -> Self {
        Self::Drive {
            drive,
            auth,
            folder_id: folder_id.to_string(),
            upload_delay,
        }
    }

    /// Stores one file. Returns the local path or the Drive file id.
    pub async fn write(&self, name: &str, mime_type: &str, content: &[u8]) -> anyhow::Result<String> {
        match self {
            ExportSink::Local { dir } => {
                let path = dir.join(name);
                tokio::fs::write(&path, content)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                debug!("Wrote {}", path.display());
                Ok(path.display().to_string())
            }
            ExportSink::Drive {
                drive,
                auth,
                folder_id,
                upload_delay,
            } => {
                let result = match auth.access_token().await {
                    Ok(token) => drive
                        .upload_file(&token, folder_id, name, mime_type, content)
                        .await
                        .map(|file| file.id),
                    Err(err) => Err(err),
                };

                if !upload_delay.is_zero() {
                    tokio::time::sleep(*upload_delay).await;
                }

                let id = result?;
                debug!("Uploaded {name} as {id}");
                Ok(id)
            }
        }
    }
}
