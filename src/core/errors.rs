use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Search API request failed with status {status}: {body}")]
    SearchApi { status: u16, body: String },
    #[error("Typesense request failed with status {status}: {body}")]
    Typesense { status: u16, body: String },
    #[error("Google API request failed with status {status}: {body}")]
    GoogleApi { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Google service account credentials not found at {0}")]
    MissingCredentials(String),
    #[error("Drive folder id is not configured")]
    MissingDriveFolder,
    #[error("No candidates found")]
    NoCandidates,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Rejected download: {0}")]
    RejectedDownload(String),
}

impl CoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::SearchApi { status, .. }
            | CoreError::Typesense { status, .. }
            | CoreError::GoogleApi { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CoreError::GoogleApi { status: 403, .. })
    }
}
