use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::FileIcon;

/// Metadata row describing one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    /// Stored name: `index.html` for pages, `<unique>.<ext>` otherwise
    pub filename: String,
    /// Name the file had on the uploader's machine
    pub original_name: String,
    /// MIME type as reported at upload time (may be empty)
    pub file_type: String,
    pub file_size: u64,
    pub storage_path: String,
    pub upload_date: DateTime<Utc>,
    pub download_count: u64,
}

/// Record fields supplied by the caller; id, date and counter are assigned on insert
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub filename: String,
    pub original_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_path: String,
}

/// Sidecar metadata kept next to every stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub content_type: String,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

/// A verification question as shown to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeView {
    pub token: String,
    pub a: u32,
    pub b: u32,
}

/// A record plus everything the file list needs to render it
#[derive(Debug, Serialize)]
pub struct FileView {
    #[serde(flatten)]
    pub record: FileRecord,
    pub is_html: bool,
    pub icon: FileIcon,
    pub size_human: String,
    pub kind: String,
}

/// Response for listing files
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileView>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file: FileRecord,
    /// Fresh question for the next upload
    pub challenge: ChallengeView,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
    pub filename: String,
    pub download_count: u64,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
}

/// Stats about hosted files
#[derive(Debug, Serialize)]
pub struct StorageStats {
    pub total_files: u64,
    pub html_pages: u64,
    pub total_size: u64,
    pub total_size_human: String,
    pub total_downloads: u64,
}
