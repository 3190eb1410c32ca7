//! File hosting operations on top of the object store and the record table.
//!
//! Every operation here is one or two plain store calls. Two gaps are left open
//! on purpose and only logged:
//! - an object whose record insert fails stays in the store, unlisted;
//! - concurrent downloads of one file can lose a counter increment.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;

use crate::classify::{format_file_size, is_allowed_type, is_html, kind_label, FileIcon};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    DownloadResponse, FileRecord, FileView, NewFileRecord, ObjectMeta, StorageStats,
};
use crate::records::RecordTable;
use crate::storage::ObjectStore;

/// Content type every HTML page is stored with, whatever the uploader reported
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A file as received from the upload form
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// MIME type reported by the client, possibly empty
    pub mime_type: String,
    pub data: Bytes,
}

/// Where and how an upload is written to the object store
#[derive(Debug, Clone, PartialEq)]
pub struct StorageKey {
    pub path: String,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Collision-resistant id: unix millis plus a random base-36 suffix.
fn unique_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..11)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Text after the last dot of the final path component, or that whole component
/// when it has no dot. Never contains a path separator.
fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.rsplit('.').next().unwrap_or(base)
}

/// Pages get their own folder as `index.html`; everything else lands flat in `uploads/`.
pub fn derive_storage_key(name: &str, mime_type: &str) -> StorageKey {
    if is_html(name, mime_type) {
        StorageKey {
            path: format!("sites/{}/index.html", unique_id()),
            filename: "index.html".to_string(),
            content_type: Some(HTML_CONTENT_TYPE.to_string()),
        }
    } else {
        let filename = format!("{}.{}", unique_id(), extension_of(name));
        StorageKey {
            path: format!("uploads/{}", filename),
            filename,
            content_type: Some(mime_type.to_string()).filter(|t| !t.is_empty()),
        }
    }
}

/// Size then type checks. No store call is made before these pass.
pub fn validate_file(file: &UploadFile, max_size: u64) -> Result<(), AppError> {
    let size = file.data.len() as u64;
    if size > max_size {
        tracing::debug!("Rejected '{}': {} bytes", file.name, size);
        return Err(AppError::FileTooLarge {
            size,
            max: max_size,
        });
    }

    if !is_allowed_type(&file.name, &file.mime_type) {
        tracing::debug!("Rejected '{}': type '{}'", file.name, file.mime_type);
        let shown = if file.mime_type.is_empty() {
            file.name.clone()
        } else {
            file.mime_type.clone()
        };
        return Err(AppError::FileTypeNotAllowed(shown));
    }

    Ok(())
}

pub struct FileHost {
    objects: ObjectStore,
    records: RecordTable,
    base_url: String,
    max_upload_size: u64,
}

impl FileHost {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            objects: ObjectStore::new(&config.data_dir, &config.storage_url)?,
            records: RecordTable::open(&config.data_dir)?,
            base_url: config.base_url.clone(),
            max_upload_size: config.max_upload_size,
        })
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Validate, write the object, then insert its record.
    pub fn upload(&self, file: UploadFile) -> Result<FileRecord, AppError> {
        validate_file(&file, self.max_upload_size)?;

        let key = derive_storage_key(&file.name, &file.mime_type);
        self.objects
            .upload(&key.path, &file.data, key.content_type.as_deref())?;

        let inserted = self.records.insert(NewFileRecord {
            filename: key.filename,
            original_name: file.name,
            file_type: file.mime_type,
            file_size: file.data.len() as u64,
            storage_path: key.path.clone(),
        });

        match inserted {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::error!("Record insert failed, object '{}' is orphaned: {}", key.path, e);
                Err(e)
            }
        }
    }

    pub fn list(&self) -> Vec<FileView> {
        self.records.list().into_iter().map(file_view).collect()
    }

    pub fn list_html(&self) -> Vec<FileView> {
        self.records.list_html().into_iter().map(file_view).collect()
    }

    pub fn get(&self, id: &str) -> Result<FileRecord, AppError> {
        self.records
            .get(id)
            .ok_or_else(|| AppError::FileNotFound(id.to_string()))
    }

    /// Bump the download counter by one and resolve the public URL.
    ///
    /// The counter is read and written in two separate calls.
    pub fn record_download(&self, id: &str) -> Result<DownloadResponse, AppError> {
        let record = self.get(id)?;
        let updated = self
            .records
            .update_download_count(id, record.download_count + 1)?;

        tracing::info!("Download of {} ({}), count {}", id, updated.original_name, updated.download_count);
        Ok(DownloadResponse {
            url: self.objects.public_url(&updated.storage_path),
            filename: updated.original_name,
            download_count: updated.download_count,
        })
    }

    /// Shareable link: the direct public object URL, pages included.
    pub fn share_link(&self, id: &str) -> Result<String, AppError> {
        let record = self.get(id)?;
        Ok(self.objects.public_url(&record.storage_path))
    }

    /// In-app sandboxed viewer URL. Only pages have one.
    pub fn viewer_url(&self, id: &str) -> Result<String, AppError> {
        let record = self.get(id)?;
        if !is_html(&record.original_name, &record.file_type) {
            return Err(AppError::BadRequest(format!(
                "'{}' is not an HTML page",
                record.original_name
            )));
        }
        Ok(format!("{}/view/{}", self.base_url, record.id))
    }

    /// Record plus its stored content as text, or `None` for an unknown id.
    pub fn page_content(&self, id: &str) -> Result<Option<(FileRecord, String)>, AppError> {
        let Some(record) = self.records.get(id) else {
            return Ok(None);
        };
        let (_, data) = self.objects.download(&record.storage_path)?;
        let text = String::from_utf8_lossy(&data).into_owned();
        Ok(Some((record, text)))
    }

    /// Raw object behind a public URL.
    pub fn open_object(&self, key: &str) -> Result<(ObjectMeta, Vec<u8>), AppError> {
        self.objects.download(key)
    }

    pub fn get_stats(&self) -> StorageStats {
        let records = self.records.list();
        let total_size: u64 = records.iter().map(|r| r.file_size).sum();

        StorageStats {
            total_files: records.len() as u64,
            html_pages: records
                .iter()
                .filter(|r| is_html(&r.original_name, &r.file_type))
                .count() as u64,
            total_size,
            total_size_human: format_file_size(total_size),
            total_downloads: records.iter().map(|r| r.download_count).sum(),
        }
    }
}

fn file_view(record: FileRecord) -> FileView {
    FileView {
        is_html: is_html(&record.original_name, &record.file_type),
        icon: FileIcon::for_file(&record.original_name, &record.file_type),
        size_human: format_file_size(record.file_size),
        kind: kind_label(&record.file_type),
        record,
    }
}
