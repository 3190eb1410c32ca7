use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::models::ObjectMeta;

/// File-system backed object store.
///
/// Bytes live under `<root>/objects/<key>`, sidecar metadata under
/// `<root>/.meta/<key with slashes escaped>.json`. Keys are write-once.
pub struct ObjectStore {
    root: PathBuf,
    public_base: String,
}

impl ObjectStore {
    /// Initialize the store, creating the root data directory if needed
    pub fn new(root: &str, public_base: &str) -> Result<Self, AppError> {
        let root = PathBuf::from(root);
        fs::create_dir_all(root.join("objects"))
            .map_err(|e| AppError::StorageError(format!("Cannot create data dir: {}", e)))?;
        fs::create_dir_all(root.join(".meta"))?;

        Ok(Self {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }

    fn object_meta_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace('/', "__SLASH__");
        self.root.join(".meta").join(format!("{}.json", safe_key))
    }

    pub fn validate_key(key: &str) -> Result<(), AppError> {
        if key.is_empty() || key.len() > 1024 {
            return Err(AppError::BadRequest(
                "Key must be between 1 and 1024 characters".to_string(),
            ));
        }
        if key.contains('\\') || key.contains('\0') {
            return Err(AppError::BadRequest(format!("Invalid object key '{}'", key)));
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(AppError::BadRequest(format!("Invalid object key '{}'", key)));
        }
        Ok(())
    }

    /// Store bytes under a fresh key. Fails if the key was ever used.
    ///
    /// Without an explicit content type one is guessed from the key.
    pub fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ObjectMeta, AppError> {
        Self::validate_key(key)?;

        let content_type = content_type
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| mime_guess::from_path(key).first_or_octet_stream().to_string());

        let mut hasher = Sha256::new();
        hasher.update(data);
        let etag = format!("\"{}\"", hex::encode(hasher.finalize()));

        let obj_path = self.object_path(key);
        if let Some(parent) = obj_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&obj_path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::StorageKeyTaken(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data)?;

        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type,
            etag,
            last_modified: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(self.object_meta_path(key), json)?;

        tracing::info!("Put object: {} ({} bytes, {})", key, data.len(), meta.content_type);
        Ok(meta)
    }

    pub fn download(&self, key: &str) -> Result<(ObjectMeta, Vec<u8>), AppError> {
        Self::validate_key(key)?;

        let data = match fs::read(self.object_path(key)) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::ObjectNotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = self.object_meta(key, data.len() as u64)?;

        Ok((meta, data))
    }

    fn object_meta(&self, key: &str, size: u64) -> Result<ObjectMeta, AppError> {
        let meta_path = self.object_meta_path(key);
        if !meta_path.exists() {
            // Sidecar lost: fall back to what the key tells us
            return Ok(ObjectMeta {
                key: key.to_string(),
                size,
                content_type: mime_guess::from_path(key).first_or_octet_stream().to_string(),
                etag: String::new(),
                last_modified: Utc::now(),
            });
        }

        let json = fs::read_to_string(&meta_path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Deterministic public URL for a key; no existence check.
    pub fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base, encoded.join("/"))
    }
}
