/// Largest file accepted by the upload form (5MB)
pub const MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    /// Origin used when building in-app viewer links (`<base_url>/view/<id>`)
    pub base_url: String,
    /// Base of the public object URLs handed out by download and copy-link
    pub storage_url: String,
    pub max_upload_size: u64, // in bytes
}

impl Default for Config {
    fn default() -> Self {
        let host = std::env::var("FILEDROP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("FILEDROP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3210);
        let data_dir = std::env::var("FILEDROP_DATA_DIR")
            .unwrap_or_else(|_| "./filedrop_data".to_string());

        Self::build(
            host,
            port,
            data_dir,
            std::env::var("FILEDROP_BASE_URL").ok(),
            std::env::var("FILEDROP_STORAGE_URL").ok(),
        )
    }
}

impl Config {
    /// Assemble a config, deriving the URL bases from host/port when not given.
    pub fn build(
        host: String,
        port: u16,
        data_dir: String,
        base_url: Option<String>,
        storage_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", host, port));
        let storage_url = storage_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/storage", base_url));

        Self {
            host,
            port,
            data_dir,
            base_url,
            storage_url,
            max_upload_size: MAX_UPLOAD_SIZE,
        }
    }

    /// Same config with host/port overridden, re-deriving URL bases that were not set explicitly.
    pub fn with_listen_addr(self, host: String, port: u16) -> Self {
        let default_base = format!("http://{}:{}", self.host, self.port);
        let base_url = (self.base_url != default_base).then_some(self.base_url.clone());
        let storage_url = (self.storage_url != format!("{}/storage", self.base_url))
            .then_some(self.storage_url);
        Self::build(host, port, self.data_dir, base_url, storage_url)
    }
}
