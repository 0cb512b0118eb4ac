use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::REQUEST_TIMEOUT_MS;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory holding the persisted store file (file-backed hosts only)
    pub data_dir: PathBuf,
    /// Per-request bridge timeout
    pub request_timeout: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("semantix_data")
    }
}
