use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::PathBuf;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let max_file_size = match std::env::var("MAX_FILE_SIZE_MB") {
            Ok(raw) => {
                let mb: usize = raw
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid MAX_FILE_SIZE_MB: {}", e))?;
                mb * 1024 * 1024
            }
            Err(_) => default_max_file_size(),
        };

        Ok(Config {
            bind_addr,
            upload_dir,
            max_file_size,
        })
    }
}
