use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    /// SQLite database file.
    pub database_url: String,
    /// Directory uploads are written to. Its last component is also the URL prefix.
    pub upload_dir: String,
    /// Optional mirror directory (the public site's assets) for synced uploads.
    pub public_sync_dir: Option<String>,
    pub node_env: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub max_file_size: u64,
    pub token_ttl_hours: i64,
}

const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            config::ConfigError::Message(
                "FATAL: Environment variable 'DATABASE_URL' is not set in your .env file.".to_string(),
            )
        })?;
        // Accept the `file:` prefix used by ORM-style connection strings.
        let database_url = database_url
            .strip_prefix("file:")
            .map(str::to_string)
            .unwrap_or(database_url);

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        if upload_dir.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "FATAL: 'UPLOAD_DIR' must not be empty.".to_string(),
            ));
        }

        let node_env = env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_file_size = match env::var("MAX_FILE_SIZE") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                config::ConfigError::Message(format!(
                    "FATAL: 'MAX_FILE_SIZE' must be a positive number of bytes, got '{}'.",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_MAX_FILE_SIZE,
        };

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(config::ConfigError::Message(format!(
                        "FATAL: 'TOKEN_TTL_HOURS' must be a positive integer, got '{}'.",
                        raw
                    )))
                }
            },
            Err(_) => 2,
        };

        let mut builder = config::Config::builder()
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml).required(false))
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 3001)?
            .set_override("database_url", database_url)?
            .set_override("upload_dir", upload_dir)?
            .set_override("node_env", node_env)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("max_file_size", max_file_size as i64)?
            .set_override("token_ttl_hours", token_ttl_hours)?;

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("web.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            let port = port.trim().parse::<u16>().map_err(|_| {
                config::ConfigError::Message(format!("FATAL: 'PORT' must be a valid port number, got '{}'.", port))
            })?;
            builder = builder.set_override("web.port", port as i64)?;
        }
        if let Ok(dir) = env::var("PUBLIC_SYNC_DIR") {
            if !dir.trim().is_empty() {
                builder = builder.set_override("public_sync_dir", dir)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.node_env == "development"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database_url)
    }

    pub fn upload_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }

    /// URL prefix static uploads are mounted under, e.g. `/uploads`.
    pub fn upload_url_prefix(&self) -> String {
        let name = Path::new(&self.upload_dir)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "uploads".to_string());
        format!("/{}", name)
    }

    pub fn public_sync_path(&self) -> Option<PathBuf> {
        self.public_sync_dir.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(upload_dir: &str) -> Config {
        Config {
            web: WebConfig { host: "127.0.0.1".into(), port: 3001 },
            database_url: "cms.db".into(),
            upload_dir: upload_dir.into(),
            public_sync_dir: None,
            node_env: "production".into(),
            allowed_origins: "*".into(),
            log_level: "info".into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            token_ttl_hours: 2,
        }
    }

    #[test]
    fn upload_prefix_uses_last_component() {
        assert_eq!(config("uploads").upload_url_prefix(), "/uploads");
        assert_eq!(config("/var/lib/cms/media/").upload_url_prefix(), "/media");
        assert!(!config("uploads").is_development());
    }
}
