use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_UPLOAD_DIR: &str = "applets";
const DEFAULT_PROMPT_DIR: &str = "prompts";
const DEFAULT_STATIC_DIR: &str = "static";

/// Application configuration, constructed once at startup and passed to the
/// components that need it. Nothing reads the environment after boot, so
/// tests can build an `AppConfig` directly without touching env vars.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Groq API key used for both transcription and generation.
    pub groq_api_key: String,

    /// Root directory holding one subdirectory per applet UUID.
    pub upload_dir: PathBuf,

    /// Directory containing the prompt template files.
    pub prompt_dir: PathBuf,

    /// Directory containing the landing page and client-side assets.
    pub static_dir: PathBuf,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq_api_key: String::new(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            prompt_dir: PathBuf::from(DEFAULT_PROMPT_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    DEFAULT_BIND_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000)))
}

impl AppConfig {
    /// Build a config from the process environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.groq_api_key = key;
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            if !dir.is_empty() {
                config.upload_dir = PathBuf::from(dir);
            }
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(e) => {
                    log::warn!("Config: invalid BIND_ADDR {:?}: {}, using default", addr, e);
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.groq_api_key.is_empty());
        assert_eq!(config.upload_dir, PathBuf::from("applets"));
        assert_eq!(config.prompt_dir, PathBuf::from("prompts"));
        assert_eq!(config.bind_addr.port(), 8000);
    }
}
